use std::collections::BTreeMap;

use ndarray::ArrayD;

use crate::{BoxError, HookErr, Result};

/// Named loss terms returned by a model for one batch.
pub type LossDict = BTreeMap<String, LossValue>;

/// A single loss term, either a plain number or a tensor holding one element.
#[derive(Debug, Clone, PartialEq)]
pub enum LossValue {
    Scalar(f64),
    Tensor(ArrayD<f32>),
}

impl LossValue {
    /// Extracts the plain scalar out of this term.
    ///
    /// # Args
    /// * `name` - The term's name, used for error reporting.
    ///
    /// # Errors
    /// `NonScalarLoss` if a tensor doesn't hold exactly one element.
    pub fn item(&self, name: &str) -> Result<f64> {
        match self {
            LossValue::Scalar(v) => Ok(*v),
            LossValue::Tensor(t) => match t.first() {
                Some(v) if t.len() == 1 => Ok(f64::from(*v)),
                _ => Err(HookErr::NonScalarLoss {
                    batch: None,
                    name: name.to_string(),
                    len: t.len(),
                }),
            },
        }
    }
}

impl From<f64> for LossValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<f32> for LossValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<ArrayD<f32>> for LossValue {
    fn from(value: ArrayD<f32>) -> Self {
        Self::Tensor(value)
    }
}

/// A model evaluated for its losses, without touching its parameters.
pub trait LossModel {
    type Batch;

    /// Runs the model on `batch` and returns every loss term it produces.
    fn losses(&self, batch: &Self::Batch) -> std::result::Result<LossDict, BoxError>;
}

/// A finite, restartable sequence of validation batches.
pub trait ValidationSource {
    type Batch;

    /// The number of batches a full pass yields.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a new pass over the batches.
    fn batches(&self) -> impl Iterator<Item = &Self::Batch>;
}

impl<B> ValidationSource for Vec<B> {
    type Batch = B;

    fn len(&self) -> usize {
        <[B]>::len(self)
    }

    fn batches(&self) -> impl Iterator<Item = &B> {
        self.iter()
    }
}

/// Sums every term of a loss dictionary into the batch's total loss.
pub fn total_loss(losses: &LossDict) -> Result<f64> {
    losses
        .iter()
        .map(|(name, value)| value.item(name))
        .sum()
}
