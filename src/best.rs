use crate::checkpoint::best_checkpoint_name;

/// The best validation loss observed so far in a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BestState {
    /// No evaluation completed yet.
    #[default]
    Unset,
    /// Lowest mean loss seen and the checkpoint saved for it.
    Known { loss: f64, name: String },
}

impl BestState {
    /// Feeds the mean loss of an evaluation at step `iter` into the state.
    ///
    /// The first observed loss always wins, whatever its value. Later ones only win on a strict
    /// improvement, which a NaN never is.
    ///
    /// # Returns
    /// The resulting state and whether `candidate` became the new best.
    pub fn update(&self, candidate: f64, iter: usize) -> (BestState, bool) {
        let improved = match self {
            BestState::Unset => true,
            BestState::Known { loss, .. } => candidate < *loss,
        };

        if !improved {
            return (self.clone(), false);
        }

        let next = BestState::Known {
            loss: candidate,
            name: best_checkpoint_name(iter, candidate),
        };

        (next, true)
    }

    pub fn loss(&self) -> Option<f64> {
        match self {
            BestState::Unset => None,
            BestState::Known { loss, .. } => Some(*loss),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            BestState::Unset => None,
            BestState::Known { name, .. } => Some(name),
        }
    }
}
