use std::{collections::HashMap, io::Write};

use log::warn;
use serde::Serialize;

/// Receives scalar metrics produced during training.
pub trait MetricSink {
    fn put_scalar(&mut self, name: &str, value: f64);
}

/// In-memory history of every scalar recorded, per metric name.
#[derive(Debug, Default, Clone)]
pub struct ScalarStorage {
    history: HashMap<String, Vec<f64>>,
}

impl ScalarStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last value recorded under `name`.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.history.get(name).and_then(|values| values.last().copied())
    }

    /// Returns every value recorded under `name`, oldest first.
    pub fn history(&self, name: &str) -> &[f64] {
        self.history.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl MetricSink for ScalarStorage {
    #[inline]
    fn put_scalar(&mut self, name: &str, value: f64) {
        self.history.entry(name.to_string()).or_default().push(value);
    }
}

#[derive(Serialize)]
struct ScalarRecord<'a> {
    name: &'a str,
    value: f64,
}

/// Writes each scalar as one JSON object per line.
///
/// Write failures are logged and dropped, metrics never stop training.
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MetricSink for JsonLinesWriter<W> {
    fn put_scalar(&mut self, name: &str, value: f64) {
        let record = ScalarRecord { name, value };
        let res = serde_json::to_writer(&mut self.out, &record)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());

        if let Err(e) = res {
            warn!(metric = name; "failed to write scalar: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keeps_history() {
        let mut storage = ScalarStorage::new();
        storage.put_scalar("validation_loss", 2.0);
        storage.put_scalar("validation_loss", 1.5);

        assert_eq!(storage.latest("validation_loss"), Some(1.5));
        assert_eq!(storage.history("validation_loss"), &[2.0, 1.5]);
        assert!(storage.history("lr").is_empty());
        assert_eq!(storage.latest("lr"), None);
    }

    #[test]
    fn json_lines_writer_emits_one_object_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.put_scalar("validation_loss", 0.5);
        writer.put_scalar("validation_loss", 0.25);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["name"], "validation_loss");
        assert_eq!(lines[1]["value"], 0.25);
    }
}
