use super::{Record, RecordValue, Recorder};
use log::info;

/// Emits records through the [`log`] facade at info level.
#[derive(Default)]
pub struct LogRecorder {}

impl LogRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self {}
    }
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        let mut entries = record
            .iter()
            .filter_map(|(k, v)| match v {
                RecordValue::Scalar(v) => Some(format!("{} = {:.6}", k, v)),
                RecordValue::String(s) => Some(format!("{} = {}", k, s)),
                RecordValue::DateTime(t) => Some(format!("{} = {}", k, t)),
                RecordValue::Array1(_) => None,
            })
            .collect::<Vec<_>>();
        entries.sort();
        info!("{}", entries.join(", "));
    }
}
