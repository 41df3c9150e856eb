//! Recorder writing scalar records to TFRecord files for TensorBoard.
use log::warn;
use rrl_core::record::{Record, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
///
/// The step of a record is read from its step key. By default, this is
/// any key ending with `_step`, as in the records written by
/// [`ScheduledLogger`](rrl_core::logger::ScheduledLogger). Records without a
/// step are skipped.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: Option<String>,
    warn_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: None,
            warn_unsupported_value: false,
        }
    }

    /// Reads steps from `key` instead of keys ending with `_step`.
    pub fn step_key(mut self, key: impl Into<String>) -> Self {
        self.step_key = Some(key.into());
        self
    }

    /// Logs a warning for values that cannot be written.
    pub fn warn_unsupported_value(mut self, v: bool) -> Self {
        self.warn_unsupported_value = v;
        self
    }

    fn is_step_key(&self, k: &str) -> bool {
        match &self.step_key {
            Some(key) => k == key,
            None => k.ends_with("_step"),
        }
    }

    fn step(&self, record: &Record) -> Option<usize> {
        record.iter().find_map(|(k, v)| match v {
            RecordValue::Scalar(v) if self.is_step_key(k) => Some(*v as usize),
            _ => None,
        })
    }

    /// Flushes buffered summaries to disk.
    pub fn flush(&mut self) {
        self.writer.flush();
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] in the [Record].
    /// [RecordValue::DateTime] is discarded and other variants are ignored.
    fn write(&mut self, record: Record) {
        let step = match self.step(&record) {
            Some(step) => step,
            None => {
                warn!("Record without step is not written: {:?}", record.keys());
                return;
            }
        };

        for (k, v) in record.iter() {
            if self.is_step_key(k) {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::DateTime(_) => {}
                _ => {
                    if self.warn_unsupported_value {
                        warn!("Unsupported value: {:?}", (k, v));
                    }
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrl_core::{
        logger::{Logger, ScheduledLogger},
        schedule::PeriodicSchedule,
    };
    use tempdir::TempDir;

    #[test]
    fn test_write_logged_scalars() {
        let dir = TempDir::new("tensorboard").unwrap();
        let recorder = TensorboardRecorder::new(dir.path()).warn_unsupported_value(true);
        let mut logger = ScheduledLogger::new(recorder);
        logger.register_timescale("agent_0", Box::new(PeriodicSchedule::new(false, true, 1)));

        for i in 0..3 {
            logger.update_step("agent_0");
            logger.log_scalar("epsilon", 1.0 - 0.1 * i as f32, "agent_0");
        }
        let mut recorder = TensorboardRecorder::new(dir.path()).step_key("step");
        recorder.write(Record::from_scalar("loss", 0.5));
        recorder.flush();

        let n_files = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(n_files >= 1);
    }
}
