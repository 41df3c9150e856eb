//! Timescale-based metric logging.
//!
//! A *timescale* is a named step counter (for example one per agent).
//! [`Logger::update_step`] advances it, and each timescale carries a `bool`
//! schedule deciding at which of its steps metrics are written. Loggers are
//! fire-and-forget sinks: agents consult them only to decide whether to log.
use crate::{
    record::{Record, RecordValue, Recorder},
    schedule::{PeriodicSchedule, Schedule},
};
use log::trace;
use std::collections::HashMap;

/// Interface of metric loggers.
pub trait Logger {
    /// Registers a timescale with the schedule gating its logging.
    fn register_timescale(&mut self, timescale: &str, schedule: Box<dyn Schedule<bool>>);

    /// Advances the step counter of `timescale` and returns [`Logger::should_log`].
    fn update_step(&mut self, timescale: &str) -> bool;

    /// Returns if metrics should be written at the current step of `timescale`.
    fn should_log(&self, timescale: &str) -> bool;

    /// Logs a scalar at the current step of `timescale`.
    fn log_scalar(&mut self, name: &str, value: f32, timescale: &str);

    /// Logs every scalar of `record` at the current step of `timescale`.
    fn log_metrics(&mut self, record: &Record, timescale: &str) {
        for (k, v) in record.iter() {
            if let RecordValue::Scalar(v) = v {
                self.log_scalar(k, *v, timescale);
            }
        }
    }
}

/// A logger that discards everything.
#[derive(Default)]
pub struct NullLogger {}

impl NullLogger {
    /// Constructs the logger.
    pub fn new() -> Self {
        Self {}
    }
}

impl Logger for NullLogger {
    fn register_timescale(&mut self, _timescale: &str, _schedule: Box<dyn Schedule<bool>>) {}

    fn update_step(&mut self, _timescale: &str) -> bool {
        false
    }

    fn should_log(&self, _timescale: &str) -> bool {
        false
    }

    fn log_scalar(&mut self, _name: &str, _value: f32, _timescale: &str) {}
}

#[derive(Debug)]
struct Timescale {
    step: usize,
    schedule: Box<dyn Schedule<bool>>,
}

/// Writes scalars to a [`Recorder`] at the steps selected by each
/// timescale's schedule.
///
/// Every written record holds the scalar under `{timescale}/{name}` and the
/// step under `{timescale}_step`. Unregistered timescales are registered on
/// first use with a schedule that logs every `default_period` steps.
pub struct ScheduledLogger<W: Recorder> {
    recorder: W,
    timescales: HashMap<String, Timescale>,
    default_period: usize,
}

impl<W: Recorder> ScheduledLogger<W> {
    /// Constructs the logger.
    pub fn new(recorder: W) -> Self {
        Self {
            recorder,
            timescales: HashMap::new(),
            default_period: 1,
        }
    }

    /// Sets the logging period of timescales registered implicitly.
    pub fn default_period(mut self, period: usize) -> Self {
        self.default_period = period;
        self
    }

    /// Returns the underlying recorder.
    pub fn recorder(&self) -> &W {
        &self.recorder
    }

    /// Returns the current step of `timescale`.
    pub fn step(&self, timescale: &str) -> usize {
        self.timescales.get(timescale).map_or(0, |t| t.step)
    }

    fn timescale_mut(&mut self, timescale: &str) -> &mut Timescale {
        let period = self.default_period;
        self.timescales
            .entry(timescale.to_string())
            .or_insert_with(|| Timescale {
                step: 0,
                schedule: Box::new(PeriodicSchedule::new(false, true, period)),
            })
    }
}

impl<W: Recorder> Logger for ScheduledLogger<W> {
    fn register_timescale(&mut self, timescale: &str, schedule: Box<dyn Schedule<bool>>) {
        self.timescales
            .insert(timescale.to_string(), Timescale { step: 0, schedule });
    }

    fn update_step(&mut self, timescale: &str) -> bool {
        let t = self.timescale_mut(timescale);
        t.step += 1;
        t.schedule.update()
    }

    fn should_log(&self, timescale: &str) -> bool {
        match self.timescales.get(timescale) {
            Some(t) => t.schedule.get_value(),
            None => false,
        }
    }

    fn log_scalar(&mut self, name: &str, value: f32, timescale: &str) {
        let step = self.timescale_mut(timescale).step;
        trace!("log {}/{} = {} at step {}", timescale, name, value, step);
        self.recorder.write(Record::from_slice(&[
            (format!("{}/{}", timescale, name), RecordValue::Scalar(value)),
            (format!("{}_step", timescale), RecordValue::Scalar(step as f32)),
        ]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BufferedRecorder;

    #[test]
    fn test_scheduled_logger_period() {
        let mut logger = ScheduledLogger::new(BufferedRecorder::new());
        logger.register_timescale("agent", Box::new(PeriodicSchedule::new(false, true, 2)));

        let mut logged = vec![];
        for _ in 0..6 {
            logged.push(logger.update_step("agent"));
            if logger.should_log("agent") {
                logger.log_scalar("epsilon", 0.5, "agent");
            }
        }
        assert_eq!(logged, vec![false, true, false, true, false, true]);
        assert_eq!(logger.recorder().len(), 3);

        let steps = logger
            .recorder()
            .iter()
            .map(|r| r.get_scalar("agent_step").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(steps, vec![2.0, 4.0, 6.0]);
        assert_eq!(
            logger.recorder().iter().next().unwrap().get_scalar("agent/epsilon"),
            Ok(0.5)
        );
    }

    #[test]
    fn test_unregistered_timescale() {
        let mut logger = ScheduledLogger::new(BufferedRecorder::new());
        assert!(!logger.should_log("other"));
        assert!(logger.update_step("other"));
        assert_eq!(logger.step("other"), 1);
    }

    #[test]
    fn test_null_logger() {
        let mut logger = NullLogger::new();
        assert!(!logger.update_step("agent"));
        assert!(!logger.should_log("agent"));
    }
}
