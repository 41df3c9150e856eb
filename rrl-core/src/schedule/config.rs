//! Serializable description of schedules.
use super::{ConstantSchedule, LinearSchedule, PeriodicSchedule, Schedule, SwitchSchedule};
use crate::error::RrlError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Values a schedule can produce.
pub trait ScheduleValue: Clone + Debug + 'static {
    /// Builds a linear schedule for this value type.
    fn linear(init_value: &Self, end_value: &Self, steps: usize) -> Result<Box<dyn Schedule<Self>>>;
}

impl ScheduleValue for f64 {
    fn linear(init_value: &f64, end_value: &f64, steps: usize) -> Result<Box<dyn Schedule<f64>>> {
        Ok(Box::new(LinearSchedule::new(*init_value, *end_value, steps)))
    }
}

impl ScheduleValue for bool {
    fn linear(_: &bool, _: &bool, _: usize) -> Result<Box<dyn Schedule<bool>>> {
        Err(RrlError::UnsupportedSchedule("Linear".to_string()).into())
    }
}

/// Configuration of a [`Schedule`].
///
/// ```rust
/// use rrl_core::schedule::ScheduleConfig;
///
/// let mut s = ScheduleConfig::Periodic { off_value: false, on_value: true, period: 2 }
///     .build()
///     .unwrap();
/// assert!(!s.update());
/// assert!(s.update());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum ScheduleConfig<T> {
    /// See [`ConstantSchedule`].
    Constant {
        /// The value.
        value: T,
    },

    /// See [`LinearSchedule`].
    Linear {
        /// Value before the first update.
        init_value: T,
        /// Value reached after `steps` updates.
        end_value: T,
        /// Number of updates to reach `end_value`.
        steps: usize,
    },

    /// See [`SwitchSchedule`].
    Switch {
        /// Value before the switch.
        off_value: T,
        /// Value after the switch.
        on_value: T,
        /// Number of updates before the switch.
        steps: usize,
    },

    /// See [`PeriodicSchedule`].
    Periodic {
        /// Value between periods.
        off_value: T,
        /// Value every `period` updates.
        on_value: T,
        /// The period in updates.
        period: usize,
    },
}

impl<T: ScheduleValue> ScheduleConfig<T> {
    /// Constructs the schedule.
    pub fn build(&self) -> Result<Box<dyn Schedule<T>>> {
        Ok(match self {
            Self::Constant { value } => Box::new(ConstantSchedule::new(value.clone())),
            Self::Linear {
                init_value,
                end_value,
                steps,
            } => T::linear(init_value, end_value, *steps)?,
            Self::Switch {
                off_value,
                on_value,
                steps,
            } => Box::new(SwitchSchedule::new(
                off_value.clone(),
                on_value.clone(),
                *steps,
            )),
            Self::Periodic {
                off_value,
                on_value,
                period,
            } => Box::new(PeriodicSchedule::new(
                off_value.clone(),
                on_value.clone(),
                *period,
            )),
        })
    }
}

impl ScheduleConfig<bool> {
    /// Fires every `period` updates.
    pub fn every(period: usize) -> Self {
        Self::Periodic {
            off_value: false,
            on_value: true,
            period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_bool_is_rejected() {
        let config = ScheduleConfig::Linear {
            init_value: false,
            end_value: true,
            steps: 10,
        };
        let err = config.build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<RrlError>(),
            Some(&RrlError::UnsupportedSchedule("Linear".to_string()))
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ScheduleConfig::Linear {
            init_value: 1.0,
            end_value: 0.1,
            steps: 100,
        };
        let s = serde_yaml::to_string(&config).unwrap();
        let loaded: ScheduleConfig<f64> = serde_yaml::from_str(&s).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_every() {
        let mut s = ScheduleConfig::every(3).build().unwrap();
        assert!(!s.update());
        assert!(!s.update());
        assert!(s.update());
    }
}
