//! Schedules producing a value per step.
//!
//! A schedule is a small state machine: [`Schedule::update`] advances it and
//! returns the new value, [`Schedule::get_value`] peeks without advancing.
//! Agents use `f64` schedules for exploration rates and `bool` schedules to
//! gate learning, training periods and target-network synchronization.
mod base;
mod config;
pub use base::{ConstantSchedule, LinearSchedule, PeriodicSchedule, Schedule, SwitchSchedule};
pub use config::{ScheduleConfig, ScheduleValue};
