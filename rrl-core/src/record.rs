//! Key-value records of training metrics and the sinks they are written to.
//!
//! * [`Record`] - a container of named [`RecordValue`]s
//! * [`Recorder`] - a destination records are written to
//! * [`BufferedRecorder`], [`NullRecorder`], [`LogRecorder`] - recorders
//!
//! ```rust
//! use rrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss", 0.5);
//! record.insert("agent_step", RecordValue::Scalar(10.0));
//! assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
//! ```
mod base;
mod buffered_recorder;
mod log_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
