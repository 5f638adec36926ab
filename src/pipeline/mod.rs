//! Pipeline orchestration
//!
//! Data flow with TMR enabled, for each of the three sensor classes:
//!
//! ```text
//! 3 x Sensor[class] --> Voter[class] --> Controller --> Actuator(s)
//! ```
//!
//! A separate command channel carries the termination broadcast to the
//! controller and every voter. Without TMR the sensors feed the controller
//! directly and no voters run.

mod orchestrator;

pub use orchestrator::{seeds, Orchestrator, PipelineStats};
