//! gncsim: fault-tolerant sensor-to-actuator control-loop simulator
//!
//! Simulates a spacecraft-like data pipeline from sensors through a GNC
//! controller to actuators, with optional Triple Modular Redundancy (TMR)
//! that tolerates one faulty replica per sensor class via 2-of-3 voting.
//!
//! ## Architecture
//!
//! - **Channel**: named, bus-durable FIFO queue; the rendezvous point
//!   between independently scheduled roles (no central directory)
//! - **Sensor / Actuator**: one-shot producer and consumer roles
//! - **Voter**: per-class majority adjudication (TMR only)
//! - **Controller**: fixed-size rounds of reading -> control law -> command
//! - **Orchestrator**: channel setup, role population, termination broadcast

pub mod channel;
pub mod config;
pub mod control_law;
pub mod pipeline;
pub mod roles;
pub mod types;

// Re-export the surface a pipeline embedder needs
pub use channel::{ChannelBus, ChannelError, ChannelHandle, ChannelId, Seed};
pub use config::{RunConfig, SensorCounts};
pub use control_law::{ControlLaw, FixedOffsetLaw, RandomOffsetLaw};
pub use pipeline::{Orchestrator, PipelineStats};
pub use types::{Category, Message, SensorClass};
