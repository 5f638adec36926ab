//! Pipeline roles
//!
//! Each role is an independently scheduled task that coordinates with the
//! rest of the pipeline only through channel sends and receives:
//!
//! - **Sensor**: one-shot producer, emits a single reading then terminates
//! - **Voter** (TMR only): long-running 2-of-3 majority adjudicator
//! - **Controller**: long-running, fixed-size rounds of reading -> command
//! - **Actuator**: one-shot consumer, applies a single command
//!
//! Long-running roles poll the command channel nonblockingly at the top of
//! their loop (their only cancellation checkpoint) and exit cleanly when
//! the termination sentinel is observed. A role blocked mid-round cannot be
//! interrupted; termination takes effect at the next checkpoint. Role-local
//! failures terminate only that role.

pub mod actuator;
pub mod controller;
pub mod sensor;
pub mod voter;

pub use actuator::run_actuator;
pub use controller::run_controller;
pub use sensor::{run_sensor, SensorSpec};
pub use voter::{run_voter, vote_outcome, Verdict};

use thiserror::Error;

use crate::channel::{ChannelError, ChannelHandle};
use crate::types::Message;

/// Readings consumed (and commands emitted) per controller round: one per
/// sensor class.
pub const ROUND_SIZE: usize = 3;

/// Failure that terminates a single role. There is no cross-role
/// propagation: a failed sensor simply never produces its reading, and
/// the rest of the pipeline proceeds with what it does receive.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),
}

/// Checkpoint poll of the command channel shared by voter and controller.
///
/// Consumes the head message if one is present: the termination sentinel
/// requests a stop, anything else on the command channel is dropped.
/// `Empty` means keep running. `Unavailable` is fatal to the caller.
pub(crate) fn poll_termination(cmd: &ChannelHandle) -> Result<bool, ChannelError> {
    match cmd.try_recv() {
        Ok(message) if message.is_terminate() => Ok(true),
        Ok(stray) => {
            tracing::warn!(category = %stray.category, "dropping stray command message");
            Ok(false)
        }
        Err(ChannelError::Empty) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Nonblocking emission shared by every producing role.
///
/// `Full` drops the message (logged) rather than blocking or failing the
/// role: a saturated downstream loses data, it does not stall the loop.
/// `Unavailable` propagates and terminates the caller.
pub(crate) fn emit(
    handle: &ChannelHandle,
    message: Message,
    role: &str,
) -> Result<(), ChannelError> {
    match handle.try_send(message) {
        Ok(()) => Ok(()),
        Err(ChannelError::Full) => {
            tracing::warn!(
                role,
                category = %message.category,
                payload = message.payload,
                "downstream channel full, dropping message"
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}
