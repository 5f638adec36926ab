//! Controller role: the GNC loop.
//!
//! Consumes one reading per sensor class, applies the pluggable control
//! law, and emits one command per reading. Each iteration is a fixed-size
//! round of [`ROUND_SIZE`](super::ROUND_SIZE) receives and sends; no
//! matching by class id is performed, the blocking receives simply take
//! whatever arrives next. Because the receives block, a termination signal
//! landing mid-round is only observed at the next round boundary.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{emit, poll_termination, RoleError, ROUND_SIZE};
use crate::channel::{ChannelBus, Seed};
use crate::control_law::ControlLaw;
use crate::types::{Category, Message};

/// Run the controller until a termination sentinel is observed on the
/// command channel. Returns the number of completed rounds.
///
/// On termination the controller sleeps `grace` before exiting, letting
/// its in-flight command sends settle downstream.
pub async fn run_controller(
    bus: Arc<ChannelBus>,
    cmd_seed: Seed,
    input_seed: Seed,
    output_seed: Seed,
    mut law: Box<dyn ControlLaw>,
    grace: Duration,
) -> Result<u64, RoleError> {
    let cmd = bus.create_or_attach(cmd_seed);
    let input = bus.create_or_attach(input_seed);
    let output = bus.create_or_attach(output_seed);

    info!("controller waiting for messages");
    let mut rounds = 0u64;

    loop {
        if poll_termination(&cmd)? {
            info!(rounds, "controller received termination, shutting down");
            if !grace.is_zero() {
                tokio::time::sleep(grace).await;
            }
            return Ok(rounds);
        }

        // One fixed-cardinality round: three readings in, three commands
        // out. Cancellation cannot interrupt the round once it has begun.
        for _ in 0..ROUND_SIZE {
            let reading = input.recv().await?;
            debug!(
                category = %reading.category,
                payload = reading.payload,
                "controller received reading"
            );

            let command = law.apply(reading.payload);

            emit(
                &output,
                Message::new(Category::CONTROLLER, command),
                "controller",
            )?;
            debug!(command, "controller sent command to actuators");
        }
        rounds += 1;
    }
}
