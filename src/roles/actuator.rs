//! Actuator role: one-shot command consumer.
//!
//! Mirrors the sensor's one-shot lifecycle on the consuming side: one task
//! instance applies exactly one command.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::RoleError;
use crate::channel::{ChannelBus, Seed};
use crate::types::Message;

/// Run one actuator instance to completion.
///
/// Blocks until a command arrives, applies it (simulated: logged), sleeps
/// a bounded random interval to model actuation latency, then returns the
/// command it applied.
pub async fn run_actuator(
    bus: Arc<ChannelBus>,
    data_seed: Seed,
    replica: usize,
    max_latency_ms: u64,
) -> Result<Message, RoleError> {
    let data_rx = bus.create_or_attach(data_seed);

    let command = data_rx.recv().await?;
    info!(
        replica,
        category = %command.category,
        value = command.payload,
        "actuator applying command"
    );

    let latency = random_latency(max_latency_ms);
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    Ok(command)
}

fn random_latency(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelBus, ChannelError, DEFAULT_CHANNEL_CAPACITY};
    use crate::types::Category;

    #[tokio::test]
    async fn actuator_consumes_exactly_one_command() {
        let bus = ChannelBus::new("actuator-test", DEFAULT_CHANNEL_CAPACITY);
        let seed = Seed(2);
        let handle = bus.create_or_attach(seed);
        handle
            .try_send(Message::new(Category::CONTROLLER, 41))
            .expect("send");
        handle
            .try_send(Message::new(Category::CONTROLLER, 43))
            .expect("send");

        let applied = run_actuator(Arc::clone(&bus), seed, 0, 0)
            .await
            .expect("actuator run");
        assert_eq!(applied.payload, 41);
        // The second command is left for another actuator instance.
        assert_eq!(handle.len(), 1);
    }

    #[tokio::test]
    async fn actuator_blocks_until_a_command_arrives() {
        let bus = ChannelBus::new("actuator-test", DEFAULT_CHANNEL_CAPACITY);
        let seed = Seed(2);

        let task = tokio::spawn(run_actuator(Arc::clone(&bus), seed, 0, 0));
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        bus.create_or_attach(seed)
            .try_send(Message::new(Category::CONTROLLER, 7))
            .expect("send");
        let applied = task.await.expect("join").expect("actuator run");
        assert_eq!(applied.payload, 7);
    }

    #[tokio::test]
    async fn destroyed_channel_is_fatal_to_a_waiting_actuator() {
        let bus = ChannelBus::new("actuator-test", DEFAULT_CHANNEL_CAPACITY);
        let seed = Seed(2);
        let handle = bus.create_or_attach(seed);

        let task = tokio::spawn(run_actuator(Arc::clone(&bus), seed, 0, 0));
        tokio::task::yield_now().await;
        bus.destroy(&handle).expect("destroy");

        match task.await.expect("join") {
            Err(RoleError::Channel(ChannelError::Unavailable(_))) => {}
            other => panic!("expected Unavailable failure, got {other:?}"),
        }
    }
}
