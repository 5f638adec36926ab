//! Sensor role: one-shot reading producer.
//!
//! One task instance produces exactly one reading. Continuous sampling is
//! modelled by starting more instances, not by looping here.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{emit, RoleError};
use crate::channel::{ChannelBus, Seed};
use crate::types::{Message, SensorClass};

/// Hard stuck-at fault value produced by replica 1 under fault injection.
pub const STUCK_AT_VALUE: i64 = 999;

/// Fixed RNG seed for replica 0's stuck-at-noisy fault. Deliberately not
/// the run's random stream, so the faulty reading reproduces run to run.
const NOISY_FAULT_SEED: u64 = 0x63;

/// Upper bound (exclusive) of a nominal reading.
const NOMINAL_RANGE: i64 = 100;

/// Upper bound (exclusive) of replica 0's noisy fault reading.
const NOISY_RANGE: i64 = 1000;

/// Static parameters of one sensor instance, bound at start.
#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    pub class: SensorClass,
    pub replica: usize,
    pub inject_faults: bool,
    /// Upper bound of the simulated acquisition latency.
    pub max_latency_ms: u64,
}

/// Produce one reading according to the fault-injection rules:
/// - replica 0 with faults on: reproducible wide-range value from a fixed
///   seed (stuck-at-noisy)
/// - replica 1 with faults on: exactly [`STUCK_AT_VALUE`]
/// - everything else: nominal small-range value from the run's RNG
pub fn generate_reading(spec: &SensorSpec) -> i64 {
    if spec.inject_faults {
        match spec.replica {
            0 => {
                let mut rng = StdRng::seed_from_u64(NOISY_FAULT_SEED);
                rng.gen_range(0..NOISY_RANGE)
            }
            1 => STUCK_AT_VALUE,
            _ => rand::thread_rng().gen_range(0..NOMINAL_RANGE),
        }
    } else {
        rand::thread_rng().gen_range(0..NOMINAL_RANGE)
    }
}

/// Run one sensor instance to completion.
///
/// Generates a single reading, sleeps a bounded random interval to model
/// acquisition/bus latency, performs exactly one nonblocking send tagged
/// with the class category, then returns.
pub async fn run_sensor(
    bus: Arc<ChannelBus>,
    data_seed: Seed,
    spec: SensorSpec,
) -> Result<(), RoleError> {
    let data_tx = bus.create_or_attach(data_seed);

    let reading = generate_reading(&spec);
    if spec.inject_faults && spec.replica < 2 {
        info!(
            class = %spec.class,
            replica = spec.replica,
            "sensor simulating stuck-at fault"
        );
    }

    let latency = random_latency(spec.max_latency_ms);
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    debug!(
        class = %spec.class,
        replica = spec.replica,
        reading,
        "sensor generated reading"
    );
    emit(
        &data_tx,
        Message::new(spec.class.category(), reading),
        "sensor",
    )?;
    Ok(())
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
    use crate::channel::DEFAULT_CHANNEL_CAPACITY;
    use crate::types::Category;

    fn spec(class: SensorClass, replica: usize, inject_faults: bool) -> SensorSpec {
        SensorSpec {
            class,
            replica,
            inject_faults,
            max_latency_ms: 0,
        }
    }

    #[test]
    fn faulty_replica_0_is_reproducible() {
        let first = generate_reading(&spec(SensorClass::Imu, 0, true));
        let second = generate_reading(&spec(SensorClass::Gnss, 0, true));
        assert_eq!(first, second, "fixed-seed fault must reproduce");
        assert!((0..NOISY_RANGE).contains(&first));
    }

    #[test]
    fn faulty_replica_1_is_stuck_at_999() {
        for class in SensorClass::ALL {
            assert_eq!(generate_reading(&spec(class, 1, true)), STUCK_AT_VALUE);
        }
    }

    #[test]
    fn other_replicas_stay_nominal() {
        for _ in 0..50 {
            let faulty_run = generate_reading(&spec(SensorClass::Imu, 2, true));
            assert!((0..NOMINAL_RANGE).contains(&faulty_run));
            let clean_run = generate_reading(&spec(SensorClass::Imu, 0, false));
            assert!((0..NOMINAL_RANGE).contains(&clean_run));
        }
    }

    #[tokio::test]
    async fn sensor_is_one_shot() {
        let bus = ChannelBus::new("sensor-test", DEFAULT_CHANNEL_CAPACITY);
        let seed = Seed(1);

        run_sensor(Arc::clone(&bus), seed, spec(SensorClass::Gnss, 0, false))
            .await
            .expect("sensor run");

        let handle = bus.create_or_attach(seed);
        let message = handle.try_recv().expect("exactly one reading emitted");
        assert_eq!(message.category, Category::GNSS);
        assert!((0..NOMINAL_RANGE).contains(&message.payload));
        assert!(handle.is_empty(), "never more than one reading");
    }

    #[tokio::test]
    async fn full_channel_drops_reading_without_failing_the_role() {
        let bus = ChannelBus::new("sensor-test", 1);
        let seed = Seed(2);
        let handle = bus.create_or_attach(seed);
        handle
            .try_send(Message::new(Category::IMU, 7))
            .expect("fill channel");

        run_sensor(Arc::clone(&bus), seed, spec(SensorClass::Imu, 0, false))
            .await
            .expect("a full channel is not a role failure");

        // The pre-existing message is untouched, the new reading was dropped.
        assert_eq!(handle.try_recv().expect("recv").payload, 7);
        assert!(handle.is_empty());
    }
}
