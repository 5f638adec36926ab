//! Orchestrator: builds the channel topology, runs the role population,
//! and drives the termination protocol.
//!
//! The orchestrator creates every channel before any role starts (the
//! create-or-attach idiom in the roles still tolerates any start order),
//! waits for the one-shot roles to finish (their completion means the
//! pipeline produced a full cycle of output), and only then broadcasts one
//! termination sentinel per long-running role. The broadcast is
//! fire-and-forget: no acknowledgment, no retry, no confirmation that the
//! controller or voters actually exited. A lost sentinel would leave a
//! role running until its channels are destroyed, which is the final step
//! and the only destructive shared-resource operation; roles still blocked
//! at that point observe `Unavailable` and terminate.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channel::{ChannelBus, ChannelError, ChannelHandle};
use crate::config::RunConfig;
use crate::control_law::ControlLaw;
use crate::roles::{self, RoleError, SensorSpec};
use crate::types::{Message, SensorClass};

/// Rendezvous seeds of the pipeline's channels. Shared constants rather
/// than a directory: every role derives its channel identity from these.
pub mod seeds {
    use crate::channel::Seed;
    use crate::types::SensorClass;

    /// Adjudicated (or direct) sensor readings into the controller.
    pub const SENSOR_DATA: Seed = Seed(1);
    /// Controller commands out to the actuators.
    pub const ACTUATOR_DATA: Seed = Seed(2);
    /// Raw IMU replica readings into the IMU voter (TMR only).
    pub const TMR_IMU: Seed = Seed(3);
    /// Raw GNSS replica readings into the GNSS voter (TMR only).
    pub const TMR_GNSS: Seed = Seed(4);
    /// Raw star-tracker replica readings into its voter (TMR only).
    pub const TMR_STAR_TRACKER: Seed = Seed(5);
    /// Termination broadcast to the controller and all voters.
    pub const COMMAND: Seed = Seed(6);

    /// Voter input channel for one sensor class.
    pub fn tmr_input(class: SensorClass) -> Seed {
        match class {
            SensorClass::Imu => TMR_IMU,
            SensorClass::Gnss => TMR_GNSS,
            SensorClass::StarTracker => TMR_STAR_TRACKER,
        }
    }
}

/// Identity of a completed one-shot role, for supervisor logging.
enum RoleName {
    Sensor { class: SensorClass, replica: usize },
    Actuator { replica: usize },
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleName::Sensor { class, replica } => write!(f, "Sensor {class}/{replica}"),
            RoleName::Actuator { replica } => write!(f, "Actuator {replica}"),
        }
    }
}

/// Final orchestration statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// One-shot roles (sensors, actuators) that ran to completion.
    pub one_shots_completed: usize,
    /// One-shot roles that failed or panicked. Role-local only; the run
    /// continues without them.
    pub one_shot_failures: usize,
    /// Termination sentinels accepted onto the command channel.
    pub terminations_sent: usize,
    /// Channels destroyed during shutdown.
    pub channels_destroyed: usize,
    /// True when the wait for one-shots was cut short by cancellation.
    pub cancelled: bool,
}

/// Runs one full pipeline cycle: spawn, wait, broadcast, destroy.
pub struct Orchestrator {
    config: RunConfig,
    bus: Arc<ChannelBus>,
}

impl Orchestrator {
    pub fn new(config: RunConfig, bus: Arc<ChannelBus>) -> Self {
        Self { config, bus }
    }

    /// Run the configured pipeline population to completion.
    ///
    /// `law` is the control law handed to the single controller instance.
    /// `cancel` cuts the wait for one-shot roles short (ctrl-c); the
    /// termination broadcast and channel destruction still run so the
    /// long-running roles are not left behind.
    pub async fn run(self, law: Box<dyn ControlLaw>, cancel: CancellationToken) -> PipelineStats {
        let config = &self.config;

        if config.tmr_enabled {
            info!("TMR configuration enabled");
        }

        // Create every channel before any role starts. The handles double
        // as the destruction list for shutdown.
        let command = self.bus.create_or_attach(seeds::COMMAND);
        let mut created: Vec<ChannelHandle> = vec![
            command.clone(),
            self.bus.create_or_attach(seeds::SENSOR_DATA),
            self.bus.create_or_attach(seeds::ACTUATOR_DATA),
        ];
        if config.tmr_enabled {
            for class in SensorClass::ALL {
                created.push(self.bus.create_or_attach(seeds::tmr_input(class)));
            }
        }

        let mut one_shots: JoinSet<Result<RoleName, RoleError>> = JoinSet::new();
        self.spawn_sensors(&mut one_shots);
        self.spawn_actuators(&mut one_shots);
        let long_running = self.spawn_long_running(law);

        // Wait for the one-shot population: sensors done means a full set
        // of readings entered the pipeline, actuators done means the cycle
        // of output left it.
        info!(
            one_shots = one_shots.len(),
            long_running, "orchestrator waiting for one-shot roles"
        );
        let mut completed = 0usize;
        let mut failures = 0usize;
        let mut cancelled = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("orchestrator cancelled, shutting the pipeline down early");
                    cancelled = true;
                    break;
                }
                joined = one_shots.join_next() => {
                    match joined {
                        Some(Ok(Ok(role))) => {
                            info!(role = %role, "one-shot role completed");
                            completed += 1;
                        }
                        Some(Ok(Err(e))) => {
                            // Role-local failure: the pipeline proceeds with
                            // whatever the remaining roles produce.
                            error!("one-shot role failed: {e}");
                            failures += 1;
                        }
                        Some(Err(e)) => {
                            error!("one-shot role panicked: {e}");
                            failures += 1;
                        }
                        None => break,
                    }
                }
            }
        }

        // Broadcast one termination sentinel per long-running role.
        // Fire-and-forget by design: no wait for the roles to exit.
        info!(
            recipients = long_running,
            "one-shot roles finished, broadcasting termination"
        );
        let mut terminations_sent = 0usize;
        for _ in 0..long_running {
            match command.try_send(Message::terminate()) {
                Ok(()) => terminations_sent += 1,
                Err(e) => warn!("termination broadcast not accepted: {e}"),
            }
        }

        // Give the broadcast one grace period to be observed at the roles'
        // checkpoints, then destroy. Anything still blocked terminates on
        // `Unavailable`.
        if config.controller_grace_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.controller_grace_ms)).await;
        }
        let mut channels_destroyed = 0usize;
        for handle in &created {
            match self.bus.destroy(handle) {
                Ok(()) => channels_destroyed += 1,
                Err(e) => warn!(channel = %handle.id(), "channel destruction failed: {e}"),
            }
        }

        let stats = PipelineStats {
            one_shots_completed: completed,
            one_shot_failures: failures,
            terminations_sent,
            channels_destroyed,
            cancelled,
        };
        info!(?stats, "orchestrator finished");
        stats
    }

    /// Spawn the sensor population: `sensors.<class>` instances per class,
    /// tripled under TMR. Replica ids restart at 0 per class, which is
    /// what makes replicas 0 and 1 the faulty ones under fault injection.
    fn spawn_sensors(&self, one_shots: &mut JoinSet<Result<RoleName, RoleError>>) {
        let config = &self.config;
        let per_class = [
            (SensorClass::Imu, config.sensors.imu),
            (SensorClass::Gnss, config.sensors.gnss),
            (SensorClass::StarTracker, config.sensors.star_tracker),
        ];
        for (class, base_count) in per_class {
            let data_seed = if config.tmr_enabled {
                seeds::tmr_input(class)
            } else {
                seeds::SENSOR_DATA
            };
            for replica in 0..config.effective_sensors(base_count) {
                let bus = Arc::clone(&self.bus);
                let spec = SensorSpec {
                    class,
                    replica,
                    inject_faults: config.inject_faults,
                    max_latency_ms: config.max_latency_ms,
                };
                one_shots.spawn(async move {
                    roles::run_sensor(bus, data_seed, spec).await?;
                    Ok(RoleName::Sensor { class, replica })
                });
            }
        }
    }

    fn spawn_actuators(&self, one_shots: &mut JoinSet<Result<RoleName, RoleError>>) {
        for replica in 0..self.config.actuators {
            let bus = Arc::clone(&self.bus);
            let max_latency_ms = self.config.max_latency_ms;
            one_shots.spawn(async move {
                roles::run_actuator(bus, seeds::ACTUATOR_DATA, replica, max_latency_ms).await?;
                Ok(RoleName::Actuator { replica })
            });
        }
    }

    /// Spawn the long-running roles detached and return how many were
    /// started (that is also the number of termination sentinels owed).
    ///
    /// The orchestrator never joins these tasks: shutdown is the
    /// unacknowledged broadcast plus channel destruction.
    fn spawn_long_running(&self, law: Box<dyn ControlLaw>) -> usize {
        let mut count = 0usize;

        if self.config.tmr_enabled {
            for class in SensorClass::ALL {
                let bus = Arc::clone(&self.bus);
                tokio::spawn(async move {
                    let outcome = roles::run_voter(
                        bus,
                        seeds::COMMAND,
                        seeds::tmr_input(class),
                        seeds::SENSOR_DATA,
                        class,
                    )
                    .await;
                    match outcome {
                        Ok(_) => {}
                        // Channel withdrawn while the voter was blocked
                        // mid-iteration: the expected fate of a role that
                        // missed the unacknowledged broadcast.
                        Err(RoleError::Channel(ChannelError::Unavailable(_))) => {
                            warn!(class = %class, "voter stopped on channel destruction");
                        }
                        Err(e) => error!(class = %class, "voter terminated abnormally: {e}"),
                    }
                });
                count += 1;
            }
        }

        let bus = Arc::clone(&self.bus);
        let grace = Duration::from_millis(self.config.controller_grace_ms);
        tokio::spawn(async move {
            let outcome = roles::run_controller(
                bus,
                seeds::COMMAND,
                seeds::SENSOR_DATA,
                seeds::ACTUATOR_DATA,
                law,
                grace,
            )
            .await;
            match outcome {
                Ok(_) => {}
                Err(RoleError::Channel(ChannelError::Unavailable(_))) => {
                    warn!("controller stopped on channel destruction");
                }
                Err(e) => error!("controller terminated abnormally: {e}"),
            }
        });
        count += 1;

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_law::FixedOffsetLaw;

    fn fast_config() -> RunConfig {
        RunConfig {
            max_latency_ms: 0,
            controller_grace_ms: 0,
            ..RunConfig::default()
        }
    }

    #[tokio::test]
    async fn non_tmr_cycle_completes_and_terminates_the_controller() {
        let config = fast_config();
        let bus = ChannelBus::new("orch-test-basic", config.channel_capacity);
        let orchestrator = Orchestrator::new(config.clone(), Arc::clone(&bus));

        let stats = orchestrator
            .run(Box::new(FixedOffsetLaw(1)), CancellationToken::new())
            .await;

        // 3 sensors + 3 actuators, one termination for the controller,
        // 3 channels torn down.
        assert_eq!(stats.one_shots_completed, 6);
        assert_eq!(stats.one_shot_failures, 0);
        assert_eq!(stats.terminations_sent, 1);
        assert_eq!(stats.channels_destroyed, 3);
        assert!(!stats.cancelled);
    }

    #[tokio::test]
    async fn tmr_cycle_runs_voters_and_broadcasts_per_role() {
        let config = RunConfig {
            tmr_enabled: true,
            inject_faults: true,
            ..fast_config()
        };
        let bus = ChannelBus::new("orch-test-tmr", config.channel_capacity);
        let orchestrator = Orchestrator::new(config, Arc::clone(&bus));

        let stats = orchestrator
            .run(Box::new(FixedOffsetLaw(1)), CancellationToken::new())
            .await;

        // 9 sensors + 3 actuators; controller + 3 voters each get a
        // sentinel; 3 shared channels + 3 TMR inputs torn down.
        assert_eq!(stats.one_shots_completed, 12);
        assert_eq!(stats.one_shot_failures, 0);
        assert_eq!(stats.terminations_sent, 4);
        assert_eq!(stats.channels_destroyed, 6);
    }

    #[tokio::test]
    async fn cancellation_cuts_the_wait_short_but_still_shuts_down() {
        // An actuator population larger than one controller round never
        // finishes on its own; cancellation must still tear everything down.
        let config = RunConfig {
            actuators: crate::roles::ROUND_SIZE + 1,
            ..fast_config()
        };
        let bus = ChannelBus::new("orch-test-cancel", config.channel_capacity);
        let orchestrator = Orchestrator::new(config, Arc::clone(&bus));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let stats = orchestrator.run(Box::new(FixedOffsetLaw(1)), cancel).await;
        assert!(stats.cancelled);
        assert_eq!(stats.terminations_sent, 1);
        assert_eq!(stats.channels_destroyed, 3);
    }
}
