//! Voter role: 2-of-3 majority adjudication for one sensor class.
//!
//! The voter consumes readings from the three replicas of its class and
//! emits one adjudicated value per iteration. It deliberately does not
//! filter incoming readings by replica identity: with fail-silent (not
//! malicious) replicas, arrival order across the three independent sensor
//! tasks is the only ordering, and two equal readings form a majority no
//! matter which replicas produced them. A replica-id-filtered receive is a
//! possible hardening, but would change which disagreements are visible;
//! see DESIGN.md.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{emit, poll_termination, RoleError};
use crate::channel::{ChannelBus, Seed};
use crate::types::{Message, SensorClass, NO_CONSENSUS_VALUE};

/// Outcome of adjudicating one triple of replica readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All readings agreed (the third was never consulted).
    Unanimous(i64),
    /// Two of three agreed; carries the agreeing value.
    Majority(i64),
    /// Pairwise distinct readings: no consensus.
    NoConsensus,
}

impl Verdict {
    /// Value to emit downstream. Disagreement degrades to the safe default.
    pub fn value(self) -> i64 {
        match self {
            Verdict::Unanimous(v) | Verdict::Majority(v) => v,
            Verdict::NoConsensus => NO_CONSENSUS_VALUE,
        }
    }
}

/// Majority logic over one triple, in arrival order.
///
/// The first two readings settle unanimity without consulting the third;
/// otherwise the tie-break compares the second against the third. The
/// result is therefore independent of whether the agreeing pair arrived
/// as #1/#2 or #2/#3.
pub fn vote_outcome(first: i64, second: i64, third: i64) -> Verdict {
    if first == second {
        Verdict::Unanimous(first)
    } else if second == third {
        Verdict::Majority(third)
    } else {
        Verdict::NoConsensus
    }
}

/// Run the voter for `class` until a termination sentinel is observed on
/// the command channel. Returns the number of adjudicated iterations.
///
/// Per iteration: checkpoint poll, two blocking receives, a conditional
/// third receive on disagreement, then one nonblocking downstream send
/// tagged with the class category. The third replica's reading is left
/// queued whenever the first two agree.
pub async fn run_voter(
    bus: Arc<ChannelBus>,
    cmd_seed: Seed,
    input_seed: Seed,
    output_seed: Seed,
    class: SensorClass,
) -> Result<u64, RoleError> {
    let cmd = bus.create_or_attach(cmd_seed);
    let input = bus.create_or_attach(input_seed);
    let output = bus.create_or_attach(output_seed);

    info!(class = %class, "voter waiting for messages");
    let mut iterations = 0u64;

    loop {
        if poll_termination(&cmd)? {
            info!(class = %class, iterations, "voter received termination, shutting down");
            return Ok(iterations);
        }

        let first = input.recv().await?;
        debug!(class = %class, payload = first.payload, "voter received reading #1");
        let second = input.recv().await?;
        debug!(class = %class, payload = second.payload, "voter received reading #2");

        let verdict = if first.payload == second.payload {
            let verdict = Verdict::Unanimous(first.payload);
            info!(
                class = %class,
                value = first.payload,
                "3-out-of-3 consensus reached"
            );
            verdict
        } else {
            let third = input.recv().await?;
            debug!(class = %class, payload = third.payload, "voter received reading #3");
            let verdict = vote_outcome(first.payload, second.payload, third.payload);
            match verdict {
                Verdict::Majority(value) => {
                    info!(
                        class = %class,
                        value,
                        outvoted = first.payload,
                        "2-out-of-3 consensus reached"
                    );
                }
                Verdict::NoConsensus => {
                    warn!(
                        class = %class,
                        readings = ?[first.payload, second.payload, third.payload],
                        fallback = NO_CONSENSUS_VALUE,
                        "no consensus, emitting safe default"
                    );
                }
                Verdict::Unanimous(_) => unreachable!("first two readings disagreed"),
            }
            verdict
        };

        emit(
            &output,
            Message::new(class.category(), verdict.value()),
            "voter",
        )?;
        iterations += 1;
    }
}
