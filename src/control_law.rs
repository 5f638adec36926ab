//! Pluggable control law
//!
//! The GNC algorithm is supplied by another team as a plain scalar function;
//! the pipeline only requires `f(i64) -> i64`. [`RandomOffsetLaw`] is the
//! stand-in used for simulation runs; [`FixedOffsetLaw`] is a deterministic
//! substitute for tests and replays.

use rand::Rng;

/// A control law maps one sensor reading to one actuator command.
///
/// Implementations may keep internal state (e.g. an RNG), hence `&mut self`.
pub trait ControlLaw: Send {
    fn apply(&mut self, input: i64) -> i64;
}

/// Dummy law: adds a pseudo-random 0..100 offset to the input.
pub struct RandomOffsetLaw;

impl ControlLaw for RandomOffsetLaw {
    fn apply(&mut self, input: i64) -> i64 {
        input + rand::thread_rng().gen_range(0..100)
    }
}

/// Deterministic law: adds a constant offset. Any `f(x) = x + k` is a valid
/// substitute for the random stub, which makes end-to-end runs assertable.
pub struct FixedOffsetLaw(pub i64);

impl ControlLaw for FixedOffsetLaw {
    fn apply(&mut self, input: i64) -> i64 {
        input + self.0
    }
}
