//! Shared data structures for the sensor-to-actuator pipeline
//!
//! Defines the fixed-size message exchanged on channels and the category
//! codes that identify each message's logical source:
//! - one category per sensor class (IMU, GNSS, star tracker)
//! - one for the controller's own emissions
//! - one reserved termination category for the shutdown broadcast
//!
//! A category-filtered receive distinguishes message domains solely by this
//! tag, so a code is never reused across domains that must be told apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer tag identifying a message's logical source or purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category(pub i64);

impl Category {
    /// Inertial measurement unit sensor class.
    pub const IMU: Category = Category(1);
    /// GNSS receiver sensor class.
    pub const GNSS: Category = Category(2);
    /// Star tracker sensor class.
    pub const STAR_TRACKER: Category = Category(3);
    /// Actuator identity (reserved; actuators only consume).
    pub const ACTUATOR: Category = Category(4);
    /// Stamped on every command the controller emits.
    pub const CONTROLLER: Category = Category(5);
    /// Shutdown broadcast to long-running roles.
    pub const TERMINATE: Category = Category(10_000);
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Category::IMU => write!(f, "IMU"),
            Category::GNSS => write!(f, "GNSS"),
            Category::STAR_TRACKER => write!(f, "StarTracker"),
            Category::ACTUATOR => write!(f, "Actuator"),
            Category::CONTROLLER => write!(f, "Controller"),
            Category::TERMINATE => write!(f, "Terminate"),
            Category(other) => write!(f, "Category({other})"),
        }
    }
}

/// Sentinel payload carried by a termination message. The canonical check
/// requires both the category and this payload to match.
pub const TERMINATE_PAYLOAD: i64 = 10_000;

/// Default value a voter emits when all three replica readings disagree.
pub const NO_CONSENSUS_VALUE: i64 = 0;

/// Fixed-size message exchanged on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub category: Category,
    pub payload: i64,
}

impl Message {
    pub fn new(category: Category, payload: i64) -> Self {
        Self { category, payload }
    }

    /// Build the termination sentinel broadcast to controller and voters.
    pub fn terminate() -> Self {
        Self {
            category: Category::TERMINATE,
            payload: TERMINATE_PAYLOAD,
        }
    }

    /// True when this message is the termination sentinel (category and
    /// payload must both match).
    pub fn is_terminate(&self) -> bool {
        self.category == Category::TERMINATE && self.payload == TERMINATE_PAYLOAD
    }
}

/// One of the three redundant sensor classes feeding the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    Imu,
    Gnss,
    StarTracker,
}

impl SensorClass {
    pub const ALL: [SensorClass; 3] = [
        SensorClass::Imu,
        SensorClass::Gnss,
        SensorClass::StarTracker,
    ];

    /// Category stamped on every reading this class produces.
    pub fn category(self) -> Category {
        match self {
            SensorClass::Imu => Category::IMU,
            SensorClass::Gnss => Category::GNSS,
            SensorClass::StarTracker => Category::STAR_TRACKER,
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorClass::Imu => write!(f, "IMU"),
            SensorClass::Gnss => write!(f, "GNSS"),
            SensorClass::StarTracker => write!(f, "StarTracker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_categories_are_distinct() {
        let codes = [
            Category::IMU,
            Category::GNSS,
            Category::STAR_TRACKER,
            Category::ACTUATOR,
            Category::CONTROLLER,
            Category::TERMINATE,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b, "category codes must not collide");
            }
        }
    }

    #[test]
    fn terminate_requires_both_category_and_payload() {
        assert!(Message::terminate().is_terminate());
        // Right category, wrong payload: not a termination signal.
        assert!(!Message::new(Category::TERMINATE, 1).is_terminate());
        // Right payload, wrong category.
        assert!(!Message::new(Category::CONTROLLER, TERMINATE_PAYLOAD).is_terminate());
    }

    #[test]
    fn sensor_class_maps_to_its_category() {
        assert_eq!(SensorClass::Imu.category(), Category::IMU);
        assert_eq!(SensorClass::Gnss.category(), Category::GNSS);
        assert_eq!(SensorClass::StarTracker.category(), Category::STAR_TRACKER);
    }
}
