//! # Rover Platform Communications Module
//!
//! Per-tick telemetry supplied by the simulator and the actuation demands returned to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use super::cam::CamFrame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry from the simulator for a single tick.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Telemetry {
    /// Signed forward speed of the rover.
    ///
    /// Units: simulation units/second
    pub speed: f64,

    /// Position of the rover in the world frame.
    ///
    /// Units: simulation units
    pub position: [f64; 2],

    /// Attitude of the rover, each in the range [0, 360).
    ///
    /// Units: degrees
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,

    /// True if the rover is adjacent to a collectible sample
    #[serde(default)]
    pub near_sample: bool,

    /// True while the sample arm is performing a pickup
    #[serde(default)]
    pub picking_up: bool,

    /// The latest forward camera frame, or `None` if no frame is available this tick.
    #[serde(default)]
    pub image: Option<CamFrame>
}

/// Demands sent to the rover's actuators at the end of a tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct ActuationDems {
    /// Throttle demand, non-negative
    pub throttle: f64,

    /// Brake demand, non-negative
    pub brake: f64,

    /// Steering angle demand in the range [-15, 15].
    ///
    /// Units: degrees
    pub steer_deg: f64,

    /// Pickup request, true only on the tick a pickup is to be initiated
    pub send_pickup: bool
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Parse a single JSON telemetry record.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_telemetry_without_frame() {
        let tlm = Telemetry::from_json(
            r#"{"speed": 0.5, "position": [99.7, 85.6], "yaw_deg": 56.8,
                "pitch_deg": 359.2, "roll_deg": 0.4}"#
        ).unwrap();

        assert_eq!(tlm.speed, 0.5);
        assert_eq!(tlm.position, [99.7, 85.6]);
        assert!(!tlm.near_sample);
        assert!(!tlm.picking_up);
        assert!(tlm.image.is_none());
    }

    #[test]
    fn test_parse_telemetry_rejects_missing_pose() {
        assert!(Telemetry::from_json(r#"{"speed": 0.5}"#).is_err());
    }
}
