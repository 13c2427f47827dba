//! # Decision controller parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::DecisionError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest steer demand the actuators accept in either direction.
///
/// Units: degrees
pub const STEER_LIMIT_DEG: f64 = 15.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionParams {
    /// Minimum number of navigable pixels needed to keep driving forward.
    pub stop_forward: usize,

    /// Minimum number of navigable pixels needed to resume driving forward from a stop.
    pub go_forward: usize,

    /// Throttle demanded while accelerating
    pub throttle_set: f64,

    /// Brake demanded while stopping
    pub brake_set: f64,

    /// Cruise velocity cap.
    ///
    /// Units: simulation units/second
    pub max_vel: f64,

    /// Limit of the steer demand in either direction, at most [`STEER_LIMIT_DEG`].
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    /// Below this velocity the rover is considered stopped.
    ///
    /// Units: simulation units/second
    pub stop_vel_threshold: f64,

    /// Velocity cap while approaching a rock sample.
    ///
    /// Units: simulation units/second
    pub rock_approach_max_vel: f64,

    /// Stop if the mean distance to obstacles ahead falls below this.
    ///
    /// Units: rectified pixels (10 per metre in the default calibration)
    pub obstacle_stop_dist: f64,

    /// Half width of the field ahead considered for obstacle proximity.
    ///
    /// Units: degrees
    pub obstacle_fov_half_deg: f64,

    /// Minimum number of rock pixels for a sample to be considered visible.
    pub min_rock_pixels: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            stop_forward: 50,
            go_forward: 500,
            throttle_set: 0.2,
            brake_set: 10.0,
            max_vel: 2.0,
            max_steer_deg: 15.0,
            stop_vel_threshold: 0.2,
            rock_approach_max_vel: 1.0,
            obstacle_stop_dist: 5.0,
            obstacle_fov_half_deg: 15.0,
            min_rock_pixels: 1,
        }
    }
}

impl DecisionParams {
    pub fn validate(&self) -> Result<(), DecisionError> {
        let invalid = |msg: String| Err(DecisionError::InvalidParams(msg));

        if self.go_forward < self.stop_forward {
            return invalid(format!(
                "go_forward ({}) must not be less than stop_forward ({})",
                self.go_forward, self.stop_forward
            ));
        }

        for (name, val) in [
            ("throttle_set", self.throttle_set),
            ("brake_set", self.brake_set),
            ("stop_vel_threshold", self.stop_vel_threshold),
            ("obstacle_stop_dist", self.obstacle_stop_dist),
            ("obstacle_fov_half_deg", self.obstacle_fov_half_deg),
        ]
        .iter()
        {
            if !(*val >= 0.0) {
                return invalid(format!("{} must be non-negative, found {}", name, val));
            }
        }

        for (name, val) in [
            ("max_vel", self.max_vel),
            ("max_steer_deg", self.max_steer_deg),
            ("rock_approach_max_vel", self.rock_approach_max_vel),
        ]
        .iter()
        {
            if !(*val > 0.0) {
                return invalid(format!("{} must be positive, found {}", name, val));
            }
        }

        if self.max_steer_deg > STEER_LIMIT_DEG {
            return invalid(format!(
                "max_steer_deg must not exceed {}, found {}",
                STEER_LIMIT_DEG, self.max_steer_deg
            ));
        }

        if self.min_rock_pixels < 1 {
            return invalid(String::from("min_rock_pixels must be at least 1"));
        }

        Ok(())
    }
}
