//! # Rover state
//!
//! The record threaded through the perception pipeline and the decision controller each tick.
//! Pose and velocity are written only from telemetry, actuation fields only by the decision
//! controller, and perception fields only by the perception manager.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::rover::{ActuationDems, Telemetry};
use image::RgbImage;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{decision::Mode, per::PerOutput};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Remembered direction of the last commanded turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDir {
    /// Positive steer angles
    Left,

    /// Zero or negative steer angles
    Right,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RoverState {
    // ---- POSE (TELEMETRY) ----

    /// Position in the world frame.
    ///
    /// Units: simulation units, one per world map cell at unit scale
    pub position: Vector2<f64>,

    /// Attitude, each in [0, 360).
    ///
    /// Units: degrees
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,

    /// Signed forward velocity
    pub vel: f64,

    pub near_sample: bool,
    pub picking_up: bool,

    // ---- PERCEPTION ----

    /// Latest perception outputs, `None` until perception has run at least once.
    pub perception: Option<PerOutput>,

    /// Debug image of the latest classification
    pub vision_image: Option<RgbImage>,

    // ---- DECISION ----

    pub mode: Mode,

    pub throttle: f64,
    pub brake: f64,

    /// Units: degrees
    pub steer_deg: f64,

    pub steer_dir: TurnDir,

    /// True only on the tick a pickup is requested
    pub send_pickup: bool,

    pub rocks_collected: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TurnDir {
    fn default() -> Self {
        TurnDir::Left
    }
}

impl TurnDir {
    /// The direction of a steer demand.
    pub fn from_steer(steer_deg: f64) -> Self {
        if steer_deg > 0.0 {
            TurnDir::Left
        } else {
            TurnDir::Right
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            TurnDir::Left => 1.0,
            TurnDir::Right => -1.0,
        }
    }
}

impl RoverState {
    /// Copy the telemetry owned fields into the state.
    pub fn apply_telemetry(&mut self, tlm: &Telemetry) {
        self.position = Vector2::new(tlm.position[0], tlm.position[1]);
        self.yaw_deg = tlm.yaw_deg;
        self.pitch_deg = tlm.pitch_deg;
        self.roll_deg = tlm.roll_deg;
        self.vel = tlm.speed;
        self.near_sample = tlm.near_sample;
        self.picking_up = tlm.picking_up;
    }

    /// The current actuation demands.
    pub fn actuation_dems(&self) -> ActuationDems {
        ActuationDems {
            throttle: self.throttle,
            brake: self.brake,
            steer_deg: self.steer_deg,
            send_pickup: self.send_pickup,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
