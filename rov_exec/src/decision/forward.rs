//! # Forward mode
//!
//! Cruise along the mean navigable heading, turning off towards any visible rock sample.
//!
//! Possible transitions:
//! - Pickup, when a rock is visible
//! - Stop, when there is too little navigable terrain to keep going

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{brake_full, steer_hard, steer_towards, DecisionParams, Mode, Sight, Transition};
use crate::rover::RoverState;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn step(params: &DecisionParams, rover: &mut RoverState, sight: &Sight) -> Transition {
    if sight.rock_visible {
        steer_towards(params, rover, sight.rock_mean_deg);
        rover.throttle = if rover.vel < params.rock_approach_max_vel {
            params.throttle_set
        } else {
            0.0
        };
        rover.brake = 0.0;

        return Transition::Enter(Mode::Pickup);
    }

    if sight.nav_count >= params.stop_forward {
        if is_stuck(rover) {
            debug!("Rover stuck with throttle {:.2}, steering hard", rover.throttle);
            steer_hard(params, rover);
            return Transition::Stay;
        }

        rover.throttle = if rover.vel < params.max_vel {
            params.throttle_set
        } else {
            0.0
        };
        rover.brake = 0.0;
        steer_towards(params, rover, sight.nav_mean_deg);

        Transition::Stay
    }
    else {
        if sight.obstacle_near {
            debug!("Obstacle close ahead with little navigable terrain, stopping");
        }

        brake_full(params, rover);
        Transition::Enter(Mode::Stop)
    }
}

/// Throttle demanded and brake released, yet not moving.
fn is_stuck(rover: &RoverState) -> bool {
    rover.vel == 0.0 && rover.throttle > 0.0 && rover.brake == 0.0
}
