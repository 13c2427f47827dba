//! # Pickup mode
//!
//! Creep towards a visible rock sample and request a pickup once alongside it.
//!
//! Possible transitions:
//! - Stop, once the pickup has been requested
//! - Forward, if the sample is lost from view. Forward is evaluated in the same tick so the rover
//!   does not sit still without a target.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use super::{brake_full, steer_towards, DecisionParams, Mode, Sight, Transition};
use crate::rover::RoverState;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn step(params: &DecisionParams, rover: &mut RoverState, sight: &Sight) -> Transition {
    if !sight.rock_visible {
        return Transition::Fallthrough(Mode::Forward);
    }

    steer_towards(params, rover, sight.rock_mean_deg);

    if rover.near_sample {
        brake_full(params, rover);
        rover.rocks_collected += 1;
        rover.send_pickup = true;

        info!("Alongside sample, requesting pickup (sample {})", rover.rocks_collected);

        return Transition::Enter(Mode::Stop);
    }

    rover.throttle = if rover.vel < params.rock_approach_max_vel {
        params.throttle_set
    } else {
        0.0
    };
    rover.brake = 0.0;

    Transition::Stay
}
