//! # Stop mode
//!
//! Brake until stationary, then pivot in place until enough navigable terrain is in view.
//!
//! Possible transitions:
//! - Forward, once stopped with enough navigable terrain ahead

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{brake_full, steer_hard, steer_towards, DecisionParams, Mode, Sight, Transition};
use crate::rover::RoverState;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn step(params: &DecisionParams, rover: &mut RoverState, sight: &Sight) -> Transition {
    if rover.vel > params.stop_vel_threshold {
        brake_full(params, rover);
        return Transition::Stay;
    }

    if sight.nav_count < params.go_forward {
        rover.throttle = 0.0;
        rover.brake = 0.0;
        steer_hard(params, rover);

        Transition::Stay
    }
    else {
        rover.throttle = params.throttle_set;
        rover.brake = 0.0;
        steer_towards(params, rover, sight.nav_mean_deg);

        Transition::Enter(Mode::Forward)
    }
}
