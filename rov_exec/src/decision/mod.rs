//! # Decision controller
//!
//! A finite state machine which turns the latest perception outputs and rover telemetry into
//! throttle, brake and steer demands. The controller is run once per tick, after perception.
//!
//! Modes:
//! - [`Mode::Forward`] - cruise along navigable terrain (initial mode)
//! - [`Mode::Stop`] - brake, then pivot until a way forward is found
//! - [`Mode::Pickup`] - approach a visible rock sample and request its pickup

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod forward;
mod params;
mod pickup;
mod stop;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use util::{maths::clamp, params::LoadError};

pub use params::DecisionParams;
use crate::{
    per::PerOutput,
    rover::{RoverState, TurnDir},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of mode functions evaluated in a single step. Only pickup falls through (to
/// forward), so two is always enough.
const MAX_EVALS_PER_STEP: usize = 2;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Forward,
    Stop,
    Pickup,
}

/// Outcome of evaluating a mode for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transition {
    /// Remain in the current mode.
    Stay,

    /// Switch to the given mode from the next tick.
    Enter(Mode),

    /// Switch to the given mode and evaluate it within this tick.
    Fallthrough(Mode),
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("Failed to load the decision parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid decision parameters: {0}")]
    InvalidParams(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct DecisionCtrl {
    params: DecisionParams,
}

/// Summary of a decision step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DecisionReport {
    pub mode_in: Mode,
    pub mode_out: Mode,

    /// False if perception had not yet produced any outputs
    pub perception_available: bool,

    /// True if the controller held the rover while a pickup was in progress
    pub holding_for_pickup: bool,
}

/// What the controller can see this tick, reduced from the perception outputs.
#[derive(Debug, Clone, Copy, Default)]
struct Sight {
    nav_count: usize,

    /// Mean navigable angle, `None` if there is no navigable terrain
    nav_mean_deg: Option<f64>,

    rock_visible: bool,
    rock_mean_deg: Option<f64>,

    /// True if obstacles ahead are closer on average than the stop distance
    obstacle_near: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Mode {
    fn default() -> Self {
        Mode::Forward
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Forward => write!(f, "forward"),
            Mode::Stop => write!(f, "stop"),
            Mode::Pickup => write!(f, "pickup"),
        }
    }
}

impl Sight {
    fn new(out: &PerOutput, params: &DecisionParams) -> Self {
        let rock_visible = out.rock.len() >= params.min_rock_pixels;

        Self {
            nav_count: out.nav.len(),
            nav_mean_deg: out.nav.mean_angle_deg(),
            rock_visible,
            rock_mean_deg: if rock_visible { out.rock.mean_angle_deg() } else { None },
            obstacle_near: out.obstacle
                .mean_dist_within(params.obstacle_fov_half_deg)
                .map(|d| d < params.obstacle_stop_dist)
                .unwrap_or(false),
        }
    }
}

impl DecisionCtrl {
    /// Load the parameters from the given file (relative to the params directory) and build the
    /// controller.
    pub fn init(params_path: &str) -> Result<Self, DecisionError> {
        let params: DecisionParams = match util::params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(DecisionError::ParamLoadError(e)),
        };

        Self::new(params)
    }

    pub fn new(params: DecisionParams) -> Result<Self, DecisionError> {
        params.validate()?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &DecisionParams {
        &self.params
    }

    /// Run the controller for one tick, updating the actuation fields and mode of the rover.
    pub fn step(&self, rover: &mut RoverState) -> DecisionReport {
        let mode_in = rover.mode;
        let mut report = DecisionReport {
            mode_in,
            mode_out: mode_in,
            perception_available: rover.perception.is_some(),
            holding_for_pickup: false,
        };

        // The pickup request is only raised for a single tick
        rover.send_pickup = false;

        if rover.picking_up {
            brake_full(&self.params, rover);
            report.holding_for_pickup = true;
            return report;
        }

        let sight = match rover.perception {
            Some(ref out) => Sight::new(out, &self.params),
            None => {
                // Nudge the rover into motion until the first frame has been processed
                rover.throttle = self.params.throttle_set;
                rover.brake = 0.0;
                rover.steer_deg = 0.0;
                return report;
            }
        };

        debug!("Decision sight: {:?}", sight);

        let mut mode = mode_in;

        for _ in 0..MAX_EVALS_PER_STEP {
            let transition = match mode {
                Mode::Forward => forward::step(&self.params, rover, &sight),
                Mode::Stop => stop::step(&self.params, rover, &sight),
                Mode::Pickup => pickup::step(&self.params, rover, &sight),
            };

            match transition {
                Transition::Stay => break,
                Transition::Enter(next) => {
                    mode = next;
                    break;
                }
                Transition::Fallthrough(next) => {
                    debug!("Falling through from {} to {}", mode, next);
                    mode = next;
                }
            }
        }

        if mode != mode_in {
            info!("Decision mode change: {} -> {}", mode_in, mode);
        }

        if rover.throttle < 0.0 || rover.brake < 0.0 {
            warn!(
                "Negative actuation demand (throttle {}, brake {})",
                rover.throttle, rover.brake
            );
        }

        rover.mode = mode;
        report.mode_out = mode;
        report
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Full brake with throttle and steer released.
fn brake_full(params: &DecisionParams, rover: &mut RoverState) {
    rover.throttle = 0.0;
    rover.brake = params.brake_set;
    rover.steer_deg = 0.0;
}

/// Steer to the limit, opposite to the remembered turn direction.
fn steer_hard(params: &DecisionParams, rover: &mut RoverState) {
    rover.steer_deg = -rover.steer_dir.sign() * params.max_steer_deg;
}

/// Steer towards the given heading, clipped to the steer limit, and remember the direction.
///
/// If there is no heading the steer demand is left unchanged.
fn steer_towards(params: &DecisionParams, rover: &mut RoverState, heading_deg: Option<f64>) {
    if let Some(h) = heading_deg {
        let steer = clamp(&h, &-params.max_steer_deg, &params.max_steer_deg);
        rover.steer_deg = steer;
        rover.steer_dir = TurnDir::from_steer(steer);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::geom::PolarPoints;

    const TOL: f64 = 1e-9;

    /// `n` points at the given distance and angle.
    fn points(n: usize, dist: f64, angle_deg: f64) -> PolarPoints {
        PolarPoints {
            dists: vec![dist; n],
            angles_rad: vec![angle_deg.to_radians(); n],
        }
    }

    fn sees(nav: usize, nav_angle_deg: f64, rock: Option<f64>) -> PerOutput {
        PerOutput {
            nav: points(nav, 60.0, nav_angle_deg),
            rock: rock.map(|a| points(3, 40.0, a)).unwrap_or_default(),
            obstacle: points(100, 80.0, 40.0),
        }
    }

    fn ctrl() -> DecisionCtrl {
        DecisionCtrl::new(DecisionParams::default()).unwrap()
    }

    #[test]
    fn test_no_perception_nudge() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.steer_deg = 7.0;
        rover.brake = 3.0;

        let report = ctrl.step(&mut rover);

        assert!(!report.perception_available);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.steer_deg, 0.0);
        assert_eq!(rover.brake, 0.0);
        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(report.mode_out, Mode::Stop);
    }

    #[test]
    fn test_forward_to_stop_on_low_nav() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.vel = 1.0;
        rover.throttle = 0.2;
        rover.perception = Some(sees(49, 0.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.brake, 10.0);
        assert_eq!(rover.throttle, 0.0);
        assert_eq!(rover.steer_deg, 0.0);
    }

    #[test]
    fn test_forward_cruise() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.vel = 1.0;
        rover.perception = Some(sees(600, -8.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.brake, 0.0);
        assert!((rover.steer_deg + 8.0).abs() < TOL);
        assert_eq!(rover.steer_dir, TurnDir::Right);

        // Coast at max velocity, steer clipped
        rover.vel = 2.5;
        rover.perception = Some(sees(600, 30.0, None));
        ctrl.step(&mut rover);

        assert_eq!(rover.throttle, 0.0);
        assert!((rover.steer_deg - 15.0).abs() < TOL);
        assert_eq!(rover.steer_dir, TurnDir::Left);
    }

    #[test]
    fn test_forward_stuck_steers_hard() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.vel = 0.0;
        rover.throttle = 0.2;
        rover.brake = 0.0;
        rover.steer_dir = TurnDir::Right;
        rover.perception = Some(sees(600, 2.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.steer_deg, 15.0);
    }

    #[test]
    fn test_forward_near_obstacle_with_open_ground() {
        let ctrl = ctrl();

        // Plenty of navigable terrain, a close obstacle straight ahead does not stop the rover
        let mut rover = RoverState::default();
        rover.vel = 1.0;
        let mut out = sees(600, 0.0, None);
        out.obstacle = points(20, 3.0, 0.0);
        rover.perception = Some(out);

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.brake, 0.0);

        // Too little navigable terrain with the same obstacle, the rover stops
        let mut rover = RoverState::default();
        rover.vel = 1.0;
        let mut out = sees(30, 0.0, None);
        out.obstacle = points(20, 3.0, 0.0);
        rover.perception = Some(out);

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.brake, 10.0);
        assert_eq!(rover.throttle, 0.0);
        assert_eq!(rover.steer_deg, 0.0);
    }

    #[test]
    fn test_forward_to_pickup_on_rock() {
        let ctrl = ctrl();

        let mut rover = RoverState::default();
        rover.vel = 0.5;
        rover.perception = Some(sees(600, -5.0, Some(10.0)));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Pickup);
        assert!((rover.steer_deg - 10.0).abs() < 1e-6);
        assert_eq!(rover.steer_dir, TurnDir::Left);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.brake, 0.0);

        let mut rover = RoverState::default();
        rover.vel = 1.5;
        rover.perception = Some(sees(600, -5.0, Some(40.0)));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Pickup);
        assert!((rover.steer_deg - 15.0).abs() < TOL);
        assert_eq!(rover.throttle, 0.0);
    }

    #[test]
    fn test_rock_visibility_threshold() {
        let mut params = DecisionParams::default();
        params.min_rock_pixels = 5;
        let ctrl = DecisionCtrl::new(params).unwrap();

        let mut rover = RoverState::default();
        rover.vel = 1.0;
        rover.perception = Some(sees(600, 0.0, Some(10.0)));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Forward);
    }

    #[test]
    fn test_stop_holds_brake_while_moving() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.vel = 0.5;
        rover.perception = Some(sees(600, 0.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.brake, 10.0);
        assert_eq!(rover.throttle, 0.0);
    }

    #[test]
    fn test_stop_pivots_without_opening() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.vel = 0.1;
        rover.brake = 10.0;
        rover.steer_dir = TurnDir::Left;
        rover.perception = Some(sees(499, 0.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.throttle, 0.0);
        assert_eq!(rover.brake, 0.0);
        assert_eq!(rover.steer_deg, -15.0);

        // The remembered direction is not changed by pivoting
        assert_eq!(rover.steer_dir, TurnDir::Left);
    }

    #[test]
    fn test_stop_to_forward() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.vel = 0.2;
        rover.brake = 10.0;
        rover.perception = Some(sees(500, -4.0, None));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.throttle, 0.2);
        assert_eq!(rover.brake, 0.0);
        assert!((rover.steer_deg + 4.0).abs() < TOL);
    }

    #[test]
    fn test_pickup_alongside_sample() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Pickup;
        rover.vel = 0.3;
        rover.throttle = 0.2;
        rover.near_sample = true;
        rover.rocks_collected = 2;
        rover.perception = Some(sees(600, 0.0, Some(3.0)));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.brake, 10.0);
        assert_eq!(rover.throttle, 0.0);
        assert_eq!(rover.steer_deg, 0.0);
        assert_eq!(rover.rocks_collected, 3);
        assert!(rover.send_pickup);
        assert_eq!(rover.actuation_dems().send_pickup, true);

        // Request is edge triggered
        ctrl.step(&mut rover);
        assert!(!rover.send_pickup);
        assert_eq!(rover.rocks_collected, 3);
    }

    #[test]
    fn test_pickup_approach() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Pickup;
        rover.vel = 1.2;
        rover.perception = Some(sees(600, 0.0, Some(-6.0)));

        ctrl.step(&mut rover);

        assert_eq!(rover.mode, Mode::Pickup);
        assert_eq!(rover.throttle, 0.0);
        assert_eq!(rover.brake, 0.0);
        assert!((rover.steer_deg + 6.0).abs() < 1e-6);
        assert_eq!(rover.steer_dir, TurnDir::Right);
        assert!(!rover.send_pickup);
    }

    #[test]
    fn test_pickup_target_lost_falls_through() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Pickup;
        rover.vel = 0.5;
        rover.perception = Some(sees(600, 5.0, None));

        let report = ctrl.step(&mut rover);

        // Forward was evaluated in the same tick
        assert_eq!(report.mode_in, Mode::Pickup);
        assert_eq!(report.mode_out, Mode::Forward);
        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.brake, 0.0);
        assert_eq!(rover.throttle, 0.2);
        assert!((rover.steer_deg - 5.0).abs() < TOL);
    }

    #[test]
    fn test_hold_while_picking_up() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.picking_up = true;
        rover.perception = Some(sees(600, 0.0, None));

        let report = ctrl.step(&mut rover);

        assert!(report.holding_for_pickup);
        assert_eq!(rover.mode, Mode::Stop);
        assert_eq!(rover.brake, 10.0);
        assert_eq!(rover.throttle, 0.0);
    }

    #[test]
    fn test_empty_nav_keeps_steer() {
        let ctrl = ctrl();
        let mut rover = RoverState::default();
        rover.mode = Mode::Stop;
        rover.vel = 0.0;
        rover.steer_deg = 4.0;

        let mut params = DecisionParams::default();
        params.go_forward = 0;
        params.stop_forward = 0;
        let ctrl_zero = DecisionCtrl::new(params).unwrap();

        rover.perception = Some(sees(0, 0.0, None));
        ctrl_zero.step(&mut rover);

        // No navigable angles to average, steer is left as it was
        assert_eq!(rover.mode, Mode::Forward);
        assert_eq!(rover.steer_deg, 4.0);
        assert!(rover.steer_deg.is_finite());

        // With the default thresholds the rover pivots instead
        rover.mode = Mode::Stop;
        ctrl.step(&mut rover);
        assert_eq!(rover.steer_deg, -15.0);
    }

    #[test]
    fn test_params_validation() {
        let mut params = DecisionParams::default();
        params.go_forward = 10;
        assert!(matches!(DecisionCtrl::new(params), Err(DecisionError::InvalidParams(_))));

        let mut params = DecisionParams::default();
        params.brake_set = -1.0;
        assert!(DecisionCtrl::new(params).is_err());

        let mut params = DecisionParams::default();
        params.max_vel = 0.0;
        assert!(DecisionCtrl::new(params).is_err());

        let mut params = DecisionParams::default();
        params.min_rock_pixels = 0;
        assert!(DecisionCtrl::new(params).is_err());

        let mut params = DecisionParams::default();
        params.max_steer_deg = super::params::STEER_LIMIT_DEG + 25.0;
        assert!(matches!(DecisionCtrl::new(params), Err(DecisionError::InvalidParams(_))));

        let mut params = DecisionParams::default();
        params.max_steer_deg = 10.0;
        assert!(DecisionCtrl::new(params).is_ok());

        let params: DecisionParams = util::params::from_str(
            r#"
            stop_forward = 50
            go_forward = 500
            throttle_set = 0.2
            brake_set = 10.0
            max_vel = 2.0
            max_steer_deg = 15.0
            stop_vel_threshold = 0.2
            rock_approach_max_vel = 1.0
            obstacle_stop_dist = 5.0
            obstacle_fov_half_deg = 15.0
            min_rock_pixels = 1
            "#,
        )
        .unwrap();
        assert!(DecisionCtrl::new(params).is_ok());
    }
}
