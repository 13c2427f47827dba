//! # Data Store
//!
//! Holds everything that persists between ticks and runs one tick of the rover: telemetry in,
//! perception, decision, demands out.

use comms_if::eqpt::rover::{ActuationDems, Telemetry};
use log::{trace, warn};
use serde::Serialize;

use crate::{
    decision::{DecisionCtrl, DecisionReport, Mode},
    map::WorldMap,
    per::{PerMgr, PerReport},
    rover::RoverState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    pub rover: RoverState,

    pub world_map: WorldMap,

    // Reports from the last cycle
    pub per_report: Option<PerReport>,
    pub decision_report: Option<DecisionReport>,

    // Monitoring Counters
    /// Number of consecutive frames which could not be processed
    pub num_consec_skipped_frames: u64,

    /// Number of cycles with no camera frame
    pub num_frameless_cycles: u64,
}

/// A single row of the per-cycle archive.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub cycle: u64,
    pub mode: Mode,
    pub vel: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steer_deg: f64,
    pub send_pickup: bool,
    pub rocks_collected: u32,
    pub nav_pixels: Option<usize>,
    pub obstacle_pixels: Option<usize>,
    pub rock_pixels: Option<usize>,
    pub map_updated: bool,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a new store with an empty world map sized for the perception parameters.
    pub fn new(per_mgr: &PerMgr) -> Self {
        Self {
            num_cycles: 0,
            rover: RoverState::default(),
            world_map: per_mgr.new_world_map(),
            per_report: None,
            decision_report: None,
            num_consec_skipped_frames: 0,
            num_frameless_cycles: 0,
        }
    }

    /// Run one cycle, returning the demands to send to the actuators.
    ///
    /// Perception is skipped, with a warning, if the frame is missing or cannot be processed. The
    /// decision controller is always run.
    pub fn step(
        &mut self,
        tlm: &Telemetry,
        per_mgr: &PerMgr,
        decision: &DecisionCtrl,
    ) -> ActuationDems {
        self.rover.apply_telemetry(tlm);
        self.per_report = None;

        match tlm.image {
            Some(ref frame) => {
                let result = frame
                    .to_cam_image()
                    .map_err(|e| e.to_string())
                    .and_then(|cam_image| {
                        per_mgr
                            .step(&cam_image.image, &mut self.rover, &mut self.world_map)
                            .map_err(|e| e.to_string())
                    });

                match result {
                    Ok(r) => {
                        trace!("Perception: {:?}", r);
                        self.per_report = Some(r);
                        self.num_consec_skipped_frames = 0;
                    }
                    Err(e) => {
                        self.num_consec_skipped_frames += 1;
                        warn!(
                            "Skipping perception on cycle {} ({} consecutive): {}",
                            self.num_cycles, self.num_consec_skipped_frames, e
                        );
                    }
                }
            }
            None => {
                trace!("No camera frame on cycle {}", self.num_cycles);
                self.num_frameless_cycles += 1;
            }
        }

        self.decision_report = Some(decision.step(&mut self.rover));

        self.num_cycles += 1;

        self.rover.actuation_dems()
    }

    /// Archive record for the cycle just run.
    pub fn tick_record(&self) -> TickRecord {
        let dems = self.rover.actuation_dems();

        TickRecord {
            cycle: self.num_cycles.saturating_sub(1),
            mode: self.rover.mode,
            vel: self.rover.vel,
            throttle: dems.throttle,
            brake: dems.brake,
            steer_deg: dems.steer_deg,
            send_pickup: dems.send_pickup,
            rocks_collected: self.rover.rocks_collected,
            nav_pixels: self.per_report.map(|r| r.nav_pixels),
            obstacle_pixels: self.per_report.map(|r| r.obstacle_pixels),
            rock_pixels: self.per_report.map(|r| r.rock_pixels),
            map_updated: self.per_report.map(|r| r.map_updated).unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
