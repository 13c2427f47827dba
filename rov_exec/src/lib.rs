//! # Rover library.
//!
//! This library allows other crates in the workspace to access items defined inside the rover 
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store - the state carried between cycles and the single cycle step
pub mod data_store;

/// Decision controller - the forward/stop/pickup state machine driving the actuators
pub mod decision;

/// World map - per-class evidence accumulated across the run
pub mod map;

/// Perception - camera frame to rover-centric and world-frame terrain information
pub mod per;

/// Rover state - the record shared by perception and decision each cycle
pub mod rover;

/// Simulation client - provides recorded telemetry from the simulator
pub mod sim_client;
