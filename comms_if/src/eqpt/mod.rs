//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the simulator and actuators.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod rover;
