//! # Map
//!
//! This module implements the [`WorldMap`], the persistent grid of classified terrain evidence
//! accumulated over the run.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

/// Implements the [`WorldMap`] type
mod world_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use world_map::{WorldMap, WorldMapLayer, WorldMapSummary};
