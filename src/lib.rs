//! Wildlands - tick-driven survival simulation on a chunk-streamed world

pub mod actions;
pub mod catalog;
pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod world;
