// src/simulation/mod.rs
//! Simulation system
//!
//! The [`Simulation`] trait is the seam between the app loop and whatever
//! drives the scene; [`EarthSystem`] is the Earth, Moon and Sun scene and
//! [`SimulationManager`] runs it.

pub mod earth_system;
pub mod manager;
pub mod orbits;
pub mod traits;

pub use earth_system::{EarthSystem, SatelliteStatus};
pub use manager::SimulationManager;
pub use orbits::{FixedTimestep, OrbitState};
pub use traits::Simulation;
