//! Local end-to-end simulation of fedround rounds: one coordinator service and a number of
//! participants that train a toy model, all within one process.

pub mod simulation;
pub mod trainer;

pub use self::simulation::Simulation;
