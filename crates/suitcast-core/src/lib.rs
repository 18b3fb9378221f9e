#![deny(warnings)]
pub mod engine;
pub mod extract;
pub mod history;
pub mod model;
pub mod policy;
pub mod rules;
pub mod snapshot;

pub use engine::{Action, Engine, EngineConfig};
pub use snapshot::{EngineSnapshot, RestoreReport, SnapshotError};
