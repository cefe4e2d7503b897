//! Feeder representation.
//!
//! This module turns the flat element list of a solved circuit into typed
//! records and a bus adjacency:
//!
//! 1. [`CircuitSnapshot::extract`] reads everything from the oracle and
//!    classifies each element ([`classify`]).
//! 2. [`build_adjacency`] interns bus names and records, for every bus, the
//!    elements entering it (upstream) and leaving it (downstream).

mod adjacency;
mod classify;
mod elements;
mod snapshot;
mod types;
mod units;

pub use adjacency::{build_adjacency, Adjacency, BusLinks};
pub use classify::{classify, ClassifiedElements};
pub use elements::*;
pub use snapshot::CircuitSnapshot;
pub use types::*;
pub use units::LengthUnit;
