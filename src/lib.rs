//! # Feeder Topology
//!
//! Topology analysis for radial electrical distribution feeders.
//!
//! Given the elements of a solved circuit (lines, switches, transformers,
//! protection devices, sources, loads, generators) and their bus terminals,
//! this library derives:
//! - a bidirectional bus adjacency
//! - the trunk distance of every bus to the source
//! - the voltage base and voltage tier of every bus and line
//! - the buses de-energized when a protection device opens
//! - the buses of each transformer's secondary network
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`oracle`] - Read-only access to the solved circuit ([`PropertyOracle`])
//! - [`casefile`] - Text case-file adapter implementing the oracle
//! - [`network`] - Element classification and bus adjacency
//! - [`analysis`] - Distance, voltage-base, interruption and secondary-network stages
//! - [`report`] - Name-keyed, serializable results
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! feeder-topo feeder.case --json > report.json
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use feeder_topology::{AnalysisConfig, CaseFile, TopologyAnalysis};
//!
//! let case = CaseFile::from_path("feeder.case".as_ref())?;
//! let analysis = TopologyAnalysis::run(&case, AnalysisConfig::default())?;
//! println!("{:?}", analysis.interrupted_by("recloser.r1"));
//! # Ok::<(), feeder_topology::TopologyError>(())
//! ```
//!
//! ## Propagation Rules
//!
//! All traversals are depth first from their seed, visit downstream elements
//! before upstream ones in element registration order, and never reassign a
//! bus once reached:
//!
//! 1. Distances start at 0 on the source bus; real lines add their length,
//!    every other series element adds a nominal 1 m.
//! 2. Voltage bases are seeded at the source bus, then at each unassigned
//!    transformer terminal, and never cross a transformer.
//! 3. Interruption sets start past the device's switched element and never
//!    walk back through the element just crossed.
//! 4. Secondary networks start at a transformer's secondary terminals and stop
//!    at any other transformer.

pub mod analysis;
pub mod casefile;
pub mod error;
pub mod network;
pub mod oracle;
pub mod report;

// Re-export main types for convenience
pub use analysis::{AnalysisConfig, TopologyAnalysis};
pub use casefile::CaseFile;
pub use error::{Result, TopologyError};
pub use network::{CircuitSnapshot, LengthUnit, VoltageTier};
pub use oracle::{BusVoltages, PropertyOracle};
pub use report::TopologyReport;

/// Distance added across non-line series elements, in km (1 m).
pub const DEFAULT_NOMINAL_INCREMENT_KM: f64 = analysis::DEFAULT_NOMINAL_INCREMENT_KM;
