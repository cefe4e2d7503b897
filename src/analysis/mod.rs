//! Topology analysis pipeline.
//!
//! Each stage is a pure function over an immutable snapshot:
//!
//! ```text
//! oracle ─► CircuitSnapshot ─► Adjacency ─┬─► distances
//!                                         ├─► voltage bases ─► tiers, min pu
//!                                         ├─► secondary networks
//!                                         └─► interruption sets
//! ```
//!
//! [`TopologyAnalysis`] runs all of them and keeps the results. Traversals
//! use an explicit stack, so feeder depth is bounded by memory rather than
//! by the call stack.

mod distance;
mod interruption;
mod secondary;
mod voltage;

pub use distance::compute_distances;
pub use interruption::find_interrupted_buses;
pub use secondary::collect_secondary_network;
pub use voltage::{
    classify_tiers, compute_voltage_bases, estimate_voltage_base, min_per_unit_voltages,
    TierTotals, VoltageRule, VoltageTiers,
};

use std::collections::BTreeMap;

use crate::error::{Result, TopologyError};
use crate::network::{build_adjacency, Adjacency, BusId, CircuitSnapshot, ElementId, LengthUnit};
use crate::oracle::PropertyOracle;

/// Distance of a bus to the source, 1 m expressed in km.
pub const DEFAULT_NOMINAL_INCREMENT_KM: f64 = 0.001;

/// Relative tolerance for nameplate checks at the source bus.
pub const DEFAULT_SOURCE_TOLERANCE: f64 = 0.1;

/// Relative tolerance for nameplate checks at transformer terminals.
pub const DEFAULT_TRANSFORMER_TOLERANCE: f64 = 0.2;

/// Relative tolerance for reference values and declared voltage bases.
pub const DEFAULT_OPTION_TOLERANCE: f64 = 0.1;

/// Trunk distance (km) per bus.
pub type DistanceMap = BTreeMap<BusId, f64>;

/// Voltage base (kV) per bus.
pub type VoltageBaseMap = BTreeMap<BusId, f64>;

/// De-energized buses per protection device.
pub type InterruptionMap = BTreeMap<ElementId, Vec<BusId>>;

/// Secondary-network buses per transformer.
pub type SecondaryNetworkMap = BTreeMap<ElementId, Vec<BusId>>;

/// Configuration for the analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Unit assumed for lines declared without one.
    pub default_length_unit: LengthUnit,
    /// Distance added across switches, transformers and other non-line elements (km).
    pub nominal_increment_km: f64,
    /// Nameplate tolerance at the source bus.
    pub source_tolerance: f64,
    /// Nameplate tolerance at transformer terminals.
    pub transformer_tolerance: f64,
    /// Tolerance for reference values and declared voltage bases.
    pub option_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_length_unit: LengthUnit::Kilometer,
            nominal_increment_km: DEFAULT_NOMINAL_INCREMENT_KM,
            source_tolerance: DEFAULT_SOURCE_TOLERANCE,
            transformer_tolerance: DEFAULT_TRANSFORMER_TOLERANCE,
            option_tolerance: DEFAULT_OPTION_TOLERANCE,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unit used for lines without one.
    pub fn with_default_length_unit(mut self, unit: LengthUnit) -> Self {
        self.default_length_unit = unit;
        self
    }

    /// Set the distance increment of non-line elements (km).
    ///
    /// Must stay positive so distances are strictly ordered along a path; a
    /// zero, negative or non-finite value is ignored with a warning.
    pub fn with_nominal_increment(mut self, km: f64) -> Self {
        if km.is_finite() && km > 0.0 {
            self.nominal_increment_km = km;
        } else {
            log::warn!(
                "Ignoring nominal increment {} km, keeping {} km",
                km,
                self.nominal_increment_km
            );
        }
        self
    }

    /// Set the nameplate tolerance at the source bus.
    pub fn with_source_tolerance(mut self, tolerance: f64) -> Self {
        self.source_tolerance = tolerance;
        self
    }

    /// Set the nameplate tolerance at transformer terminals.
    pub fn with_transformer_tolerance(mut self, tolerance: f64) -> Self {
        self.transformer_tolerance = tolerance;
        self
    }

    /// Set the tolerance for reference values and declared voltage bases.
    pub fn with_option_tolerance(mut self, tolerance: f64) -> Self {
        self.option_tolerance = tolerance;
        self
    }
}

/// Depth-first walk from `start` with an explicit stack.
///
/// `neighbours` lists the next buses of a bus, computed when the bus is
/// entered. `enter` is called for each of them in order, when it is reached,
/// and returns whether the walk continues into it.
pub(crate) fn depth_first<S, N, E>(start: BusId, mut neighbours: N, mut enter: E)
where
    N: FnMut(BusId) -> Vec<(BusId, S)>,
    E: FnMut(BusId, BusId, S) -> bool,
{
    let mut stack = vec![(start, neighbours(start).into_iter())];

    while let Some((from, steps)) = stack.last_mut() {
        match steps.next() {
            Some((to, step)) => {
                let from = *from;
                if enter(from, to, step) {
                    stack.push((to, neighbours(to).into_iter()));
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Results of a full topology analysis.
#[derive(Debug)]
pub struct TopologyAnalysis {
    snapshot: CircuitSnapshot,
    adjacency: Adjacency,
    config: AnalysisConfig,
    source_bus: Option<BusId>,
    distances: DistanceMap,
    voltage_bases: VoltageBaseMap,
    tiers: VoltageTiers,
    min_voltages_pu: BTreeMap<BusId, f64>,
    interruptions: InterruptionMap,
    secondary_networks: SecondaryNetworkMap,
    /// Topology anomalies found after classification
    anomalies: Vec<TopologyError>,
}

impl TopologyAnalysis {
    /// Read the circuit from `oracle` and analyze it.
    pub fn run(oracle: &dyn PropertyOracle, config: AnalysisConfig) -> Result<Self> {
        let snapshot = CircuitSnapshot::extract(oracle, config.default_length_unit)?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Analyze an already extracted snapshot.
    pub fn from_snapshot(snapshot: CircuitSnapshot, config: AnalysisConfig) -> Self {
        let elements = &snapshot.elements;
        let adjacency = build_adjacency(elements, &snapshot.bus_names);

        let mut anomalies: Vec<TopologyError> = adjacency
            .undeclared()
            .iter()
            .map(|&(bus, element)| TopologyError::InconsistentTopology {
                element: elements.get(element).name.identifier(),
                bus: adjacency.name(bus).to_string(),
            })
            .collect();
        if !anomalies.is_empty() {
            log::warn!("{} terminal buses were never declared; registered on demand", anomalies.len());
        }

        let source_bus = match (elements.source, elements.source_element()) {
            (Some(id), Some(source)) => {
                let bus = source.bus().and_then(|bus| adjacency.id(bus));
                if bus.is_none() {
                    log::warn!(
                        "Voltage source '{}' has no terminal bus; distances are not computed",
                        elements.get(id).name
                    );
                }
                bus
            }
            _ => {
                log::warn!("Circuit has no voltage source; distances are not computed");
                None
            }
        };

        let distances = match source_bus {
            Some(bus) => compute_distances(&adjacency, elements, bus, config.nominal_increment_km),
            None => DistanceMap::new(),
        };

        let voltage_bases = compute_voltage_bases(
            &adjacency,
            elements,
            &snapshot.observations,
            &snapshot.voltage_bases,
            &config,
        );
        let tiers = classify_tiers(&adjacency, elements, &voltage_bases);
        if !tiers.disabled_buses.is_empty() {
            log::warn!(
                "{} buses have no voltage base and are treated as disconnected",
                tiers.disabled_buses.len()
            );
        }
        let min_voltages_pu = min_per_unit_voltages(&adjacency, &snapshot.observations, &voltage_bases);

        let secondary_networks: SecondaryNetworkMap = elements
            .transformers()
            .map(|(id, _, _)| (id, collect_secondary_network(id, &adjacency, elements)))
            .collect();

        let mut interruptions = InterruptionMap::new();
        for (device, protection) in elements.protection_devices() {
            let switched = protection
                .switched
                .as_deref()
                .and_then(|object| elements.lookup(object))
                .filter(|&id| elements.series(id).is_some());

            let buses = match switched {
                Some(id) => find_interrupted_buses(id, &adjacency, elements),
                None => {
                    let err = TopologyError::UnresolvedDevice {
                        device: device.name.identifier(),
                        object: protection.switched.clone().unwrap_or_else(|| "none".to_string()),
                    };
                    log::warn!("{}", err);
                    anomalies.push(err);
                    Vec::new()
                }
            };
            interruptions.insert(device.id, buses);
        }

        log::info!(
            "Analyzed {} buses: {} reached from source, {} with voltage base, {} transformers, {} protection devices",
            adjacency.len(),
            distances.len(),
            voltage_bases.len(),
            secondary_networks.len(),
            interruptions.len()
        );

        Self {
            snapshot,
            adjacency,
            config,
            source_bus,
            distances,
            voltage_bases,
            tiers,
            min_voltages_pu,
            interruptions,
            secondary_networks,
            anomalies,
        }
    }

    pub fn snapshot(&self) -> &CircuitSnapshot {
        &self.snapshot
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn source_bus(&self) -> Option<BusId> {
        self.source_bus
    }

    pub fn distances(&self) -> &DistanceMap {
        &self.distances
    }

    pub fn voltage_bases(&self) -> &VoltageBaseMap {
        &self.voltage_bases
    }

    pub fn tiers(&self) -> &VoltageTiers {
        &self.tiers
    }

    pub fn min_voltages_pu(&self) -> &BTreeMap<BusId, f64> {
        &self.min_voltages_pu
    }

    pub fn interruptions(&self) -> &InterruptionMap {
        &self.interruptions
    }

    pub fn secondary_networks(&self) -> &SecondaryNetworkMap {
        &self.secondary_networks
    }

    /// Anomalies from classification and from the topology stages.
    pub fn anomalies(&self) -> impl Iterator<Item = &TopologyError> {
        self.snapshot.elements.anomalies.iter().chain(&self.anomalies)
    }

    /// Total length of real lines (km).
    pub fn feeder_length_km(&self) -> f64 {
        self.snapshot
            .elements
            .real_lines()
            .map(|(_, _, line)| line.length_km)
            .sum()
    }

    /// Distance of a bus by name.
    pub fn distance_of(&self, bus: &str) -> Option<f64> {
        self.distances.get(&self.adjacency.id(bus)?).copied()
    }

    /// Voltage base of a bus by name.
    pub fn voltage_base_of(&self, bus: &str) -> Option<f64> {
        self.voltage_bases.get(&self.adjacency.id(bus)?).copied()
    }

    /// Buses interrupted by a protection device, by identifier.
    pub fn interrupted_by(&self, device: &str) -> Option<Vec<&str>> {
        let id = self.snapshot.elements.lookup(device)?;
        self.interruptions.get(&id).map(|buses| self.bus_names(buses))
    }

    /// Secondary network of a transformer, by identifier.
    pub fn secondary_network_of(&self, transformer: &str) -> Option<Vec<&str>> {
        let id = self.snapshot.elements.lookup(transformer)?;
        self.secondary_networks.get(&id).map(|buses| self.bus_names(buses))
    }

    pub fn bus_names(&self, buses: &[BusId]) -> Vec<&str> {
        buses.iter().map(|&bus| self.adjacency.name(bus)).collect()
    }
}
