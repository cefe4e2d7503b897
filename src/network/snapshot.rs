//! Immutable circuit snapshot.
//!
//! Everything the analysis stages need is pulled from the oracle here, in
//! one pass, before any traversal starts.

use std::collections::HashMap;

use super::classify::{classify, ClassifiedElements};
use super::elements::ElementKind;
use super::units::LengthUnit;
use crate::error::Result;
use crate::oracle::{is_undefined, numeric_values, BusVoltages, PropertyOracle};

/// Classified elements plus the bus-level data of a solved circuit.
#[derive(Debug)]
pub struct CircuitSnapshot {
    /// Circuit name, if the oracle reports one
    pub name: Option<String>,
    pub elements: ClassifiedElements,
    /// Declared bus names, lowercased, in oracle order
    pub bus_names: Vec<String>,
    /// Observed samples keyed by bus name
    pub observations: HashMap<String, BusVoltages>,
    /// Declared voltage-base options (kV) in declaration order
    pub voltage_bases: Vec<f64>,
}

impl CircuitSnapshot {
    /// Read a full snapshot from the oracle.
    pub fn extract(oracle: &dyn PropertyOracle, default_unit: LengthUnit) -> Result<Self> {
        let bus_names: Vec<String> = oracle
            .all_buses()?
            .iter()
            .map(|bus| bus.trim().to_lowercase())
            .collect();
        let elements = classify(oracle, default_unit)?;

        let voltage_bases = match oracle.option("voltagebases") {
            Some(raw) => numeric_values(&raw).unwrap_or_else(|| {
                log::warn!("Cannot parse voltage bases {:?}, ignoring them", raw);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let name = oracle
            .option("name")
            .filter(|name| !is_undefined(name))
            .map(|name| name.trim().to_string());

        // Terminal buses may be missing from the declared list
        let mut observations = HashMap::new();
        for bus in bus_names.iter().map(String::as_str).chain(terminal_buses(&elements)) {
            if !observations.contains_key(bus) {
                if let Some(sample) = oracle.bus_voltages(bus) {
                    observations.insert(bus.to_string(), sample);
                }
            }
        }

        log::debug!(
            "Snapshot: {} buses, {} observed, {} voltage bases",
            bus_names.len(),
            observations.len(),
            voltage_bases.len()
        );

        Ok(Self {
            name,
            elements,
            bus_names,
            observations,
            voltage_bases,
        })
    }

    /// Observed sample at `bus`, `None` when the oracle had none.
    pub fn observation(&self, bus: &str) -> Option<&BusVoltages> {
        self.observations.get(bus)
    }
}

fn terminal_buses(elements: &ClassifiedElements) -> impl Iterator<Item = &str> {
    elements.iter().flat_map(|element| {
        let buses: Vec<&str> = match &element.kind {
            ElementKind::Series(series) => series.terminals.iter().flatten().map(String::as_str).collect(),
            ElementKind::Source(source) => source.terminals.iter().flatten().map(String::as_str).collect(),
            ElementKind::Shunt(shunt) => shunt.bus.as_deref().into_iter().collect(),
            _ => Vec::new(),
        };
        buses
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::CaseFile;

    #[test]
    fn test_snapshot_extract() {
        let case = CaseFile::parse_str(
            "\
.set name=Demo voltagebases=[115, 13.2, 0.48]
.bus a kvbase=13.2 vmag=[13200]
.bus c kvbase=0.277
line.l1 bus1=a bus2=b
load.ld bus1=c
",
        )
        .unwrap();
        let snapshot = CircuitSnapshot::extract(&case, LengthUnit::default()).unwrap();

        assert_eq!(snapshot.name.as_deref(), Some("Demo"));
        assert_eq!(snapshot.voltage_bases, vec![115.0, 13.2, 0.48]);
        assert_eq!(snapshot.bus_names, vec!["a", "c"]);
        assert_eq!(snapshot.elements.len(), 2);
        assert!(snapshot.observation("a").is_some());
        assert!(snapshot.observation("c").is_some());
        // Terminal without a declaration has no sample in the case file
        assert!(snapshot.observation("b").is_none());
    }

    #[test]
    fn test_snapshot_bad_voltage_bases() {
        let case = CaseFile::parse_str(".set voltagebases=[1.2.3]\n").unwrap();
        let snapshot = CircuitSnapshot::extract(&case, LengthUnit::default()).unwrap();
        assert!(snapshot.voltage_bases.is_empty());
        assert!(snapshot.name.is_none());
    }
}
