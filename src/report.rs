//! Name-keyed analysis report.
//!
//! Converts the id-keyed results of [`TopologyAnalysis`] into maps keyed by
//! bus and element names. All maps are ordered so the serialized report is
//! byte-identical across runs.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::analysis::{TierTotals, TopologyAnalysis};
use crate::error::Result;
use crate::network::{
    BusId, CurveSetting, DgRating, ElementId, ElementKind, ProtectionClass, SeriesKind, SystemInfo,
    VoltageTier,
};

/// Serializable view of a topology analysis.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopologyReport {
    pub circuit: Option<String>,
    pub source: Option<SourceReport>,
    pub counts: ElementCounts,
    pub feeder_length_km: f64,
    pub distances_km: BTreeMap<String, f64>,
    pub voltage_bases_kv: BTreeMap<String, f64>,
    pub bus_tiers: BTreeMap<String, VoltageTier>,
    pub line_tiers: BTreeMap<String, VoltageTier>,
    pub disabled_buses: Vec<String>,
    pub disabled_lines: Vec<String>,
    pub tier_totals: BTreeMap<String, TierTotals>,
    pub min_voltage_pu: BTreeMap<String, f64>,
    pub protection: BTreeMap<String, ProtectionReport>,
    /// Buses de-energized per protection device, in discovery order
    pub interruptions: BTreeMap<String, Vec<String>>,
    /// Buses per transformer secondary network, in discovery order
    pub secondary_networks: BTreeMap<String, Vec<String>>,
    pub generation: GenerationReport,
    pub rejected: Vec<String>,
    pub anomalies: Vec<String>,
}

/// The feeding source.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub element: String,
    pub bus: Option<String>,
    pub system: SystemInfo,
}

/// Element and bus counts.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub elements: usize,
    pub buses: usize,
    pub lines: usize,
    pub switches: usize,
    pub transformers: usize,
    pub other_series: usize,
    pub shunts: usize,
    pub protection_devices: usize,
    pub voltage_relays: usize,
    pub other: usize,
}

/// Settings of one protection device.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProtectionReport {
    pub class: ProtectionClass,
    pub monitored: Option<String>,
    pub switched: Option<String>,
    pub curves: Vec<CurveSetting>,
    pub reclose_intervals: Vec<f64>,
}

/// Distributed generation summary.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub total_kva: f64,
    pub total_kw: f64,
    pub units: BTreeMap<String, DgRating>,
}

impl TopologyReport {
    /// Build the report of an analysis.
    pub fn from_analysis(analysis: &TopologyAnalysis) -> Self {
        let snapshot = analysis.snapshot();
        let elements = &snapshot.elements;
        let adjacency = analysis.adjacency();
        let tiers = analysis.tiers();

        let bus = |id: BusId| adjacency.name(id).to_string();
        let element = |id: ElementId| elements.get(id).name.identifier();
        let by_bus = |map: &BTreeMap<BusId, f64>| -> BTreeMap<String, f64> {
            map.iter().map(|(&b, &v)| (bus(b), v)).collect()
        };
        let bus_lists = |map: &BTreeMap<ElementId, Vec<BusId>>| -> BTreeMap<String, Vec<String>> {
            map.iter()
                .map(|(&id, buses)| (element(id), buses.iter().map(|&b| bus(b)).collect()))
                .collect()
        };

        let source = elements.source.and_then(|id| match &elements.get(id).kind {
            ElementKind::Source(source) => Some(SourceReport {
                element: element(id),
                bus: source.bus().map(str::to_string),
                system: source.system,
            }),
            _ => None,
        });

        let protection = elements
            .protection_devices()
            .map(|(e, device)| {
                let report = ProtectionReport {
                    class: device.class,
                    monitored: device.monitored.clone(),
                    switched: device.switched.clone(),
                    curves: device.curves.clone(),
                    reclose_intervals: device.reclose_intervals.clone(),
                };
                (e.name.identifier(), report)
            })
            .collect();

        let mut generation = GenerationReport::default();
        for (e, rating) in elements.generators() {
            generation.total_kva += rating.kva;
            generation.total_kw += rating.kw;
            generation.units.insert(e.name.identifier(), *rating);
        }

        Self {
            circuit: snapshot.name.clone(),
            source,
            counts: count_elements(analysis),
            feeder_length_km: analysis.feeder_length_km(),
            distances_km: by_bus(analysis.distances()),
            voltage_bases_kv: by_bus(analysis.voltage_bases()),
            bus_tiers: tiers.buses.iter().map(|(&b, &t)| (bus(b), t)).collect(),
            line_tiers: tiers.lines.iter().map(|(&id, &t)| (element(id), t)).collect(),
            disabled_buses: tiers.disabled_buses.iter().map(|&b| bus(b)).collect(),
            disabled_lines: tiers.disabled_lines.iter().map(|&id| element(id)).collect(),
            tier_totals: tiers.totals.iter().map(|(t, totals)| (t.to_string(), *totals)).collect(),
            min_voltage_pu: by_bus(analysis.min_voltages_pu()),
            protection,
            interruptions: bus_lists(analysis.interruptions()),
            secondary_networks: bus_lists(analysis.secondary_networks()),
            generation,
            rejected: elements.rejected.iter().map(|e| e.to_string()).collect(),
            anomalies: analysis.anomalies().map(|e| e.to_string()).collect(),
        }
    }

    /// Keep only the interruption sets of the given devices.
    ///
    /// An empty list keeps everything.
    pub fn retain_devices(&mut self, devices: &[String]) {
        retain_named(&mut self.interruptions, devices);
    }

    /// Keep only the secondary networks of the given transformers.
    ///
    /// An empty list keeps everything.
    pub fn retain_transformers(&mut self, transformers: &[String]) {
        retain_named(&mut self.secondary_networks, transformers);
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text summary.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_summary(&mut out);
        out
    }

    fn write_summary(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Circuit: {}", self.circuit.as_deref().unwrap_or("(unnamed)"))?;
        match &self.source {
            Some(source) => writeln!(
                out,
                "Source: {} at bus {}",
                source.element,
                source.bus.as_deref().unwrap_or("none")
            )?,
            None => writeln!(out, "Source: none")?,
        }

        let c = &self.counts;
        writeln!(out)?;
        writeln!(out, "{:<22}{:>10}", "Elements", c.elements)?;
        writeln!(out, "{:<22}{:>10}", "Buses", c.buses)?;
        writeln!(out, "{:<22}{:>10}", "Lines", c.lines)?;
        writeln!(out, "{:<22}{:>10}", "Switches", c.switches)?;
        writeln!(out, "{:<22}{:>10}", "Transformers", c.transformers)?;
        writeln!(out, "{:<22}{:>10}", "Protection devices", c.protection_devices)?;
        writeln!(out, "{:<22}{:>10.3}", "Feeder length (km)", self.feeder_length_km)?;
        writeln!(out, "{:<22}{:>10}", "Reached from source", self.distances_km.len())?;
        writeln!(out, "{:<22}{:>10}", "Disabled buses", self.disabled_buses.len())?;
        writeln!(out, "{:<22}{:>10}", "Disabled lines", self.disabled_lines.len())?;

        if !self.tier_totals.is_empty() {
            writeln!(out)?;
            writeln!(out, "{:<6}{:>8}{:>8}{:>14}", "Tier", "Buses", "Lines", "Length (km)")?;
            for (tier, totals) in &self.tier_totals {
                writeln!(
                    out,
                    "{:<6}{:>8}{:>8}{:>14.3}",
                    tier, totals.buses, totals.lines, totals.length_km
                )?;
            }
        }

        if !self.generation.units.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "Distributed generation: {} units, {:.1} kVA, {:.1} kW",
                self.generation.units.len(),
                self.generation.total_kva,
                self.generation.total_kw
            )?;
        }

        write_bus_lists(out, "Interruptions", &self.interruptions)?;
        write_bus_lists(out, "Secondary networks", &self.secondary_networks)?;

        if !self.rejected.is_empty() || !self.anomalies.is_empty() {
            writeln!(out)?;
            writeln!(out, "Warnings:")?;
            for line in self.rejected.iter().chain(&self.anomalies) {
                writeln!(out, "  {}", line)?;
            }
        }

        Ok(())
    }
}

fn retain_named(map: &mut BTreeMap<String, Vec<String>>, names: &[String]) {
    if names.is_empty() {
        return;
    }
    let wanted: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
    map.retain(|name, _| wanted.contains(name));
}

fn write_bus_lists(
    out: &mut String,
    title: &str,
    lists: &BTreeMap<String, Vec<String>>,
) -> std::fmt::Result {
    if lists.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}:", title)?;
    for (name, buses) in lists {
        writeln!(out, "  {} ({}): {}", name, buses.len(), buses.join(", "))?;
    }
    Ok(())
}

fn count_elements(analysis: &TopologyAnalysis) -> ElementCounts {
    let mut counts = ElementCounts {
        elements: analysis.snapshot().elements.len(),
        buses: analysis.adjacency().len(),
        ..ElementCounts::default()
    };

    for element in analysis.snapshot().elements.iter() {
        match &element.kind {
            ElementKind::Series(series) => match &series.kind {
                SeriesKind::Line(line) if line.switch => counts.switches += 1,
                SeriesKind::Line(_) => counts.lines += 1,
                SeriesKind::Transformer(_) => counts.transformers += 1,
                SeriesKind::Capacitor | SeriesKind::Reactor => counts.other_series += 1,
            },
            ElementKind::Shunt(_) => counts.shunts += 1,
            ElementKind::Protection(_) => counts.protection_devices += 1,
            ElementKind::VoltageProtection(_) => counts.voltage_relays += 1,
            ElementKind::Source(_) | ElementKind::Other => counts.other += 1,
        }
    }

    counts
}
