//! Voltage-base propagation and voltage tiers.
//!
//! Seeding happens at the source bus first, then at every transformer
//! terminal still unassigned. From each seed the value floods outward
//! through non-transformer series elements without overwriting any bus.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{depth_first, AnalysisConfig, VoltageBaseMap};
use crate::network::{Adjacency, BusId, ClassifiedElements, ElementId, VoltageTier};
use crate::oracle::{round_to, BusVoltages};

/// Tolerances used to pick a bus voltage base from its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageRule {
    /// Relative tolerance between observed value and nameplate
    pub nameplate_tolerance: f64,
    /// Accept the nameplate when the bus observes 0 V
    pub accept_dead_bus: bool,
    /// Relative tolerance for the reference value and declared options
    pub option_tolerance: f64,
}

impl VoltageRule {
    /// Rule for the source bus.
    pub fn source(config: &AnalysisConfig) -> Self {
        Self {
            nameplate_tolerance: config.source_tolerance,
            accept_dead_bus: false,
            option_tolerance: config.option_tolerance,
        }
    }

    /// Rule for transformer terminals.
    pub fn transformer(config: &AnalysisConfig) -> Self {
        Self {
            nameplate_tolerance: config.transformer_tolerance,
            accept_dead_bus: true,
            option_tolerance: config.option_tolerance,
        }
    }
}

/// Pick the voltage base (kV) of a seed bus.
///
/// In order of priority:
/// 1. the nameplate base, if the observed value is within tolerance of it
/// 2. `reference` (source or winding kV), if closer to the observed value
///    than the nameplate and within tolerance of itself
/// 3. the closest declared option within tolerance, first declared on ties
/// 4. the average phase magnitude, then `reference`, then the nameplate
///
/// Returns `None` when nothing positive is left to use.
pub fn estimate_voltage_base(
    sample: &BusVoltages,
    reference: Option<f64>,
    options: &[f64],
    rule: &VoltageRule,
) -> Option<f64> {
    let nameplate = sample.nameplate_kv();
    let observed = sample.observed_kv();
    let reference = reference.filter(|r| *r > 0.0);

    if nameplate > 0.0
        && ((nameplate - observed).abs() < rule.nameplate_tolerance * nameplate
            || (rule.accept_dead_bus && observed == 0.0))
    {
        return Some(nameplate);
    }

    if let Some(r) = reference {
        let gap = (r - observed).abs();
        if gap < (nameplate - observed).abs() && gap < rule.option_tolerance * r {
            return Some(r);
        }
    }

    if options
        .iter()
        .any(|v| (observed - v).abs() < rule.option_tolerance * observed)
    {
        let mut best = 0.0_f64;
        for &v in options {
            let gap = (v - observed).abs();
            if gap < rule.option_tolerance * v && gap < (observed - best).abs() {
                best = v;
            }
        }
        if best > 0.0 {
            return Some(best);
        }
    }

    sample
        .phase_average_kv()
        .filter(|avg| *avg > 0.0)
        .or(reference)
        .or(Some(nameplate).filter(|np| *np > 0.0))
}

/// Voltage base of every bus reachable from a seed without crossing a
/// transformer. Unreached buses are absent.
pub fn compute_voltage_bases(
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
    observations: &HashMap<String, BusVoltages>,
    voltage_options: &[f64],
    config: &AnalysisConfig,
) -> VoltageBaseMap {
    let mut bases = BTreeMap::new();
    let sample = |bus: BusId| observations.get(adjacency.name(bus)).cloned().unwrap_or_default();

    let source = elements
        .source_element()
        .and_then(|s| Some((adjacency.id(s.bus()?)?, s.system.base_kv)));
    if let Some((bus, reference)) = source {
        let rule = VoltageRule::source(config);
        match estimate_voltage_base(&sample(bus), reference, voltage_options, &rule) {
            Some(kv) => flood(adjacency, elements, bus, kv, &mut bases),
            None => log::warn!("No voltage base found for source bus '{}'", adjacency.name(bus)),
        }
    }

    let rule = VoltageRule::transformer(config);
    for (id, _, data) in elements.transformers() {
        for (i, terminal) in adjacency.terminals(id).iter().enumerate() {
            let Some(bus) = *terminal else { continue };
            if bases.contains_key(&bus) {
                continue;
            }
            let reference = data.kvs.get(i).copied();
            match estimate_voltage_base(&sample(bus), reference, voltage_options, &rule) {
                Some(kv) => flood(adjacency, elements, bus, kv, &mut bases),
                None => log::warn!(
                    "No voltage base found for bus '{}' of {}",
                    adjacency.name(bus),
                    elements.get(id).name
                ),
            }
        }
    }

    bases
}

/// Assign `kv` to `start` and everything reachable without a transformer.
fn flood(
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
    start: BusId,
    kv: f64,
    bases: &mut VoltageBaseMap,
) {
    bases.insert(start, kv);
    depth_first(
        start,
        |bus| flood_steps(adjacency, elements, bus),
        |_, to, ()| {
            if bases.contains_key(&to) {
                return false;
            }
            bases.insert(to, kv);
            true
        },
    );
}

fn flood_steps(adjacency: &Adjacency, elements: &ClassifiedElements, bus: BusId) -> Vec<(BusId, ())> {
    let crossable = |id: &&ElementId| {
        elements
            .series(**id)
            .map_or(false, |series| !series.is_transformer())
    };

    let forward = adjacency
        .downstream(bus)
        .iter()
        .filter(crossable)
        .filter_map(|&id| adjacency.terminal(id, 1));
    let backward = adjacency
        .upstream(bus)
        .iter()
        .filter(crossable)
        .filter_map(|&id| adjacency.terminal(id, 0));

    forward.chain(backward).map(|b| (b, ())).collect()
}

/// Line count, bus count and line length of one voltage tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierTotals {
    pub buses: usize,
    pub lines: usize,
    pub length_km: f64,
}

/// Tier classification of buses and real lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoltageTiers {
    pub buses: BTreeMap<BusId, VoltageTier>,
    pub lines: BTreeMap<ElementId, VoltageTier>,
    /// Buses with no voltage base
    pub disabled_buses: Vec<BusId>,
    /// Lines with neither endpoint in the voltage map
    pub disabled_lines: Vec<ElementId>,
    pub totals: BTreeMap<VoltageTier, TierTotals>,
}

/// Classify buses by their voltage base and lines by their endpoints.
///
/// A line takes the tier of its origin, or of its destination when the
/// origin has no voltage base.
pub fn classify_tiers(
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
    bases: &VoltageBaseMap,
) -> VoltageTiers {
    let mut tiers = VoltageTiers::default();

    for bus in adjacency.buses() {
        match bases.get(&bus) {
            Some(&kv) => {
                let tier = VoltageTier::from_kv(kv);
                tiers.buses.insert(bus, tier);
                tiers.totals.entry(tier).or_default().buses += 1;
            }
            None => tiers.disabled_buses.push(bus),
        }
    }

    for (id, _, line) in elements.real_lines() {
        let kv = [0, 1]
            .iter()
            .filter_map(|&i| adjacency.terminal(id, i))
            .find_map(|bus| bases.get(&bus));
        match kv {
            Some(&kv) => {
                let tier = VoltageTier::from_kv(kv);
                tiers.lines.insert(id, tier);
                let totals = tiers.totals.entry(tier).or_default();
                totals.lines += 1;
                totals.length_km += line.length_km;
            }
            None => tiers.disabled_lines.push(id),
        }
    }

    tiers
}

/// Lowest phase voltage of each bus in per unit of its voltage base.
///
/// Buses without a positive phase sample report 1.0 pu.
pub fn min_per_unit_voltages(
    adjacency: &Adjacency,
    observations: &HashMap<String, BusVoltages>,
    bases: &VoltageBaseMap,
) -> BTreeMap<BusId, f64> {
    bases
        .iter()
        .map(|(&bus, &kv)| {
            let lowest = observations
                .get(adjacency.name(bus))
                .and_then(BusVoltages::min_phase_magnitude);
            let pu = match lowest {
                Some(v) => round_to(v / (kv * 1000.0), 9),
                None => {
                    log::warn!("Bus '{}' has no phase voltage sample, assuming 1 pu", adjacency.name(bus));
                    1.0
                }
            };
            (bus, pu)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::CaseFile;
    use crate::network::{build_adjacency, CircuitSnapshot, LengthUnit};
    use approx::assert_relative_eq;

    fn sample(kv_base: f64, volts: &[f64]) -> BusVoltages {
        BusVoltages {
            kv_base,
            nodes: (1..=volts.len() as u32).collect(),
            magnitudes: volts.to_vec(),
        }
    }

    fn run(text: &str) -> (CircuitSnapshot, Adjacency, VoltageBaseMap) {
        let case = CaseFile::parse_str(text).unwrap();
        let snapshot = CircuitSnapshot::extract(&case, LengthUnit::Kilometer).unwrap();
        let adjacency = build_adjacency(&snapshot.elements, &snapshot.bus_names);
        let bases = compute_voltage_bases(
            &adjacency,
            &snapshot.elements,
            &snapshot.observations,
            &snapshot.voltage_bases,
            &AnalysisConfig::default(),
        );
        (snapshot, adjacency, bases)
    }

    fn base(adjacency: &Adjacency, bases: &VoltageBaseMap, bus: &str) -> Option<f64> {
        bases.get(&adjacency.id(bus)?).copied()
    }

    #[test]
    fn test_estimate_prefers_nameplate() {
        let rule = VoltageRule::source(&AnalysisConfig::default());
        let kv = estimate_voltage_base(&sample(7.62, &[7500.0]), Some(13.2), &[7.2], &rule);
        assert_eq!(kv, Some(7.62));
    }

    #[test]
    fn test_estimate_reference_then_options() {
        let rule = VoltageRule::source(&AnalysisConfig::default());

        // Nameplate far off, reference close
        let kv = estimate_voltage_base(&sample(2.4, &[13100.0]), Some(13.2), &[], &rule);
        assert_eq!(kv, Some(13.2));

        // Reference far off too, closest option wins
        let kv = estimate_voltage_base(&sample(2.4, &[12400.0]), Some(4.16), &[13.2, 12.47, 0.48], &rule);
        assert_eq!(kv, Some(12.47));
    }

    #[test]
    fn test_estimate_option_tie_keeps_first_declared() {
        let rule = VoltageRule::source(&AnalysisConfig::default());
        let kv = estimate_voltage_base(&sample(0.0, &[10000.0]), None, &[10.5, 9.5], &rule);
        assert_eq!(kv, Some(10.5));
    }

    #[test]
    fn test_estimate_phase_average_fallback() {
        let rule = VoltageRule::source(&AnalysisConfig::default());
        let kv = estimate_voltage_base(&sample(0.0, &[3000.0, 3100.0, 3200.0]), None, &[13.2], &rule);
        assert_eq!(kv, Some(3.1));

        assert_eq!(estimate_voltage_base(&BusVoltages::default(), None, &[], &rule), None);
        assert_eq!(
            estimate_voltage_base(&BusVoltages::default(), Some(0.48), &[], &rule),
            Some(0.48)
        );
    }

    #[test]
    fn test_estimate_transformer_rule() {
        let config = AnalysisConfig::default();
        // 15% off the nameplate: too far for the source, fine for a transformer
        let s = sample(0.48, &[408.0]);
        assert_eq!(
            estimate_voltage_base(&s, None, &[], &VoltageRule::transformer(&config)),
            Some(0.48)
        );
        assert_eq!(
            estimate_voltage_base(&s, None, &[], &VoltageRule::source(&config)),
            Some(0.408)
        );

        // De-energized terminal keeps its nameplate
        let dead = sample(0.48, &[0.0]);
        assert_eq!(
            estimate_voltage_base(&dead, Some(13.2), &[], &VoltageRule::transformer(&config)),
            Some(0.48)
        );
    }

    const STEP_DOWN: &str = "\
.set voltagebases=[13.2, 0.48]
.bus a kvbase=13.2 vmag=[13200, 13200, 13200]
.bus b kvbase=13.2 vmag=[13150, 13150, 13150]
.bus c kvbase=13.2 vmag=[13100, 13100, 13100]
.bus d kvbase=0.48 vmag=[470, 470, 470]
.bus e kvbase=0.48 vmag=[465, 465, 465]
.bus x kvbase=4.16
vsource.source bus1=a basekv=13.2
line.l1 bus1=a bus2=b length=1
line.l2 bus1=b bus2=c length=1
transformer.t1 buses=[c, d] kvs=[13.2, 0.48] kvas=[75, 75]
line.l3 bus1=d bus2=e length=0.05
";

    #[test]
    fn test_voltage_bases_step_down() {
        let (_, adj, bases) = run(STEP_DOWN);
        for bus in ["a", "b", "c"] {
            assert_eq!(base(&adj, &bases, bus), Some(13.2), "bus {bus}");
        }
        assert_eq!(base(&adj, &bases, "d"), Some(0.48));
        assert_eq!(base(&adj, &bases, "e"), Some(0.48));
        // Declared but connected to nothing
        assert_eq!(base(&adj, &bases, "x"), None);
    }

    #[test]
    fn test_transformer_keeps_base_assigned_by_source() {
        // The primary terminal reads as 4.16 kV on its own, but the source
        // flood reached it first
        let (_, adj, bases) = run(
            "\
.bus a kvbase=13.2 vmag=[13200]
.bus c kvbase=4.16 vmag=[4160]
.bus d kvbase=0.48 vmag=[480]
vsource.source bus1=a basekv=13.2
line.l1 bus1=a bus2=c length=1
transformer.t1 buses=[c, d] kvs=[4.16, 0.48]
",
        );
        assert_eq!(base(&adj, &bases, "c"), Some(13.2));
        assert_eq!(base(&adj, &bases, "d"), Some(0.48));
    }

    #[test]
    fn test_parallel_transformer_keeps_earlier_assignment() {
        // No sample on the shared secondary: each winding would seed its own kV
        let (_, adj, bases) = run(
            "\
.bus a kvbase=13.2 vmag=[13200]
vsource.source bus1=a basekv=13.2
line.l1 bus1=a bus2=b length=1
transformer.t1 buses=[b, c] kvs=[13.2, 0.48]
transformer.t2 buses=[b, c] kvs=[13.2, 0.24]
line.l2 bus1=c bus2=e length=0.1
",
        );
        assert_eq!(base(&adj, &bases, "b"), Some(13.2));
        assert_eq!(base(&adj, &bases, "c"), Some(0.48));
        assert_eq!(base(&adj, &bases, "e"), Some(0.48));
    }

    #[test]
    fn test_voltage_flood_stops_at_transformer() {
        // Without the transformer seed phase the LV side stays empty
        let (snapshot, adj, _) = run(STEP_DOWN);
        let mut bases = BTreeMap::new();
        flood(&adj, &snapshot.elements, adj.id("a").unwrap(), 13.2, &mut bases);
        assert_eq!(bases.len(), 3);
        assert!(!bases.contains_key(&adj.id("d").unwrap()));
    }

    #[test]
    fn test_voltage_tiers() {
        let (snapshot, adj, bases) = run(STEP_DOWN);
        let tiers = classify_tiers(&adj, &snapshot.elements, &bases);

        assert_eq!(tiers.buses[&adj.id("a").unwrap()], VoltageTier::Mv);
        assert_eq!(tiers.buses[&adj.id("e").unwrap()], VoltageTier::Lv);
        assert_eq!(tiers.disabled_buses, vec![adj.id("x").unwrap()]);
        assert!(tiers.disabled_lines.is_empty());

        let mv = tiers.totals[&VoltageTier::Mv];
        assert_eq!(mv.lines, 2);
        assert_eq!(mv.buses, 3);
        assert_relative_eq!(mv.length_km, 2.0);
        let lv = tiers.totals[&VoltageTier::Lv];
        assert_eq!(lv.lines, 1);
        assert_relative_eq!(lv.length_km, 0.05);
    }

    #[test]
    fn test_min_per_unit_voltages() {
        let (snapshot, adj, bases) = run(STEP_DOWN);
        let pu = min_per_unit_voltages(&adj, &snapshot.observations, &bases);
        assert_relative_eq!(pu[&adj.id("b").unwrap()], 13150.0 / 13200.0, epsilon = 1e-9);
        assert_relative_eq!(pu[&adj.id("e").unwrap()], 465.0 / 480.0, epsilon = 1e-9);
    }
}
