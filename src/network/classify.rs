//! Element classification.
//!
//! Reads every element from the oracle once, sorts it into a category by its
//! type tag and normalizes its terminal bus names. This is the only stage
//! that queries the oracle for element properties.

use std::collections::{HashMap, HashSet};

use super::elements::*;
use super::types::{ElementId, ElementName};
use super::units::LengthUnit;
use crate::error::{Result, TopologyError};
use crate::oracle::{
    bus_list, flag_property, numeric_property, scalar_property, strip_nodes, text_property,
    PropertyOracle,
};

/// Two-terminal series device tags.
const SERIES_TAGS: &[&str] = &["line", "capacitor", "reactor"];

/// Classified elements, addressed by [`ElementId`].
#[derive(Debug, Default)]
pub struct ClassifiedElements {
    /// Element arena in oracle order
    pub elements: Vec<Element>,
    /// The voltage source feeding the circuit
    pub source: Option<ElementId>,
    /// Elements dropped during classification
    pub rejected: Vec<TopologyError>,
    /// Recovered anomalies (unsupported units, unparseable numbers)
    pub anomalies: Vec<TopologyError>,
    index: HashMap<String, ElementId>,
}

impl ClassifiedElements {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element by id.
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    /// Element id by `type.name` identifier (case-insensitive).
    pub fn lookup(&self, identifier: &str) -> Option<ElementId> {
        self.index.get(&identifier.trim().to_lowercase()).copied()
    }

    /// Series data of an element, `None` for other categories.
    pub fn series(&self, id: ElementId) -> Option<&SeriesElement> {
        match &self.elements.get(id.0)?.kind {
            ElementKind::Series(series) => Some(series),
            _ => None,
        }
    }

    pub fn source_element(&self) -> Option<&SourceElement> {
        match &self.get(self.source?).kind {
            ElementKind::Source(source) => Some(source),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// All series elements in registration order.
    pub fn series_elements(&self) -> impl Iterator<Item = (ElementId, &SeriesElement)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Series(series) => Some((e.id, series)),
            _ => None,
        })
    }

    /// Transformers with their winding data.
    pub fn transformers(
        &self,
    ) -> impl Iterator<Item = (ElementId, &SeriesElement, &TransformerData)> {
        self.series_elements().filter_map(|(id, series)| match &series.kind {
            SeriesKind::Transformer(data) => Some((id, series, data)),
            _ => None,
        })
    }

    /// Current-carrying lines (switches excluded).
    pub fn real_lines(&self) -> impl Iterator<Item = (ElementId, &SeriesElement, &LineData)> {
        self.series_elements().filter_map(|(id, series)| match &series.kind {
            SeriesKind::Line(line) if !line.switch => Some((id, series, line)),
            _ => None,
        })
    }

    /// Fuses, reclosers and current relays.
    pub fn protection_devices(&self) -> impl Iterator<Item = (&Element, &ProtectionDevice)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Protection(device) => Some((e, device)),
            _ => None,
        })
    }

    pub fn voltage_relays(&self) -> impl Iterator<Item = (&Element, &VoltageRelay)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::VoltageProtection(relay) => Some((e, relay)),
            _ => None,
        })
    }

    pub fn shunts(&self) -> impl Iterator<Item = (&Element, &ShuntElement)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Shunt(shunt) => Some((e, shunt)),
            _ => None,
        })
    }

    /// Distributed generators with their ratings.
    pub fn generators(&self) -> impl Iterator<Item = (&Element, &DgRating)> {
        self.shunts()
            .filter_map(|(e, shunt)| shunt.rating.as_ref().map(|rating| (e, rating)))
    }

    fn push(&mut self, name: ElementName, kind: ElementKind) -> ElementId {
        let id = ElementId(self.elements.len());
        self.index.insert(name.identifier(), id);
        self.elements.push(Element { id, name, kind });
        id
    }
}

/// Classify every element the oracle knows about.
///
/// Only a failure to enumerate elements is fatal. Elements with a malformed
/// identifier are logged and collected in [`ClassifiedElements::rejected`].
/// An unparseable numeric property keeps its element: the property falls back
/// to its default and the error lands in [`ClassifiedElements::anomalies`].
pub fn classify(oracle: &dyn PropertyOracle, default_unit: LengthUnit) -> Result<ClassifiedElements> {
    let identifiers: Vec<String> = oracle
        .all_elements()?
        .iter()
        .map(|id| id.trim().to_lowercase())
        .collect();
    let known: HashSet<&str> = identifiers.iter().map(String::as_str).collect();

    let mut classifier = Classifier {
        oracle,
        default_unit,
        known: &known,
        missing_unit_warned: false,
        anomalies: Vec::new(),
    };
    let mut classified = ClassifiedElements::default();

    for identifier in &identifiers {
        let outcome = ElementName::parse(identifier).map(|name| {
            let kind = classifier.classify_one(identifier, &name);
            (name, kind)
        });

        match outcome {
            Ok((name, kind)) => {
                let is_source = matches!(kind, ElementKind::Source(_));
                let id = classified.push(name, kind);
                if is_source {
                    match classified.source {
                        None => classified.source = Some(id),
                        Some(first) => log::warn!(
                            "Ignoring additional voltage source '{}', feeding from '{}'",
                            identifier,
                            classified.get(first).name
                        ),
                    }
                }
            }
            Err(err) => {
                log::warn!("Rejected element: {}", err);
                classified.rejected.push(err);
            }
        }
    }

    classified.anomalies = classifier.anomalies;
    log::debug!(
        "Classified {} elements ({} rejected)",
        classified.len(),
        classified.rejected.len()
    );

    Ok(classified)
}

struct Classifier<'a> {
    oracle: &'a dyn PropertyOracle,
    default_unit: LengthUnit,
    known: &'a HashSet<&'a str>,
    /// The missing-unit fallback is reported once per run
    missing_unit_warned: bool,
    anomalies: Vec<TopologyError>,
}

impl Classifier<'_> {
    fn classify_one(&mut self, id: &str, name: &ElementName) -> ElementKind {
        let class = name.class.as_str();

        if SERIES_TAGS.contains(&class) {
            let terminals = vec![self.terminal(id, "bus1"), self.terminal(id, "bus2")];
            let kind = match class {
                "line" => SeriesKind::Line(self.line_data(id)),
                "capacitor" => SeriesKind::Capacitor,
                _ => SeriesKind::Reactor,
            };
            return ElementKind::Series(SeriesElement { kind, terminals });
        }

        if let Some(shunt_class) = ShuntClass::from_tag(class) {
            let rating = if shunt_class.is_generation() {
                Some(self.dg_rating(id))
            } else {
                None
            };
            return ElementKind::Shunt(ShuntElement {
                class: shunt_class,
                bus: self.terminal(id, "bus1"),
                rating,
            });
        }

        match class {
            "transformer" => self.transformer(id),
            "fuse" => self.fuse(id),
            "recloser" => self.recloser(id),
            "relay" => match text_property(self.oracle, id, "type").as_deref() {
                Some("current") => self.current_relay(id),
                Some("voltage") => self.voltage_relay(id),
                _ => ElementKind::Other,
            },
            "vsource" => self.source(id),
            _ => ElementKind::Other,
        }
    }

    /// Terminal bus name without node suffix, `None` when undefined.
    fn terminal(&self, id: &str, property: &str) -> Option<String> {
        text_property(self.oracle, id, property)
            .map(|bus| strip_nodes(&bus))
            .filter(|bus| !bus.is_empty())
    }

    fn recover<T>(&mut self, outcome: Result<T>, fallback: T) -> T {
        outcome.unwrap_or_else(|err| {
            log::warn!("{}; using default", err);
            self.anomalies.push(err);
            fallback
        })
    }

    fn optional(&mut self, id: &str, property: &str) -> Option<f64> {
        let outcome = scalar_property(self.oracle, id, property);
        self.recover(outcome, None)
    }

    fn scalar_or(&mut self, id: &str, property: &str, default: f64) -> f64 {
        self.optional(id, property).unwrap_or(default)
    }

    fn list(&mut self, id: &str, property: &str) -> Vec<f64> {
        let outcome = numeric_property(self.oracle, id, property);
        self.recover(outcome, Vec::new())
    }

    fn line_data(&mut self, id: &str) -> LineData {
        let switch = flag_property(self.oracle, id, "switch");
        let length = self.scalar_or(id, "length", 0.0);
        let unit = text_property(self.oracle, id, "units").unwrap_or_else(|| "none".to_string());

        // Switches never count toward circuit length
        let length_km = if switch {
            0.0
        } else if length < 0.0 {
            let err = TopologyError::parse(id, "length", length.to_string());
            log::warn!("{}; negative length excluded from circuit length", err);
            self.anomalies.push(err);
            0.0
        } else {
            length * self.unit_factor(id, &unit)
        };

        LineData {
            length,
            unit,
            length_km,
            switch,
        }
    }

    fn unit_factor(&mut self, id: &str, unit: &str) -> f64 {
        if unit == "none" {
            if !self.missing_unit_warned {
                self.missing_unit_warned = true;
                log::warn!(
                    "Line '{}' has no length unit, assuming '{}' for all such lines",
                    id,
                    self.default_unit
                );
            }
            return self.default_unit.to_km();
        }

        match LengthUnit::from_code(unit) {
            Some(unit) => unit.to_km(),
            None => {
                let err = TopologyError::UnsupportedUnit {
                    line: id.to_string(),
                    unit: unit.to_string(),
                };
                log::warn!("{}; excluded from circuit length", err);
                self.anomalies.push(err);
                0.0
            }
        }
    }

    fn transformer(&mut self, id: &str) -> ElementKind {
        let mut terminals: Vec<Option<String>> = text_property(self.oracle, id, "buses")
            .map(|raw| bus_list(&raw))
            .unwrap_or_default()
            .into_iter()
            .map(Some)
            .collect();
        while terminals.len() < 2 {
            terminals.push(None);
        }

        let kvs = self.list(id, "kvs");
        let kva = self
            .list(id, "kvas")
            .into_iter()
            .fold(0.0, f64::max);

        ElementKind::Series(SeriesElement {
            kind: SeriesKind::Transformer(TransformerData { kvs, kva }),
            terminals,
        })
    }

    fn dg_rating(&mut self, id: &str) -> DgRating {
        let kv = self.scalar_or(id, "kv", 0.0);
        let kva = self.scalar_or(id, "kva", 0.0);
        let pf = self.scalar_or(id, "pf", 1.0);
        DgRating {
            kv,
            kva,
            pf,
            kw: pf * kva,
        }
    }

    /// Monitored and switched objects, switched falling back to monitored.
    fn protected_objects(&self, id: &str) -> (Option<String>, Option<String>) {
        let monitored = text_property(self.oracle, id, "monitoredobj");
        let switched = match text_property(self.oracle, id, "switchedobj") {
            Some(obj) if self.known.contains(obj.as_str()) => Some(obj),
            _ => monitored.clone(),
        };
        (monitored, switched)
    }

    fn curve(&self, id: &str, property: &str) -> String {
        text_property(self.oracle, id, property).unwrap_or_default()
    }

    fn fuse(&mut self, id: &str) -> ElementKind {
        let (monitored, switched) = self.protected_objects(id);
        let curves = vec![CurveSetting {
            label: "fusecurve".to_string(),
            curve: self.curve(id, "fusecurve"),
            delay: self.scalar_or(id, "delay", 0.0),
            pickup: self.scalar_or(id, "ratedcurrent", 0.0),
            time_dial: 1.0,
        }];

        ElementKind::Protection(ProtectionDevice {
            class: ProtectionClass::Fuse,
            monitored,
            switched,
            curves,
            reclose_intervals: Vec::new(),
        })
    }

    fn recloser(&mut self, id: &str) -> ElementKind {
        let (monitored, switched) = self.protected_objects(id);
        let delay = self.scalar_or(id, "delay", 0.0);
        let trip = self.scalar_or(id, "phasetrip", 0.0);
        let fast_dial = self.scalar_or(id, "tdphfast", 1.0);
        let delayed_dial = self.scalar_or(id, "tdphdelayed", 1.0);

        let curves = vec![
            CurveSetting {
                label: "phasefast".to_string(),
                curve: self.curve(id, "phasefast"),
                delay,
                pickup: trip,
                time_dial: fast_dial,
            },
            CurveSetting {
                label: "phasedelayed".to_string(),
                curve: self.curve(id, "phasedelayed"),
                delay,
                pickup: trip,
                time_dial: delayed_dial,
            },
        ];

        let reclose_intervals = self.list(id, "recloseintervals");
        ElementKind::Protection(ProtectionDevice {
            class: ProtectionClass::Recloser,
            monitored,
            switched,
            curves,
            reclose_intervals,
        })
    }

    fn current_relay(&mut self, id: &str) -> ElementKind {
        let (monitored, switched) = self.protected_objects(id);
        let delay = self.scalar_or(id, "delay", 0.0);
        let trip = self.scalar_or(id, "phasetrip", 0.0);
        let time_dial = self.scalar_or(id, "tdphase", 1.0);

        // A relay without a phase curve has no curve settings
        let curves = text_property(self.oracle, id, "phasecurve")
            .map(|curve| CurveSetting {
                label: "phasecurve".to_string(),
                curve,
                delay,
                pickup: trip,
                time_dial,
            })
            .into_iter()
            .collect();

        let reclose_intervals = self.list(id, "recloseintervals");
        ElementKind::Protection(ProtectionDevice {
            class: ProtectionClass::Relay,
            monitored,
            switched,
            curves,
            reclose_intervals,
        })
    }

    fn voltage_relay(&mut self, id: &str) -> ElementKind {
        let (monitored, switched) = self.protected_objects(id);
        ElementKind::VoltageProtection(VoltageRelay {
            monitored,
            switched,
            undervoltage_curve: text_property(self.oracle, id, "undervoltcurve"),
            overvoltage_curve: text_property(self.oracle, id, "overvoltcurve"),
            delay: self.scalar_or(id, "delay", 0.0),
            kv_base: self.scalar_or(id, "kvbase", 0.0),
        })
    }

    fn source(&mut self, id: &str) -> ElementKind {
        let system = SystemInfo {
            base_kv: self.optional(id, "basekv"),
            pu: self.optional(id, "pu"),
            mva_sc1: self.optional(id, "mvasc1"),
            mva_sc3: self.optional(id, "mvasc3"),
            base_mva: self.optional(id, "basemva"),
            base_freq: self.optional(id, "basefreq"),
        };

        ElementKind::Source(SourceElement {
            terminals: vec![self.terminal(id, "bus1"), self.terminal(id, "bus2")],
            system,
        })
    }
}
