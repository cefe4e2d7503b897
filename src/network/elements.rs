//! Classified element records.
//!
//! Every element read from the oracle ends up as one [`Element`] whose
//! [`ElementKind`] says how the topology stages treat it:
//!
//! - [`SeriesElement`]: lines, switches, capacitors, reactors, transformers.
//!   Traversed by every propagator.
//! - [`ShuntElement`]: loads, generators, PV systems, storage, induction
//!   machines. Registered at their bus, never traversed through.
//! - [`ProtectionDevice`]: fuses, reclosers, current relays.
//! - [`VoltageRelay`]: voltage relays guarding distributed generation.
//! - [`SourceElement`]: the voltage source feeding the circuit.

use serde::Serialize;

use super::types::{ElementId, ElementName};

/// One classified element.
#[derive(Debug, Clone)]
pub struct Element {
    /// Arena index
    pub id: ElementId,
    /// Type tag and name
    pub name: ElementName,
    /// Category-specific data
    pub kind: ElementKind,
}

/// Element category.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Series(SeriesElement),
    Shunt(ShuntElement),
    Protection(ProtectionDevice),
    VoltageProtection(VoltageRelay),
    Source(SourceElement),
    Other,
}

/// A two (or more) terminal element carrying current in transit.
///
/// Terminal 0 is the origin, terminal 1 the destination. Transformers may
/// list further windings. `None` marks an undefined terminal.
#[derive(Debug, Clone)]
pub struct SeriesElement {
    pub kind: SeriesKind,
    pub terminals: Vec<Option<String>>,
}

/// Series element flavours.
#[derive(Debug, Clone)]
pub enum SeriesKind {
    Line(LineData),
    Capacitor,
    Reactor,
    Transformer(TransformerData),
}

/// Length data of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    /// Length as declared
    pub length: f64,
    /// Unit code as declared (`none` when undefined)
    pub unit: String,
    /// Normalized length; 0 for switches and unsupported units
    pub length_km: f64,
    /// Line modelled as a switch
    pub switch: bool,
}

/// Winding ratings of a transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerData {
    /// Rated kV per winding
    pub kvs: Vec<f64>,
    /// Largest winding rating in kVA
    pub kva: f64,
}

impl SeriesElement {
    /// Origin terminal bus.
    pub fn origin(&self) -> Option<&str> {
        self.terminals.first().and_then(|t| t.as_deref())
    }

    /// Destination terminal bus.
    pub fn destination(&self) -> Option<&str> {
        self.terminals.get(1).and_then(|t| t.as_deref())
    }

    pub fn is_transformer(&self) -> bool {
        matches!(self.kind, SeriesKind::Transformer(_))
    }

    /// A current-carrying line, i.e. a line that is not a switch.
    pub fn is_real_line(&self) -> bool {
        matches!(&self.kind, SeriesKind::Line(line) if !line.switch)
    }

    pub fn is_switch(&self) -> bool {
        matches!(&self.kind, SeriesKind::Line(line) if line.switch)
    }

    /// Line data for lines and switches.
    pub fn line(&self) -> Option<&LineData> {
        match &self.kind {
            SeriesKind::Line(line) => Some(line),
            _ => None,
        }
    }

    /// Distance contributed when traversing this element.
    ///
    /// Real lines count their length; everything else counts `nominal_km`.
    pub fn distance_km(&self, nominal_km: f64) -> f64 {
        match &self.kind {
            SeriesKind::Line(line) if !line.switch => line.length_km,
            _ => nominal_km,
        }
    }
}

/// Single-terminal device sourcing or sinking power.
#[derive(Debug, Clone)]
pub struct ShuntElement {
    pub class: ShuntClass,
    pub bus: Option<String>,
    /// Ratings for generators and PV systems
    pub rating: Option<DgRating>,
}

/// Shunt device type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuntClass {
    Generator,
    Load,
    PvSystem,
    Storage,
    InductionMachine,
}

impl ShuntClass {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "generator" => Some(Self::Generator),
            "load" => Some(Self::Load),
            "pvsystem" => Some(Self::PvSystem),
            "storage" => Some(Self::Storage),
            "indmach012" => Some(Self::InductionMachine),
            _ => None,
        }
    }

    /// Distributed generators whose ratings are collected.
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generator | Self::PvSystem)
    }
}

/// Rating of a distributed generator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DgRating {
    pub kv: f64,
    pub kva: f64,
    pub pf: f64,
    /// `pf * kva`
    pub kw: f64,
}

/// Protection device type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionClass {
    Fuse,
    Recloser,
    Relay,
}

/// One operating curve of a protection device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSetting {
    /// Which setting the curve belongs to (`fusecurve`, `phasefast`, ...)
    pub label: String,
    /// Curve name
    pub curve: String,
    /// Fixed delay added to the curve time (s)
    pub delay: f64,
    /// Current multiplier: rated current or phase trip (A)
    pub pickup: f64,
    /// Time multiplier (time dial)
    pub time_dial: f64,
}

/// Overcurrent protection: fuse, recloser or current relay.
#[derive(Debug, Clone)]
pub struct ProtectionDevice {
    pub class: ProtectionClass,
    pub monitored: Option<String>,
    /// Element that opens; falls back to `monitored` when undeclared
    pub switched: Option<String>,
    pub curves: Vec<CurveSetting>,
    /// Reclose intervals, empty for fuses
    pub reclose_intervals: Vec<f64>,
}

/// Voltage relay protecting a distributed generator.
#[derive(Debug, Clone)]
pub struct VoltageRelay {
    pub monitored: Option<String>,
    pub switched: Option<String>,
    pub undervoltage_curve: Option<String>,
    pub overvoltage_curve: Option<String>,
    pub delay: f64,
    pub kv_base: f64,
}

/// The circuit's voltage source.
#[derive(Debug, Clone)]
pub struct SourceElement {
    pub terminals: Vec<Option<String>>,
    pub system: SystemInfo,
}

impl SourceElement {
    /// Bus the source feeds.
    pub fn bus(&self) -> Option<&str> {
        self.terminals.first().and_then(|t| t.as_deref())
    }
}

/// System-level data carried by the source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SystemInfo {
    pub base_kv: Option<f64>,
    pub pu: Option<f64>,
    pub mva_sc1: Option<f64>,
    pub mva_sc3: Option<f64>,
    pub base_mva: Option<f64>,
    pub base_freq: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(switch: bool, length_km: f64) -> SeriesElement {
        SeriesElement {
            kind: SeriesKind::Line(LineData {
                length: length_km,
                unit: "km".to_string(),
                length_km,
                switch,
            }),
            terminals: vec![Some("a".to_string()), Some("b".to_string())],
        }
    }

    #[test]
    fn test_series_distance_cost() {
        assert_eq!(line(false, 1.5).distance_km(0.001), 1.5);
        assert_eq!(line(true, 0.0).distance_km(0.001), 0.001);

        let cap = SeriesElement {
            kind: SeriesKind::Capacitor,
            terminals: vec![Some("a".to_string()), None],
        };
        assert_eq!(cap.distance_km(0.001), 0.001);
        assert_eq!(cap.destination(), None);
        assert_eq!(cap.origin(), Some("a"));
    }

    #[test]
    fn test_series_flags() {
        assert!(line(false, 1.0).is_real_line());
        assert!(line(true, 1.0).is_switch());
        assert!(!line(true, 1.0).is_real_line());
    }
}
