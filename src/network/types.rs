//! Core types for feeder representation.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, TopologyError};

/// Upper bound (exclusive) of the low-voltage tier, in kV.
pub const LV_UPPER_KV: f64 = 1.0;

/// Lower bound (inclusive) of the high-voltage tier, in kV.
pub const HV_LOWER_KV: f64 = 72.5;

/// Index of a bus in the adjacency arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub usize);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Index of a classified element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Element identity: type tag plus name, e.g. `line.650632`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementName {
    /// Lowercased type tag (`line`, `transformer`, `fuse`, ...)
    pub class: String,
    /// Lowercased element name
    pub name: String,
}

impl ElementName {
    /// Split an identifier into its type tag and name.
    ///
    /// Exactly one dot is allowed and both parts must be non-empty.
    pub fn parse(identifier: &str) -> Result<Self> {
        let lowered = identifier.trim().to_lowercase();
        let mut parts = lowered.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(class), Some(name), None) if !class.is_empty() && !name.is_empty() => Ok(Self {
                class: class.to_string(),
                name: name.to_string(),
            }),
            _ => Err(TopologyError::FormatError {
                identifier: identifier.to_string(),
            }),
        }
    }

    /// The full `type.name` identifier.
    pub fn identifier(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

/// Voltage classification of buses and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoltageTier {
    /// Below 1 kV
    Lv,
    /// From 1 kV up to 72.5 kV
    Mv,
    /// 72.5 kV and above
    Hv,
}

impl VoltageTier {
    /// Classify a voltage base in kV.
    pub fn from_kv(kv: f64) -> Self {
        if kv < LV_UPPER_KV {
            Self::Lv
        } else if kv < HV_LOWER_KV {
            Self::Mv
        } else {
            Self::Hv
        }
    }
}

impl fmt::Display for VoltageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Lv => "LV",
            Self::Mv => "MV",
            Self::Hv => "HV",
        };
        f.write_str(label)
    }
}
