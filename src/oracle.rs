//! Element/property oracle boundary.
//!
//! The topology core never talks to a simulation engine directly. Everything
//! it needs is read through [`PropertyOracle`] during classification, before
//! any traversal starts:
//!
//! - the flat list of element identifiers (`type.name`, lowercase)
//! - the list of bus names
//! - string-encoded property values per element
//! - circuit-level options (declared voltage bases, circuit name)
//! - observed bus voltages from the last solution
//!
//! Undefined properties are reported as `None` (or as an empty/NUL-filled
//! string, which is treated the same way).

use crate::error::{Result, TopologyError};

/// Read-only access to a solved circuit.
pub trait PropertyOracle {
    /// All element identifiers, enabled or not, as `type.name`.
    fn all_elements(&self) -> Result<Vec<String>>;

    /// All bus names known to the engine.
    fn all_buses(&self) -> Result<Vec<String>>;

    /// String value of `property` on `element`, `None` when undefined.
    fn property(&self, element: &str, property: &str) -> Option<String>;

    /// Circuit-level option such as `voltagebases` or `name`.
    fn option(&self, name: &str) -> Option<String>;

    /// Observed voltages at `bus`, `None` when the bus carries no solution.
    fn bus_voltages(&self, bus: &str) -> Option<BusVoltages>;
}

/// Voltage samples observed at one bus after a solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusVoltages {
    /// Nameplate voltage base in kV
    pub kv_base: f64,
    /// Node numbers present at the bus (1, 2, 3 are phases)
    pub nodes: Vec<u32>,
    /// Voltage magnitude per node in volts, same order as `nodes`
    pub magnitudes: Vec<f64>,
}

impl BusVoltages {
    /// Nameplate base rounded to 4 decimals.
    pub fn nameplate_kv(&self) -> f64 {
        round_to(self.kv_base, 4)
    }

    /// Magnitude of the first listed node in kV, rounded to 4 decimals.
    pub fn observed_kv(&self) -> f64 {
        self.magnitudes
            .first()
            .map(|v| round_to(v / 1000.0, 4))
            .unwrap_or(0.0)
    }

    /// Average phase magnitude (nodes 1..=3) in kV, rounded to 3 decimals.
    pub fn phase_average_kv(&self) -> Option<f64> {
        let phases: Vec<f64> = self.phase_magnitudes().collect();
        if phases.is_empty() {
            return None;
        }
        let avg = phases.iter().sum::<f64>() / (phases.len() as f64 * 1000.0);
        Some(round_to(avg, 3))
    }

    /// Lowest positive phase magnitude in volts.
    pub fn min_phase_magnitude(&self) -> Option<f64> {
        self.phase_magnitudes()
            .filter(|v| !v.is_nan() && *v > 0.0)
            .fold(None, |min, v| match min {
                Some(m) if m <= v => Some(m),
                _ => Some(v),
            })
    }

    fn phase_magnitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.nodes
            .iter()
            .zip(&self.magnitudes)
            .filter(|(node, _)| (1..=3).contains(*node))
            .map(|(_, v)| *v)
    }
}

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// True for values the engine uses to signal "not defined".
pub fn is_undefined(value: &str) -> bool {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\0').is_empty()
}

/// Extract every decimal number from a free-form string.
///
/// Tokens may carry a sign and an exponent (`-1.5`, `.5`, `3e-4`). Returns
/// `None` if a token is malformed, e.g. contains two decimal points.
pub fn numeric_values(text: &str) -> Option<Vec<f64>> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !starts_number(bytes, i) {
            i += 1;
            continue;
        }

        let start = i;
        if matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }

        let mut dots = 0;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            if bytes[i] == b'.' {
                dots += 1;
            }
            i += 1;
        }
        if dots > 1 {
            return None;
        }

        // Exponent only counts when digits follow
        if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
            let mut j = i + 1;
            if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                i = j;
            }
        }

        values.push(text[start..i].parse::<f64>().ok()?);
    }

    Some(values)
}

fn starts_number(bytes: &[u8], i: usize) -> bool {
    let digit_at = |k: usize| bytes.get(k).map_or(false, u8::is_ascii_digit);
    match bytes[i] {
        b'0'..=b'9' => true,
        b'.' => digit_at(i + 1),
        b'+' | b'-' => digit_at(i + 1) || (bytes.get(i + 1) == Some(&b'.') && digit_at(i + 2)),
        _ => false,
    }
}

/// Lowercased text property, `None` when undefined.
pub fn text_property(oracle: &dyn PropertyOracle, element: &str, property: &str) -> Option<String> {
    oracle
        .property(element, property)
        .filter(|v| !is_undefined(v))
        .map(|v| v.trim().to_lowercase())
}

/// All numbers of a property, empty when undefined.
pub fn numeric_property(
    oracle: &dyn PropertyOracle,
    element: &str,
    property: &str,
) -> Result<Vec<f64>> {
    match oracle.property(element, property) {
        Some(raw) if !is_undefined(&raw) => numeric_values(&raw)
            .ok_or_else(|| TopologyError::parse(element, property, raw)),
        _ => Ok(Vec::new()),
    }
}

/// First number of a property, `None` when undefined.
pub fn scalar_property(
    oracle: &dyn PropertyOracle,
    element: &str,
    property: &str,
) -> Result<Option<f64>> {
    match oracle.property(element, property) {
        Some(raw) if !is_undefined(&raw) => match numeric_values(&raw) {
            Some(values) if !values.is_empty() => Ok(Some(values[0])),
            _ => Err(TopologyError::parse(element, property, raw)),
        },
        _ => Ok(None),
    }
}

/// Boolean property; anything but `true`/`yes`/`t`/`y` is false.
pub fn flag_property(oracle: &dyn PropertyOracle, element: &str, property: &str) -> bool {
    text_property(oracle, element, property)
        .map(|v| matches!(v.as_str(), "true" | "yes" | "t" | "y"))
        .unwrap_or(false)
}

/// Bus name without its node suffix (`650.1.2.3` -> `650`).
pub fn strip_nodes(bus: &str) -> String {
    bus.trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Decode a bracketed bus list such as `[sourcebus.1.2.3, 650, ]`.
pub fn bus_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace())
        .filter(|part| !is_undefined(part))
        .map(strip_nodes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_list() {
        let values = numeric_values("[115, 4.16, 0.48, ]").unwrap();
        assert_eq!(values, vec![115.0, 4.16, 0.48]);
    }

    #[test]
    fn test_numeric_values_exponent_and_sign() {
        let values = numeric_values("(0.5 -2 3e-4 1.2E+2 .25)").unwrap();
        assert_eq!(values, vec![0.5, -2.0, 3e-4, 120.0, 0.25]);
    }

    #[test]
    fn test_numeric_values_ignores_words() {
        let values = numeric_values("kva=5000kva e 7e").unwrap();
        assert_eq!(values, vec![5000.0, 7.0]);
        assert_eq!(numeric_values("none").unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_numeric_values_rejects_double_dot() {
        assert!(numeric_values("[1.2.3]").is_none());
    }

    #[test]
    fn test_bus_list() {
        let buses = bus_list("[SourceBus.1.2.3, 650, ]");
        assert_eq!(buses, vec!["sourcebus", "650"]);
    }

    #[test]
    fn test_undefined_values() {
        assert!(is_undefined(""));
        assert!(is_undefined("\0\0"));
        assert!(!is_undefined("x"));
    }

    #[test]
    fn test_bus_voltage_estimates() {
        let sample = BusVoltages {
            kv_base: 7.621_02,
            nodes: vec![1, 2, 3, 4],
            magnitudes: vec![7600.0, 7500.0, 7700.0, 3.0],
        };
        assert_eq!(sample.nameplate_kv(), 7.621);
        assert_eq!(sample.observed_kv(), 7.6);
        assert_eq!(sample.phase_average_kv(), Some(7.6));
        assert_eq!(sample.min_phase_magnitude(), Some(7500.0));
    }
}
