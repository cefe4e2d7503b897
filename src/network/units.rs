//! Line length units.

use std::fmt;
use std::str::FromStr;

/// Length units accepted on line definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Mile,
    Kilofoot,
    Kilometer,
    Meter,
    Foot,
    Inch,
    Centimeter,
}

impl LengthUnit {
    /// Parse an engine unit code (`mi`, `kft`, `km`, `m`, `ft`, `in`, `cm`).
    ///
    /// `none` is not a unit; callers substitute their configured default.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Some(Self::Mile),
            "kft" | "kilofoot" | "kilofeet" => Some(Self::Kilofoot),
            "km" | "kilometer" | "kilometers" => Some(Self::Kilometer),
            "m" | "meter" | "meters" => Some(Self::Meter),
            "ft" | "foot" | "feet" => Some(Self::Foot),
            "in" | "inch" | "inches" => Some(Self::Inch),
            "cm" | "centimeter" | "centimeters" => Some(Self::Centimeter),
            _ => None,
        }
    }

    /// Multiplier from this unit to kilometers.
    pub fn to_km(&self) -> f64 {
        match self {
            Self::Mile => 1.6093,
            Self::Kilofoot => 0.3048,
            Self::Kilometer => 1.0,
            Self::Meter => 0.001,
            Self::Foot => 0.000_304_8,
            Self::Inch => 0.000_025_4,
            Self::Centimeter => 0.000_01,
        }
    }

    /// Short code as used by the engine.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Mile => "mi",
            Self::Kilofoot => "kft",
            Self::Kilometer => "km",
            Self::Meter => "m",
            Self::Foot => "ft",
            Self::Inch => "in",
            Self::Centimeter => "cm",
        }
    }
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self::Kilometer
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown length unit '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_codes() {
        assert_eq!(LengthUnit::from_code("KFT"), Some(LengthUnit::Kilofoot));
        assert_eq!(LengthUnit::from_code("none"), None);
        assert_eq!("mi".parse::<LengthUnit>(), Ok(LengthUnit::Mile));
        assert!("furlong".parse::<LengthUnit>().is_err());
    }

    #[test]
    fn test_unit_conversion() {
        assert_relative_eq!(2000.0 * LengthUnit::Foot.to_km(), 0.6096, max_relative = 1e-12);
        assert_relative_eq!(LengthUnit::Mile.to_km(), 1.6093);
        assert_relative_eq!(150.0 * LengthUnit::Centimeter.to_km(), 0.0015, max_relative = 1e-12);
    }
}
