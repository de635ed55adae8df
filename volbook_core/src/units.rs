//! # Unit Types
//!
//! Type-safe wrappers for field measurement units. These provide compile-time
//! safety against unit confusion while remaining lightweight (just f64 wrappers).
//!
//! ## Design Philosophy
//!
//! We use simple newtype wrappers rather than a full units library because:
//! - The measurement book uses a small, fixed set of units
//! - We want JSON serialization to be clean (just numbers)
//! - Minimal runtime overhead
//!
//! ## Units
//!
//! Field measurements are recorded in US customary units and reported in both
//! customary and metric volume:
//! - Length: feet (ft), inches (in)
//! - Volume: cubic feet (ft³), cubic meters (m³)
//!
//! ## Example
//!
//! ```rust
//! use volbook_core::units::{CubicFeet, CubicMeters, Feet, Inches};
//!
//! let depth = Feet(5.5);
//! let depth_inches: Inches = depth.into();
//! assert_eq!(depth_inches.0, 66.0);
//!
//! let vol = CubicFeet(35.315);
//! let metric: CubicMeters = vol.into();
//! assert_eq!(metric.0, 1.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Cubic feet per cubic meter.
///
/// The measurement-book convention is 35.315, not the more precise 35.3147.
/// Reports produced here must match the hand-computed books in the field, so
/// the rounded constant is load-bearing.
pub const FT3_PER_M3: f64 = 35.315;

// ============================================================================
// Length Units
// ============================================================================

/// Length in decimal feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feet(pub f64);

/// Length in inches
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inches(pub f64);

impl From<Feet> for Inches {
    fn from(ft: Feet) -> Self {
        Inches(ft.0 * 12.0)
    }
}

impl From<Inches> for Feet {
    fn from(inches: Inches) -> Self {
        Feet(inches.0 / 12.0)
    }
}

// ============================================================================
// Volume Units
// ============================================================================

/// Volume in cubic feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicFeet(pub f64);

/// Volume in cubic meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicMeters(pub f64);

impl From<CubicFeet> for CubicMeters {
    fn from(ft3: CubicFeet) -> Self {
        CubicMeters(ft3.0 / FT3_PER_M3)
    }
}

impl From<CubicMeters> for CubicFeet {
    fn from(m3: CubicMeters) -> Self {
        CubicFeet(m3.0 * FT3_PER_M3)
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Feet);
impl_arithmetic!(Inches);
impl_arithmetic!(CubicFeet);
impl_arithmetic!(CubicMeters);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_to_inches() {
        let ft = Feet(10.0);
        let inches: Inches = ft.into();
        assert_eq!(inches.0, 120.0);
    }

    #[test]
    fn test_cubic_feet_to_cubic_meters() {
        let vol = CubicFeet(250.0);
        let metric: CubicMeters = vol.into();
        assert!((metric.0 - 250.0 / 35.315).abs() < 1e-12);
    }

    #[test]
    fn test_conversion_constant_is_field_convention() {
        // 35.315, not the textbook 35.3147
        assert_eq!(FT3_PER_M3, 35.315);
    }

    #[test]
    fn test_arithmetic() {
        let a = Feet(10.0);
        let b = Feet(5.0);
        assert_eq!((a + b).0, 15.0);
        assert_eq!((a - b).0, 5.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
    }

    #[test]
    fn test_serialization() {
        let ft = Feet(12.5);
        let json = serde_json::to_string(&ft).unwrap();
        assert_eq!(json, "12.5");

        let roundtrip: Feet = serde_json::from_str(&json).unwrap();
        assert_eq!(ft, roundtrip);
    }
}
