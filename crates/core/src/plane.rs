//! Plane constraints for fitting transformations.

use std::fmt;
use std::str::FromStr;

use crate::error::FitError;

/// Plane selector for constrained fits.
///
/// Each plane maps to the index of the one axis it does not span
/// (`yz` → x, `xz` → y, `xy` → z). A translation fit zeroes the displacement
/// along that axis; a roto-translation fit zeroes the Euler angle about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Yz,
    Xz,
    Xy,
}

impl Plane {
    /// Axis index (0 = x, 1 = y, 2 = z) whose component is suppressed.
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            Plane::Yz => 0,
            Plane::Xz => 1,
            Plane::Xy => 2,
        }
    }

    /// Parse an optional plane name, as accepted by the factory functions.
    pub fn parse_optional(name: Option<&str>) -> Result<Option<Plane>, FitError> {
        name.map(str::parse).transpose()
    }
}

impl FromStr for Plane {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yz" => Ok(Plane::Yz),
            "xz" => Ok(Plane::Xz),
            "xy" => Ok(Plane::Xy),
            other => Err(FitError::InvalidArgument(format!(
                "{} is not a valid plane",
                other
            ))),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plane::Yz => "yz",
            Plane::Xz => "xz",
            Plane::Xy => "xy",
        };
        f.write_str(name)
    }
}
