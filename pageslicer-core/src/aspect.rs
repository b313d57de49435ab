//! Target aspect ratio for subdivided regions

use crate::error::{Result, SliceError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Smallest accepted ratio. Anything narrower produces absurdly tall tiles.
pub const MIN_ASPECT_RATIO: f64 = 0.01;

/// Width divided by height, validated against [`MIN_ASPECT_RATIO`]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AspectRatio(f64);

impl AspectRatio {
    /// Portrait 3:4, the default tile shape
    pub const DEFAULT: AspectRatio = AspectRatio(0.75);

    /// Create an aspect ratio from a decimal value
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(SliceError::InvalidAspectRatio(value.to_string()));
        }
        if value < MIN_ASPECT_RATIO {
            return Err(SliceError::AspectRatioTooSmall {
                ratio: value,
                minimum: MIN_ASPECT_RATIO,
            });
        }
        Ok(Self(value))
    }

    /// Create an aspect ratio from separate width and height terms
    pub fn from_terms(width: f64, height: f64) -> Result<Self> {
        if height == 0.0 {
            return Err(SliceError::InvalidAspectRatio(format!("{width}:{height}")));
        }
        Self::new(width / height)
    }

    /// The ratio as a decimal
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Height of a tile of the given width
    pub fn height_for_width(&self, width: f64) -> f64 {
        width / self.0
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for AspectRatio {
    type Err = SliceError;

    /// Parse `"W:H"`, `"W/H"` or a bare decimal such as `"0.75"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || SliceError::InvalidAspectRatio(s.to_string());

        let separator = [':', '/'].into_iter().find(|sep| s.contains(*sep));
        match separator {
            Some(sep) => {
                let mut parts = s.split(sep);
                let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(invalid());
                };
                let width = width.trim().parse::<f64>().map_err(|_| invalid())?;
                let height = height.trim().parse::<f64>().map_err(|_| invalid())?;
                if height == 0.0 {
                    return Err(invalid());
                }
                Self::new(width / height).map_err(|e| match e {
                    SliceError::InvalidAspectRatio(_) => invalid(),
                    other => other,
                })
            }
            None => {
                let value = s.parse::<f64>().map_err(|_| invalid())?;
                Self::new(value).map_err(|e| match e {
                    SliceError::InvalidAspectRatio(_) => invalid(),
                    other => other,
                })
            }
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<f64> {
        s.parse::<AspectRatio>().map(|r| r.value())
    }

    #[test]
    fn test_parse_colon_and_slash() {
        assert_eq!(parse("3:4").unwrap(), 0.75);
        assert!((parse("16/9").unwrap() - 1.7777).abs() < 1e-3);
        assert_eq!(parse(" 1 : 2 ").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse("0.5").unwrap(), 0.5);
        assert_eq!(parse("2").unwrap(), 2.0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "abc", "3:", ":4", "3:4:5", "3/0", "1:x", "-0.5", "0", "NaN", "inf"] {
            let err = parse(input).unwrap_err();
            assert!(
                matches!(err, SliceError::InvalidAspectRatio(_)),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_below_floor() {
        let err = parse("0.001").unwrap_err();
        assert!(matches!(err, SliceError::AspectRatioTooSmall { .. }));

        let err = parse("1:1000").unwrap_err();
        assert!(matches!(err, SliceError::AspectRatioTooSmall { .. }));

        assert_eq!(parse("0.01").unwrap(), MIN_ASPECT_RATIO);
    }

    #[test]
    fn test_from_terms() {
        assert_eq!(AspectRatio::from_terms(3.0, 4.0).unwrap().value(), 0.75);
        assert!(AspectRatio::from_terms(3.0, 0.0).is_err());
    }

    #[test]
    fn test_default_and_height_for_width() {
        let ratio = AspectRatio::default();
        assert_eq!(ratio, AspectRatio::DEFAULT);
        assert_eq!(ratio.value(), 0.75);
        assert_eq!(ratio.height_for_width(300.0), 400.0);
    }

    #[test]
    fn test_display_round_trips() {
        let ratio: AspectRatio = "3:4".parse().unwrap();
        assert_eq!(ratio.to_string(), "0.75");
        assert_eq!(ratio.to_string().parse::<AspectRatio>().unwrap(), ratio);
    }
}
