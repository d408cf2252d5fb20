//! RGB colours and the command payloads written to the light.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Colour stored for a freshly bound device.
pub const DEFAULT_COLOR: &str = "#ff2442";

/// Payload that switches the light off.
pub const OFF_COMMAND: [u8; 1] = [1];

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The three-byte set-colour command, `[r, g, b]`.
    #[must_use]
    pub const fn to_payload(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Format as `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse any of the accepted colour notations.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_types::Rgb;
    ///
    /// assert_eq!(Rgb::parse("#ff2442").unwrap(), Rgb::new(0xff, 0x24, 0x42));
    /// assert_eq!(Rgb::parse("rgb(255, 0, 0)").unwrap(), Rgb::new(255, 0, 0));
    /// assert_eq!(Rgb::parse("#0f0").unwrap(), Rgb::new(0, 255, 0));
    /// assert_eq!(Rgb::parse("12,34,56").unwrap(), Rgb::new(12, 34, 56));
    /// ```
    pub fn parse(s: &str) -> ParseResult<Self> {
        let input = s.trim();
        let invalid = || ParseError::InvalidColor(s.to_string());

        if let Some(inner) = input
            .strip_prefix("rgb(")
            .or_else(|| input.strip_prefix("RGB("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_components(inner).ok_or_else(invalid);
        }

        if input.contains(',') {
            return Self::parse_components(input).ok_or_else(invalid);
        }

        let hex = input.strip_prefix('#').unwrap_or(input);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                match (channel(0), channel(2), channel(4)) {
                    (Ok(r), Ok(g), Ok(b)) => Ok(Self::new(r, g, b)),
                    _ => Err(invalid()),
                }
            }
            3 => {
                // #rgb expands each nibble: #0f0 -> #00ff00
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
                match (channel(0), channel(1), channel(2)) {
                    (Ok(r), Ok(g), Ok(b)) => Ok(Self::new(r, g, b)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }

    fn parse_components(s: &str) -> Option<Self> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<u8>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_color_parses() {
        let rgb = Rgb::parse(DEFAULT_COLOR).unwrap();
        assert_eq!(rgb, Rgb::new(0xff, 0x24, 0x42));
    }

    #[test]
    fn test_parse_without_hash() {
        assert_eq!(Rgb::parse("00ff00").unwrap(), Rgb::GREEN);
    }

    #[test]
    fn test_parse_rgb_function_with_spaces() {
        assert_eq!(
            Rgb::parse("  rgb( 10 ,20, 30 ) ").unwrap(),
            Rgb::new(10, 20, 30)
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_components() {
        assert!(Rgb::parse("rgb(256, 0, 0)").is_err());
        assert!(Rgb::parse("1,2").is_err());
        assert!(Rgb::parse("1,2,3,4").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_hex() {
        assert!(matches!(
            Rgb::parse("#gg0000"),
            Err(ParseError::InvalidColor(_))
        ));
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::parse("").is_err());
        assert!(Rgb::parse("red").is_err());
    }

    #[test]
    fn test_payloads() {
        assert_eq!(Rgb::new(255, 0, 0).to_payload(), [255, 0, 0]);
        assert_eq!(OFF_COMMAND, [1]);
    }

    #[test]
    fn test_display_is_lower_hex() {
        assert_eq!(Rgb::new(0xAB, 0x01, 0xFF).to_string(), "#ab01ff");
    }

    proptest! {
        #[test]
        fn prop_hex_output_parses_back(r: u8, g: u8, b: u8) {
            let rgb = Rgb::new(r, g, b);
            prop_assert_eq!(Rgb::parse(&rgb.to_hex()).unwrap(), rgb);
        }
    }
}
