//! Color parsing and the non-separable color helpers used by blend modes.
//!
//! `Rgba` parses the `#RRGGBB` / `#RRGGBBAA` strings accepted by color
//! uniforms. The luminosity and saturation helpers follow the W3C
//! compositing definitions and mirror the GLSL functions emitted by
//! [`crate::blend`], so CPU reference results match the shaders.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Straight (non-premultiplied) RGBA color with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (case insensitive).
    ///
    /// Strings shorter than seven characters, missing the leading `#`, or
    /// with a malformed RGB pair are rejected. The alpha pair is optional:
    /// when it is absent or not valid hex, alpha is `1.0`.
    pub fn from_hex(hex: &str) -> Result<Rgba, String> {
        if hex.len() < 7 {
            return Err(format!(
                "expected at least 7 characters (#RRGGBB), got {}",
                hex.len()
            ));
        }
        let digits = hex
            .strip_prefix('#')
            .ok_or_else(|| format!("color must start with '#': {hex}"))?;

        let channel = |range: std::ops::Range<usize>, label: &str| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .map(|v| v as f32 / 255.0)
                .ok_or_else(|| format!("invalid {label} component in {hex}"))
        };

        let r = channel(0..2, "red")?;
        let g = channel(2..4, "green")?;
        let b = channel(4..6, "blue")?;
        let a = channel(6..8, "alpha").unwrap_or(1.0);
        Ok(Rgba { r, g, b, a })
    }

    /// Formats as `#rrggbbaa`, quantized to 8 bits per channel.
    pub fn to_hex(self) -> String {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            q(self.r),
            q(self.g),
            q(self.b),
            q(self.a)
        )
    }

    pub fn rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Returns the color with RGB multiplied by alpha.
    pub fn premultiplied(self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }

    /// Reconstructs a straight color from premultiplied components.
    /// Zero alpha yields transparent black rather than dividing by zero.
    pub fn from_premultiplied(c: [f32; 4]) -> Rgba {
        if c[3] > 0.0 {
            Rgba::new(c[0] / c[3], c[1] / c[3], c[2] / c[3], c[3])
        } else {
            Rgba::TRANSPARENT
        }
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// W3C luminosity: `0.3 R + 0.59 G + 0.11 B`.
pub fn luminosity(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

/// Difference between the largest and smallest component.
pub fn saturation(c: [f32; 3]) -> f32 {
    max3(c) - min3(c)
}

/// Pulls out-of-gamut components back into [0, 1] while preserving luminosity.
pub fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = luminosity(c);
    let n = min3(c);
    let x = max3(c);
    let mut out = c;
    if n < 0.0 && l - n != 0.0 {
        out = out.map(|v| l + (v - l) * l / (l - n));
    }
    if x > 1.0 && x - l != 0.0 {
        out = out.map(|v| l + (v - l) * (1.0 - l) / (x - l));
    }
    out
}

/// Shifts `c` so its luminosity equals `l`, then clips into gamut.
pub fn set_luminosity(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - luminosity(c);
    clip_color(c.map(|v| v + d))
}

/// Rescales `c` so its saturation equals `s`; grey inputs become black.
pub fn set_saturation(c: [f32; 3], s: f32) -> [f32; 3] {
    let n = min3(c);
    let d = max3(c) - n;
    if d > 0.0 {
        c.map(|v| (v - n) * s / d)
    } else {
        [0.0; 3]
    }
}

fn max3(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2])
}

fn min3(c: [f32; 3]) -> f32 {
    c[0].min(c[1]).min(c[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    // -- hex parsing --

    #[test]
    fn from_hex_parses_rgb_with_default_alpha() {
        let c = Rgba::from_hex("#ff0000").unwrap();
        assert_eq!(c, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn from_hex_parses_rgba() {
        let c = Rgba::from_hex("#00FF0080").unwrap();
        assert!(approx_eq(c.g, 1.0));
        assert!(approx_eq(c.a, 128.0 / 255.0));
    }

    #[test]
    fn from_hex_unparsable_alpha_defaults_to_one() {
        let c = Rgba::from_hex("#0000ffzz").unwrap();
        assert!(approx_eq(c.b, 1.0));
        assert!(approx_eq(c.a, 1.0));
    }

    #[test]
    fn from_hex_rejects_short_strings() {
        let err = Rgba::from_hex("#fff").unwrap_err();
        assert!(err.contains("7 characters"), "got: {err}");
    }

    #[test]
    fn from_hex_rejects_missing_hash() {
        assert!(Rgba::from_hex("ff00000").is_err());
    }

    #[test]
    fn from_hex_rejects_bad_rgb_digits() {
        let err = Rgba::from_hex("#gg0000").unwrap_err();
        assert!(err.contains("red"), "got: {err}");
    }

    #[test]
    fn hex_serde_round_trip() {
        let c = Rgba::from_hex("#336699cc").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"#336699cc\"");
        let back: Rgba = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_hex(), c.to_hex());
    }

    #[test]
    fn premultiply_and_back() {
        let c = Rgba::new(1.0, 0.5, 0.0, 0.5);
        let p = c.premultiplied();
        assert_eq!(p, [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(Rgba::from_premultiplied(p), c);
    }

    #[test]
    fn from_premultiplied_zero_alpha_is_transparent() {
        assert_eq!(
            Rgba::from_premultiplied([0.3, 0.2, 0.1, 0.0]),
            Rgba::TRANSPARENT
        );
    }

    // -- non-separable helpers --

    #[test]
    fn luminosity_of_white_is_one() {
        assert!(approx_eq(luminosity([1.0, 1.0, 1.0]), 1.0));
    }

    #[test]
    fn set_luminosity_hits_target() {
        let c = set_luminosity([0.2, 0.4, 0.6], 0.5);
        assert!((luminosity(c) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn set_saturation_of_grey_is_black() {
        assert_eq!(set_saturation([0.4, 0.4, 0.4], 0.8), [0.0; 3]);
    }

    #[test]
    fn set_saturation_maps_max_to_s() {
        let c = set_saturation([0.2, 0.6, 0.4], 0.5);
        assert!(approx_eq(c[0], 0.0));
        assert!(approx_eq(c[1], 0.5));
        assert!(approx_eq(c[2], 0.25));
    }

    #[test]
    fn clip_color_keeps_in_gamut_unchanged() {
        let c = [0.1, 0.5, 0.9];
        assert_eq!(clip_color(c), c);
    }

    #[test]
    fn clip_color_pulls_overflow_into_range() {
        let c = clip_color([1.4, 0.2, 0.2]);
        assert!(c.iter().all(|v| (-EPSILON..=1.0 + EPSILON).contains(v)), "{c:?}");
    }
}
