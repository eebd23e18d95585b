//! GLSL blend equations.
//!
//! Every mode defines `vec3 blend(vec3 Cb, vec3 Cs)` on straight colors.
//! Separable modes are written per channel as `blendChannel(b, s)` and
//! wrapped; the others operate on the whole color with the W3C
//! luminosity/saturation helpers.

use super::BlendMode;

const SCREEN: &str = "float blendScreen(float b, float s) { return b + s - b * s; }";

const COLOR_DODGE: &str = "float blendColorDodge(float b, float s) {
  if (b <= 0.0) return 0.0;
  if (s >= 1.0) return 1.0;
  return min(1.0, b / (1.0 - s));
}";

const COLOR_BURN: &str = "float blendColorBurn(float b, float s) {
  if (b >= 1.0) return 1.0;
  if (s <= 0.0) return 0.0;
  return 1.0 - min(1.0, (1.0 - b) / s);
}";

const HARD_LIGHT: &str = "float blendHardLight(float b, float s) {
  if (s <= 0.5) return b * 2.0 * s;
  return blendScreen(b, 2.0 * s - 1.0);
}";

const NON_SEPARABLE: &str = "float blendLum(vec3 c) { return dot(c, vec3(0.3, 0.59, 0.11)); }

vec3 blendClipColor(vec3 c) {
  float l = blendLum(c);
  float n = min(min(c.r, c.g), c.b);
  float x = max(max(c.r, c.g), c.b);
  if (n < 0.0 && l - n != 0.0) c = l + (c - l) * l / (l - n);
  if (x > 1.0 && x - l != 0.0) c = l + (c - l) * (1.0 - l) / (x - l);
  return c;
}

vec3 blendSetLum(vec3 c, float l) { return blendClipColor(c + (l - blendLum(c))); }

float blendSat(vec3 c) { return max(max(c.r, c.g), c.b) - min(min(c.r, c.g), c.b); }

vec3 blendSetSat(vec3 c, float s) {
  float n = min(min(c.r, c.g), c.b);
  float d = max(max(c.r, c.g), c.b) - n;
  return d > 0.0 ? (c - n) * s / d : vec3(0.0);
}";

const DISSOLVE: &str = "#define DISSOLVE
float blendHash(vec2 co) { return fract(sin(dot(co, vec2(12.9898, 78.233))) * 43758.5453); }";

const CHANNEL_WRAPPER: &str = "vec3 blend(vec3 Cb, vec3 Cs) {
  return vec3(blendChannel(Cb.r, Cs.r), blendChannel(Cb.g, Cs.g), blendChannel(Cb.b, Cs.b));
}";

enum Body {
    /// Body of `float blendChannel(float b, float s)`.
    Channel(&'static str),
    /// Body of `vec3 blend(vec3 Cb, vec3 Cs)`.
    Color(&'static str),
}

fn helpers(mode: BlendMode) -> &'static [&'static str] {
    use BlendMode::*;
    match mode {
        Dissolve => &[DISSOLVE],
        Screen | Overlay => &[SCREEN],
        HardLight => &[SCREEN, HARD_LIGHT],
        ColorDodge => &[COLOR_DODGE],
        ColorBurn => &[COLOR_BURN],
        VividLight => &[COLOR_DODGE, COLOR_BURN],
        DarkerColor | LighterColor | Hue | Saturation | Color | Luminosity => &[NON_SEPARABLE],
        _ => &[],
    }
}

fn body(mode: BlendMode) -> Body {
    use BlendMode::*;
    match mode {
        Normal | Dissolve => Body::Channel("return s;"),
        Darken => Body::Channel("return min(b, s);"),
        Multiply => Body::Channel("return b * s;"),
        ColorBurn => Body::Channel("return blendColorBurn(b, s);"),
        LinearBurn => Body::Channel("return max(b + s - 1.0, 0.0);"),
        Lighten => Body::Channel("return max(b, s);"),
        Screen => Body::Channel("return blendScreen(b, s);"),
        ColorDodge => Body::Channel("return blendColorDodge(b, s);"),
        LinearDodge => Body::Channel("return min(b + s, 1.0);"),
        Overlay => Body::Channel(
            "if (b <= 0.5) return s * 2.0 * b;
  return blendScreen(s, 2.0 * b - 1.0);",
        ),
        SoftLight => Body::Channel(
            "if (s <= 0.5) return b - (1.0 - 2.0 * s) * b * (1.0 - b);
  float d = b <= 0.25 ? ((16.0 * b - 12.0) * b + 4.0) * b : sqrt(b);
  return b + (2.0 * s - 1.0) * (d - b);",
        ),
        HardLight => Body::Channel("return blendHardLight(b, s);"),
        VividLight => Body::Channel(
            "if (s <= 0.5) return blendColorBurn(b, 2.0 * s);
  return blendColorDodge(b, 2.0 * s - 1.0);",
        ),
        LinearLight => Body::Channel("return clamp(b + 2.0 * s - 1.0, 0.0, 1.0);"),
        PinLight => Body::Channel(
            "if (s <= 0.5) return min(b, 2.0 * s);
  return max(b, 2.0 * s - 1.0);",
        ),
        HardMix => Body::Channel("return b + s >= 1.0 ? 1.0 : 0.0;"),
        Difference => Body::Channel("return abs(b - s);"),
        Exclusion => Body::Channel("return b + s - 2.0 * b * s;"),
        Subtract => Body::Channel("return max(b - s, 0.0);"),
        Divide => Body::Channel(
            "if (s <= 0.0) return b > 0.0 ? 1.0 : 0.0;
  return min(b / s, 1.0);",
        ),
        DarkerColor => Body::Color("return blendLum(Cs) < blendLum(Cb) ? Cs : Cb;"),
        LighterColor => Body::Color("return blendLum(Cs) > blendLum(Cb) ? Cs : Cb;"),
        Hue => Body::Color("return blendSetLum(blendSetSat(Cs, blendSat(Cb)), blendLum(Cb));"),
        Saturation => Body::Color("return blendSetLum(blendSetSat(Cb, blendSat(Cs)), blendLum(Cb));"),
        Color => Body::Color("return blendSetLum(Cs, blendLum(Cb));"),
        Luminosity => Body::Color("return blendSetLum(Cb, blendLum(Cs));"),
    }
}

/// GLSL defining `vec3 blend(vec3 Cb, vec3 Cs)` for `mode`, preceded by
/// the helpers it calls.
pub fn equation_source(mode: BlendMode) -> String {
    let mut out = String::new();
    for helper in helpers(mode) {
        out.push_str(helper);
        out.push_str("\n\n");
    }
    match body(mode) {
        Body::Channel(code) => {
            out.push_str("float blendChannel(float b, float s) {\n  ");
            out.push_str(code);
            out.push_str("\n}\n\n");
            out.push_str(CHANNEL_WRAPPER);
        }
        Body::Color(code) => {
            out.push_str("vec3 blend(vec3 Cb, vec3 Cs) {\n  ");
            out.push_str(code);
            out.push_str("\n}");
        }
    }
    out.push('\n');
    out
}
