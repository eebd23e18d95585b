//! Blend modes and the shader library built from them.
//!
//! Every mode shares one fragment-shader shell: sample the backdrop
//! (`iTexture`) and the layer (`iImage`), un-premultiply, apply the mode's
//! `blend()` equation, and composite source-over. Only the equation text
//! differs per mode; see [`equations`].

pub mod equations;
pub mod reference;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompositorError;

/// Photoshop-style layer blend mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Every mode, in menu order.
    pub const ALL: [BlendMode; 27] = [
        BlendMode::Normal,
        BlendMode::Dissolve,
        BlendMode::Darken,
        BlendMode::Multiply,
        BlendMode::ColorBurn,
        BlendMode::LinearBurn,
        BlendMode::DarkerColor,
        BlendMode::Lighten,
        BlendMode::Screen,
        BlendMode::ColorDodge,
        BlendMode::LinearDodge,
        BlendMode::LighterColor,
        BlendMode::Overlay,
        BlendMode::SoftLight,
        BlendMode::HardLight,
        BlendMode::VividLight,
        BlendMode::LinearLight,
        BlendMode::PinLight,
        BlendMode::HardMix,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Subtract,
        BlendMode::Divide,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    /// Snake-case name, as accepted by [`FromStr`] and serde.
    pub fn name(self) -> &'static str {
        use BlendMode::*;
        match self {
            Normal => "normal",
            Dissolve => "dissolve",
            Darken => "darken",
            Multiply => "multiply",
            ColorBurn => "color_burn",
            LinearBurn => "linear_burn",
            DarkerColor => "darker_color",
            Lighten => "lighten",
            Screen => "screen",
            ColorDodge => "color_dodge",
            LinearDodge => "linear_dodge",
            LighterColor => "lighter_color",
            Overlay => "overlay",
            SoftLight => "soft_light",
            HardLight => "hard_light",
            VividLight => "vivid_light",
            LinearLight => "linear_light",
            PinLight => "pin_light",
            HardMix => "hard_mix",
            Difference => "difference",
            Exclusion => "exclusion",
            Subtract => "subtract",
            Divide => "divide",
            Hue => "hue",
            Saturation => "saturation",
            Color => "color",
            Luminosity => "luminosity",
        }
    }

    /// Whether the equation applies to each channel independently.
    pub fn is_separable(self) -> bool {
        !matches!(
            self,
            BlendMode::DarkerColor
                | BlendMode::LighterColor
                | BlendMode::Hue
                | BlendMode::Saturation
                | BlendMode::Color
                | BlendMode::Luminosity
        )
    }

    /// Reserved program name under which the compositor caches this mode.
    pub fn program_name(self) -> String {
        format!("~blend/{}", self.name())
    }

    /// Complete fragment shader source for this mode, before preprocessing.
    pub fn fragment_shader(self) -> String {
        SHELL.replace("@equation", &equations::equation_source(self))
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| CompositorError::InvalidBlendMode(s.to_string()))
    }
}

/// Uniforms the blend shell declares beyond the preprocessor's standard set.
pub const BLEND_IMAGE: &str = "iImage";
pub const BLEND_SIZE: &str = "iSize";
pub const BLEND_OFFSET: &str = "iOffset";
pub const BLEND_OPACITY: &str = "iOpacity";
pub const BLEND_ANGLE: &str = "iAngle";

const SHELL: &str = "@use wrap
@use mask

uniform sampler2D iImage;
uniform vec2 iSize;
uniform vec2 iOffset;
uniform float iOpacity;
uniform float iAngle;

@equation
void main() {
  vec2 p = gl_FragCoord.xy / iResolution;
  vec2 uv = p;
  uv.x -= iOffset.x;
  uv.y += iOffset.y - 1.0 + iSize.y / iResolution.y;
  uv *= iResolution / iSize;
  if (iAngle != 0.0) {
    float sa = sin(iAngle);
    float ca = cos(iAngle);
    uv -= 0.5;
    uv = vec2(ca * uv.x - sa * uv.y, sa * uv.x + ca * uv.y);
    uv += 0.5;
  }

  vec4 dst = texture2D(iTexture, p);
  vec4 src = texture2D(iImage, uv);
  float coverage = clip(uv) * iOpacity;
  if (coverage <= 0.0) {
    gl_FragColor = dst;
    return;
  }
  src *= coverage;
#ifdef DISSOLVE
  float keep = step(blendHash(gl_FragCoord.xy), src.a);
  src = src.a > 0.0 ? vec4(src.rgb / src.a, 1.0) * keep : vec4(0.0);
#endif

  vec3 Cb = dst.a > 0.0 ? dst.rgb / dst.a : vec3(0.0);
  vec3 Cs = src.a > 0.0 ? src.rgb / src.a : vec3(0.0);
  vec3 B = blend(Cb, Cs);

  vec3 mixed = (1.0 - dst.a) * Cs + dst.a * B;
  vec4 result;
  result.a = src.a + dst.a * (1.0 - src.a);
  result.rgb = src.a * mixed + (1.0 - src.a) * dst.rgb;
  gl_FragColor = mix(dst, result, mask(p, 1.0));
}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::Preprocessor;
    use crate::render::ShaderStage;

    #[test]
    fn names_round_trip_through_from_str() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.name().parse::<BlendMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_name_is_invalid_blend_mode() {
        let err = "sparkle".parse::<BlendMode>().unwrap_err();
        assert!(matches!(err, CompositorError::InvalidBlendMode(ref n) if n == "sparkle"));
    }

    #[test]
    fn serde_uses_snake_case_names() {
        for mode in BlendMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.name()));
        }
        let parsed: BlendMode = serde_json::from_str("\"soft_light\"").unwrap();
        assert_eq!(parsed, BlendMode::SoftLight);
    }

    #[test]
    fn all_modes_are_distinct() {
        let mut names: Vec<&str> = BlendMode::ALL.iter().map(|m| m.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 27);
    }

    #[test]
    fn program_names_are_reserved() {
        assert_eq!(BlendMode::Multiply.program_name(), "~blend/multiply");
    }

    #[test]
    fn shell_declares_blend_uniforms_and_equation() {
        let src = BlendMode::Overlay.fragment_shader();
        for uniform in [BLEND_IMAGE, BLEND_SIZE, BLEND_OFFSET, BLEND_OPACITY, BLEND_ANGLE] {
            assert!(src.contains(&format!(" {uniform};")), "missing {uniform}");
        }
        assert!(src.contains("float blendChannel(float b, float s)"));
        assert!(!src.contains("@equation"));
    }

    #[test]
    fn preprocessed_shell_pulls_in_clip_and_mask() {
        let out = Preprocessor::default().preprocess(
            &BlendMode::Normal.fragment_shader(),
            ShaderStage::Fragment,
        );
        assert!(out.source.contains("float clip(const in vec2 v)"));
        assert!(out.source.contains("float mask(vec2 p, float value)"));
        assert!(!out.source.contains("@use"));
    }
}
