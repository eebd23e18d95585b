//! CPU evaluation of the blend pipeline.
//!
//! Mirrors the generated shaders: the same per-channel equations, the same
//! UV transform and the same W3C source-over compositing, in `f32`. Used
//! for single-pixel previews and to pin the shader math in tests.

use glam::Vec2;

use super::BlendMode;
use crate::color::{self, Rgba};

/// Separable blend function `B(Cb, Cs)` for one channel.
///
/// Non-separable modes are evaluated per color by [`blend_color`]; passing
/// one here evaluates it on a grey of that channel.
pub fn blend_channel(mode: BlendMode, b: f32, s: f32) -> f32 {
    use BlendMode::*;
    match mode {
        Normal | Dissolve => s,
        Darken => b.min(s),
        Multiply => b * s,
        ColorBurn => color_burn(b, s),
        LinearBurn => (b + s - 1.0).max(0.0),
        Lighten => b.max(s),
        Screen => screen(b, s),
        ColorDodge => color_dodge(b, s),
        LinearDodge => (b + s).min(1.0),
        Overlay => hard_light(s, b),
        SoftLight => soft_light(b, s),
        HardLight => hard_light(b, s),
        VividLight => {
            if s <= 0.5 {
                color_burn(b, 2.0 * s)
            } else {
                color_dodge(b, 2.0 * s - 1.0)
            }
        }
        LinearLight => (b + 2.0 * s - 1.0).clamp(0.0, 1.0),
        PinLight => {
            if s <= 0.5 {
                b.min(2.0 * s)
            } else {
                b.max(2.0 * s - 1.0)
            }
        }
        HardMix => {
            if b + s >= 1.0 {
                1.0
            } else {
                0.0
            }
        }
        Difference => (b - s).abs(),
        Exclusion => b + s - 2.0 * b * s,
        Subtract => (b - s).max(0.0),
        Divide => {
            if s <= 0.0 {
                if b > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                (b / s).min(1.0)
            }
        }
        DarkerColor | LighterColor | Hue | Saturation | Color | Luminosity => {
            blend_color(mode, [b; 3], [s; 3])[0]
        }
    }
}

/// Blend function `B(Cb, Cs)` on straight RGB colors.
pub fn blend_color(mode: BlendMode, cb: [f32; 3], cs: [f32; 3]) -> [f32; 3] {
    use BlendMode::*;
    match mode {
        DarkerColor => {
            if color::luminosity(cs) < color::luminosity(cb) {
                cs
            } else {
                cb
            }
        }
        LighterColor => {
            if color::luminosity(cs) > color::luminosity(cb) {
                cs
            } else {
                cb
            }
        }
        Hue => color::set_luminosity(
            color::set_saturation(cs, color::saturation(cb)),
            color::luminosity(cb),
        ),
        Saturation => color::set_luminosity(
            color::set_saturation(cb, color::saturation(cs)),
            color::luminosity(cb),
        ),
        Color => color::set_luminosity(cs, color::luminosity(cb)),
        Luminosity => color::set_luminosity(cb, color::luminosity(cs)),
        _ => [0, 1, 2].map(|i| blend_channel(mode, cb[i], cs[i])),
    }
}

fn screen(b: f32, s: f32) -> f32 {
    b + s - b * s
}

fn hard_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b * 2.0 * s
    } else {
        screen(b, 2.0 * s - 1.0)
    }
}

fn soft_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        let d = if b <= 0.25 {
            ((16.0 * b - 12.0) * b + 4.0) * b
        } else {
            b.sqrt()
        };
        b + (2.0 * s - 1.0) * (d - b)
    }
}

fn color_dodge(b: f32, s: f32) -> f32 {
    if b <= 0.0 {
        0.0
    } else if s >= 1.0 {
        1.0
    } else {
        (b / (1.0 - s)).min(1.0)
    }
}

fn color_burn(b: f32, s: f32) -> f32 {
    if b >= 1.0 {
        1.0
    } else if s <= 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - b) / s).min(1.0)
    }
}

/// Screen-space hash used by Dissolve, in [0, 1).
pub fn dissolve_hash(frag_coord: Vec2) -> f32 {
    let x = (frag_coord.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.545;
    x - x.floor()
}

/// `1.0` inside the unit square (inclusive lower, exclusive upper edge).
pub fn clip(uv: Vec2) -> f32 {
    let inside = |v: f32| (0.0..1.0).contains(&v);
    if inside(uv.x) && inside(uv.y) {
        1.0
    } else {
        0.0
    }
}

/// Maps normalized output coordinates `p` to source texture coordinates.
///
/// `offset` is the source's top-left corner in pixels divided by the
/// output size; `size` is the drawn size in pixels. Rotation by `angle`
/// radians is about the source's center.
pub fn source_uv(p: Vec2, resolution: Vec2, size: Vec2, offset: Vec2, angle: f32) -> Vec2 {
    let mut uv = p;
    uv.x -= offset.x;
    uv.y += offset.y - 1.0 + size.y / resolution.y;
    uv *= resolution / size;
    if angle != 0.0 {
        let centered = uv - Vec2::splat(0.5);
        uv = Vec2::from_angle(angle).rotate(centered) + Vec2::splat(0.5);
    }
    uv
}

/// Composites one premultiplied source texel over a premultiplied backdrop.
///
/// `coverage` is clip times opacity; `frag_coord` feeds the Dissolve hash.
pub fn composite(mode: BlendMode, dst: [f32; 4], src: [f32; 4], coverage: f32, frag_coord: Vec2) -> [f32; 4] {
    if coverage <= 0.0 {
        return dst;
    }
    let mut src = src.map(|c| c * coverage);

    if mode == BlendMode::Dissolve {
        let keep = if src[3] >= dissolve_hash(frag_coord) { 1.0 } else { 0.0 };
        src = if src[3] > 0.0 {
            [src[0] / src[3] * keep, src[1] / src[3] * keep, src[2] / src[3] * keep, keep]
        } else {
            [0.0; 4]
        };
    }

    let unpremultiply = |c: [f32; 4]| {
        if c[3] > 0.0 {
            [c[0] / c[3], c[1] / c[3], c[2] / c[3]]
        } else {
            [0.0; 3]
        }
    };
    let cb = unpremultiply(dst);
    let cs = unpremultiply(src);
    let b = blend_color(mode, cb, cs);

    let (sa, da) = (src[3], dst[3]);
    let mut out = [0.0; 4];
    for i in 0..3 {
        let mixed = (1.0 - da) * cs[i] + da * b[i];
        out[i] = sa * mixed + (1.0 - sa) * dst[i];
    }
    out[3] = sa + da * (1.0 - sa);
    out
}

/// Blends two straight colors at one pixel with the given opacity.
pub fn blend_pixel(mode: BlendMode, backdrop: Rgba, source: Rgba, opacity: f32) -> Rgba {
    let out = composite(
        mode,
        backdrop.premultiplied(),
        source.premultiplied(),
        opacity.clamp(0.0, 1.0),
        Vec2::splat(0.5),
    );
    Rgba::from_premultiplied(out)
}
