//! Full-screen quad geometry and the default pass-through shaders.
//!
//! Every program draws the same two triangles covering clip space from a
//! 2-component `position` attribute. The preprocessor declares `position`
//! as `vec3`; the missing `z` reads as `0.0`.

/// Two triangles covering clip space, as `(x, y)` pairs.
pub const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    -1.0, 1.0, //
    1.0, -1.0, //
    1.0, 1.0, //
];

/// Components per vertex in [`QUAD_VERTICES`].
pub const QUAD_COMPONENTS: i32 = 2;

/// Vertices drawn per pass.
pub const QUAD_VERTEX_COUNT: i32 = 6;

/// Vertex shader used when a program supplies none.
pub const DEFAULT_VERTEX_SHADER: &str = "void main() {
  gl_Position = vec4(position, 1.0);
}";

/// Fragment shader that copies `iTexture` unchanged.
pub const DEFAULT_FRAGMENT_SHADER: &str = "void main() {
  vec2 p = gl_FragCoord.xy / iResolution;
  gl_FragColor = texture2D(iTexture, p);
}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_has_six_vertices() {
        assert_eq!(
            QUAD_VERTICES.len() as i32,
            QUAD_VERTEX_COUNT * QUAD_COMPONENTS
        );
    }

    #[test]
    fn quad_covers_clip_space_corners() {
        let points: Vec<(f32, f32)> = QUAD_VERTICES.chunks(2).map(|p| (p[0], p[1])).collect();
        for corner in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            assert!(points.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn default_vertex_shader_uses_position_attribute() {
        assert!(DEFAULT_VERTEX_SHADER.contains("vec4(position, 1.0)"));
    }

    #[test]
    fn default_fragment_shader_samples_primary_texture() {
        assert!(
            DEFAULT_FRAGMENT_SHADER.contains("texture2D(iTexture, p)"),
            "expected iTexture sample in:\n{DEFAULT_FRAGMENT_SHADER}"
        );
    }
}
