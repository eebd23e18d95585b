//! Shader preprocessor: standard prefix, `@use` import expansion and the
//! output-to-input line map used to report compile errors against the
//! caller's source.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::imports;
use crate::render::ShaderStage;

const PRECISION_PREFIX: &str = "precision mediump float;\nprecision mediump int;\n";
const USE_DIRECTIVE: &str = "@use ";

/// Preprocessed shader text plus its line map.
///
/// `line_map` maps 1-based output lines to 1-based input lines. Prefix
/// lines, expanded import text and `@use` directive lines have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preprocessed {
    pub source: String,
    pub line_map: BTreeMap<usize, usize>,
}

impl Preprocessed {
    /// Input line for an output line; `0` when the line is not mapped.
    pub fn source_line(&self, output_line: usize) -> usize {
        self.line_map.get(&output_line).copied().unwrap_or(0)
    }
}

/// Import table and prefix settings.
///
/// Caller-registered imports shadow built-ins with the same name; the
/// last registration wins.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    imports: HashMap<String, String>,
    mask_support: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Preprocessor {
    pub fn new(mask_support: bool) -> Self {
        Self {
            imports: HashMap::new(),
            mask_support,
        }
    }

    pub fn mask_support(&self) -> bool {
        self.mask_support
    }

    /// Registers or replaces a caller import.
    pub fn register_import(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.imports.insert(name.into(), source.into());
    }

    /// Removes a caller import. Returns whether it existed. A built-in with
    /// the same name becomes visible again.
    pub fn deregister_import(&mut self, name: &str) -> bool {
        self.imports.remove(name).is_some()
    }

    /// Resolves an import name, caller table first.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.imports
            .get(name)
            .map(String::as_str)
            .or_else(|| imports::builtin(name, self.mask_support))
    }

    /// Every resolvable import name, sorted.
    pub fn import_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .imports
            .keys()
            .map(String::as_str)
            .chain(imports::BUILTIN_NAMES)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// The text prepended to every shader of `stage`.
    pub fn prefix(&self, stage: ShaderStage) -> String {
        let mut prefix = String::from(PRECISION_PREFIX);
        if stage == ShaderStage::Vertex {
            prefix.push_str("attribute vec3 position;\n");
        }
        prefix.push_str("uniform sampler2D iTexture;\n");
        prefix.push_str("uniform vec2 iResolution;\n");
        if self.mask_support {
            prefix.push_str("uniform sampler2D iMask;\n");
            prefix.push_str("uniform bool iMaskEnabled;\n");
        }
        prefix
    }

    /// Prepends the prefix, expands `@use` directives and records the line map.
    ///
    /// Each import is included at most once. Unknown names are dropped
    /// silently. Imported text is not scanned for further directives.
    pub fn preprocess(&self, source: &str, stage: ShaderStage) -> Preprocessed {
        let mut output = self.prefix(stage);
        let mut line_map = BTreeMap::new();
        let mut included: Vec<&str> = Vec::new();
        let mut output_line = output.matches('\n').count() + 1;

        for (index, line) in source.split('\n').enumerate() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix(USE_DIRECTIVE) {
                let name = name.trim();
                if included.contains(&name) {
                    continue;
                }
                if let Some(body) = self.resolve(name) {
                    output.push_str(body);
                    output.push('\n');
                    output_line += body.matches('\n').count() + 1;
                    included.push(name);
                }
                continue;
            }

            output.push_str(line);
            output.push('\n');
            line_map.insert(output_line, index + 1);
            output_line += 1;
        }

        Preprocessed {
            source: output,
            line_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.split('\n').collect()
    }

    #[test]
    fn fragment_prefix_declares_standard_uniforms() {
        let out = Preprocessor::default().preprocess("void main() {}", ShaderStage::Fragment);
        assert!(out.source.starts_with(PRECISION_PREFIX));
        assert!(out.source.contains("uniform sampler2D iTexture;\n"));
        assert!(out.source.contains("uniform vec2 iResolution;\n"));
        assert!(out.source.contains("uniform sampler2D iMask;\n"));
        assert!(out.source.contains("uniform bool iMaskEnabled;\n"));
        assert!(!out.source.contains("attribute"));
    }

    #[test]
    fn vertex_prefix_declares_position_attribute() {
        let out = Preprocessor::default().preprocess("void main() {}", ShaderStage::Vertex);
        assert!(out.source.contains("attribute vec3 position;\n"));
    }

    #[test]
    fn mask_uniforms_omitted_without_support() {
        let out = Preprocessor::new(false).preprocess("", ShaderStage::Fragment);
        assert!(!out.source.contains("iMask"));
    }

    #[test]
    fn line_map_points_at_input_lines() {
        let pre = Preprocessor::default();
        let source = "void main() {\n  gl_FragColor = vec4(1.0);\n}";
        let out = pre.preprocess(source, ShaderStage::Fragment);
        let prefix_lines = pre.prefix(ShaderStage::Fragment).matches('\n').count();

        assert_eq!(out.source_line(prefix_lines + 1), 1);
        assert_eq!(out.source_line(prefix_lines + 2), 2);
        assert_eq!(out.source_line(prefix_lines + 3), 3);
        assert_eq!(out.source_line(1), 0);
    }

    #[test]
    fn use_directive_expands_once_and_is_not_mapped() {
        let mut pre = Preprocessor::default();
        pre.register_import("foo", "float foo() { return 1.0; }");
        let out = pre.preprocess("@use foo\n@use foo\nvoid main() {}", ShaderStage::Fragment);

        assert_eq!(out.source.matches("float foo()").count(), 1);
        assert!(!out.source.contains("@use"));
        assert_eq!(out.line_map.len(), 1);
        assert!(out.line_map.values().all(|&input| input == 3));
    }

    #[test]
    fn unknown_import_is_dropped() {
        let out = Preprocessor::default().preprocess("@use missing\nx", ShaderStage::Fragment);
        assert!(!out.source.contains("missing"));
        assert_eq!(out.line_map.values().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn caller_import_shadows_builtin_and_last_registration_wins() {
        let mut pre = Preprocessor::default();
        pre.register_import("math", "// first");
        pre.register_import("math", "// second");
        let out = pre.preprocess("@use math", ShaderStage::Fragment);
        assert!(out.source.contains("// second"));
        assert!(!out.source.contains("// first"));
        assert!(!out.source.contains("#define PI"));
    }

    #[test]
    fn deregister_restores_builtin() {
        let mut pre = Preprocessor::default();
        pre.register_import("math", "// custom");
        assert!(pre.deregister_import("math"));
        assert!(!pre.deregister_import("math"));
        assert_eq!(pre.resolve("math"), Some(imports::MATH));
    }

    #[test]
    fn imports_are_not_expanded_recursively() {
        let mut pre = Preprocessor::default();
        pre.register_import("outer", "@use math");
        let out = pre.preprocess("@use outer", ShaderStage::Fragment);
        assert!(out.source.contains("@use math"));
        assert!(!out.source.contains("#define PI"));
    }

    #[test]
    fn indented_directive_is_recognised() {
        let out = Preprocessor::default().preprocess("   @use   wrap  ", ShaderStage::Fragment);
        assert!(out.source.contains("float repeat(const in float a)"));
    }

    #[test]
    fn import_names_merge_caller_and_builtin() {
        let mut pre = Preprocessor::default();
        pre.register_import("zeta", "");
        pre.register_import("math", "");
        assert_eq!(
            pre.import_names(),
            vec!["color", "mask", "math", "noise", "wrap", "zeta"]
        );
    }

    #[test]
    fn mapped_lines_hold_the_original_text() {
        let mut pre = Preprocessor::default();
        pre.register_import("two", "a\nb");
        let source = "first\n@use two\nsecond\n@use math\nthird";
        let out = pre.preprocess(source, ShaderStage::Vertex);
        let output = lines(&out.source);
        let input = lines(source);
        for (&o, &i) in &out.line_map {
            assert_eq!(output[o - 1], input[i - 1]);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn shader_line() -> impl Strategy<Value = String> {
            prop_oneof![
                "[a-z ;=(){}.0-9]{0,20}",
                Just("@use math".to_string()),
                Just("@use custom".to_string()),
                Just("@use unknown".to_string()),
            ]
        }

        proptest! {
            #[test]
            fn every_non_directive_line_maps_back_to_itself(
                source_lines in prop::collection::vec(shader_line(), 0..30),
                vertex in any::<bool>(),
            ) {
                let mut pre = Preprocessor::default();
                pre.register_import("custom", "float c() {\n  return 2.0;\n}");
                let stage = if vertex { ShaderStage::Vertex } else { ShaderStage::Fragment };
                let source = source_lines.join("\n");
                let out = pre.preprocess(&source, stage);

                let output: Vec<&str> = out.source.split('\n').collect();
                let input: Vec<&str> = source.split('\n').collect();

                let directive_count = input
                    .iter()
                    .filter(|l| l.trim().starts_with(USE_DIRECTIVE))
                    .count();
                prop_assert_eq!(out.line_map.len(), input.len() - directive_count);

                for (&o, &i) in &out.line_map {
                    prop_assert_eq!(output[o - 1], input[i - 1]);
                }
            }
        }
    }
}
