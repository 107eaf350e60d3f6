// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared GLSL snippets that blocks can inline into a stage.

use serde::{Deserialize, Serialize};

const HELPER_FUNCTIONS: &str = "\
const float PI = 3.1415926535897932384626433832795;
const float LinearEncodePowerApprox = 2.2;
const float GammaEncodePowerApprox = 1.0 / LinearEncodePowerApprox;
const vec3 LuminanceEncodeApprox = vec3(0.2126, 0.7152, 0.0722);

float getRand(vec2 seed) {
    return fract(sin(dot(seed.xy, vec2(12.9898, 78.233))) * 43758.5453);
}

vec3 toLinearSpace(vec3 color) {
    return pow(color, vec3(LinearEncodePowerApprox));
}

vec4 toLinearSpace(vec4 color) {
    return vec4(pow(color.rgb, vec3(LinearEncodePowerApprox)), color.a);
}

vec3 toGammaSpace(vec3 color) {
    return pow(color, vec3(GammaEncodePowerApprox));
}

vec4 toGammaSpace(vec4 color) {
    return vec4(pow(color.rgb, vec3(GammaEncodePowerApprox)), color.a);
}

float getLuminance(vec3 color) {
    return clamp(dot(color, LuminanceEncodeApprox), 0.0, 1.0);
}
";

const FRESNEL_FUNCTION: &str = "\
#ifdef FRESNEL
float computeFresnelTerm(vec3 viewDirection, vec3 worldNormal, float bias, float power) {
    float fresnelTerm = pow(bias + abs(dot(viewDirection, worldNormal)), power);
    return clamp(fresnelTerm, 0.0, 1.0);
}
#endif
";

/// Source of a named include, if it exists
pub fn include_source(name: &str) -> Option<&'static str> {
    match name {
        "helperFunctions" => Some(HELPER_FUNCTIONS),
        "fresnelFunction" => Some(FRESNEL_FUNCTION),
        _ => None,
    }
}

/// Filters applied to an include before it is inlined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitFunctionFromIncludeOptions {
    /// Registry key suffix, lets the same include be inlined more than once
    pub repeat_key: Option<String>,
    /// Drop preprocessor conditionals (`#ifdef`, `#else`, `#endif`, ...)
    pub remove_if_def: bool,
    /// Drop `attribute` declarations
    pub remove_attributes: bool,
    /// Drop `uniform` declarations
    pub remove_uniforms: bool,
    /// Drop `varying` declarations
    pub remove_varyings: bool,
    /// Plain text replacements, applied in order
    pub replace_strings: Vec<(String, String)>,
}

impl EmitFunctionFromIncludeOptions {
    /// Apply the filters to a snippet
    pub fn apply(&self, source: &str) -> String {
        let mut code = String::with_capacity(source.len());
        for line in source.lines() {
            let trimmed = line.trim_start();
            let drop = (self.remove_if_def && is_conditional(trimmed))
                || (self.remove_attributes && trimmed.starts_with("attribute "))
                || (self.remove_uniforms && trimmed.starts_with("uniform "))
                || (self.remove_varyings && trimmed.starts_with("varying "));
            if !drop {
                code.push_str(line);
                code.push('\n');
            }
        }

        for (from, to) in &self.replace_strings {
            code = code.replace(from.as_str(), to);
        }
        code
    }
}

fn is_conditional(line: &str) -> bool {
    ["#if", "#else", "#elif", "#endif"]
        .iter()
        .any(|directive| line.starts_with(directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_includes() {
        assert!(include_source("helperFunctions")
            .unwrap()
            .contains("float getRand(vec2 seed)"));
        assert!(include_source("fresnelFunction").is_some());
        assert!(include_source("pbrFunctions").is_none());
    }

    #[test]
    fn test_remove_if_def() {
        let options = EmitFunctionFromIncludeOptions {
            remove_if_def: true,
            ..Default::default()
        };
        let code = options.apply(include_source("fresnelFunction").unwrap());
        assert!(!code.contains("#ifdef"));
        assert!(!code.contains("#endif"));
        assert!(code.contains("computeFresnelTerm"));
    }

    #[test]
    fn test_line_filters_and_replacements() {
        let source = "attribute vec3 position;\nuniform mat4 world;\nvarying vec2 vUV;\nfloat x = VALUE;\n";
        let options = EmitFunctionFromIncludeOptions {
            remove_attributes: true,
            remove_uniforms: true,
            remove_varyings: true,
            replace_strings: vec![("VALUE".into(), "1.0".into())],
            ..Default::default()
        };
        assert_eq!(options.apply(source), "float x = 1.0;\n");
    }
}
