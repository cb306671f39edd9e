//! Engineering knobs that are not part of the inference semantics proper.
//!
//! Grounded on the teacher's use of `toml`-backed manifest config: a plain
//! `serde`-derived struct with a `Default` impl and a `from_toml_str`
//! constructor, no builder ceremony.

use serde::{Deserialize, Serialize};

use crate::semantic_graph::analysis::analysis_engine::DEFAULT_MAX_FIXED_POINT_ITERATIONS;

/// Configuration for one run of the pipeline.
///
/// None of these fields change what a well-formed program's ownership
/// assignment *is* — they bound how hard the fixed-point passes try, and
/// whether two Non-goal-adjacent conveniences (clone insertion, trailing nop
/// trimming) are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Iteration cap for every SCC fixed point this core runs (the
    /// "safety valve" spec §5 requires). Exceeding it is a
    /// [`crate::error_codes::CoreError::ConvergenceFailure`], not a panic,
    /// in release builds.
    pub max_fixed_point_iterations: u32,

    /// Whether ownership inference (Component I) is allowed to resolve a
    /// use-site conflict by inserting a clone, rather than failing with
    /// [`crate::error_codes::CoreError::CloneRequired`]. Disabling this is
    /// useful for callers that want to treat every clone as a hard error.
    pub allow_clone_insertion: bool,

    /// Whether the normalizer (Component J) drops trailing `Nop` entries
    /// from a path's member list. Resolves the Open Question in spec.md §9:
    /// on by default, matching the reference implementation.
    pub trim_trailing_nops: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_fixed_point_iterations: DEFAULT_MAX_FIXED_POINT_ITERATIONS,
            allow_clone_insertion: true,
            trim_trailing_nops: true,
        }
    }
}

impl InferenceConfig {
    /// Parses a config from TOML text, falling back to [`Default`] for any
    /// field the document omits.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = InferenceConfig::default();
        assert_eq!(config.max_fixed_point_iterations, DEFAULT_MAX_FIXED_POINT_ITERATIONS);
        assert!(config.allow_clone_insertion);
        assert!(config.trim_trailing_nops);
    }

    #[test]
    fn partial_toml_document_falls_back_to_defaults() {
        let config = InferenceConfig::from_toml_str("allow_clone_insertion = false\n").unwrap();
        assert!(!config.allow_clone_insertion);
        assert!(config.trim_trailing_nops);
        assert_eq!(config.max_fixed_point_iterations, DEFAULT_MAX_FIXED_POINT_ITERATIONS);
    }
}
