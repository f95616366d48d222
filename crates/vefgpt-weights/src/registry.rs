//! Supported GPT-2 variants with metadata and cache locations.

use std::path::PathBuf;

use strum_macros::EnumIter;

use crate::utils::levenshtein;

/// Weight archive file name inside HuggingFace repositories.
pub const WEIGHTS_FILE: &str = "tf_model.h5";

/// The GPT-2 variants this crate knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ModelType {
    Gpt2,
    Gpt2Medium,
    Gpt2Large,
}

/// Download URLs for all required model files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// URL to the TensorFlow weight archive.
    pub weights_url: &'static str,
    /// URL to tokenizer configuration.
    pub tokenizer_url: &'static str,
}

/// Complete metadata for a supported variant.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Download URLs for all model files.
    pub paths: ModelPaths,
    /// Human-readable description.
    pub description: &'static str,
    /// Approximate archive size in megabytes.
    pub size_mb: usize,
    /// Exact parameter count of the full weight set.
    pub total_params: u64,
}

impl ModelType {
    /// Get the CLI-friendly slug, which is also the HuggingFace repo name.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Gpt2 => "gpt2",
            Self::Gpt2Medium => "gpt2-medium",
            Self::Gpt2Large => "gpt2-large",
        }
    }

    pub fn info(&self) -> ModelInfo {
        match self {
            Self::Gpt2 => ModelInfo {
                paths: ModelPaths {
                    weights_url: "https://huggingface.co/gpt2/resolve/main/tf_model.h5",
                    tokenizer_url: "https://huggingface.co/gpt2/resolve/main/tokenizer.json",
                },
                description: "GPT-2 small: general-purpose text generator.",
                size_mb: 498,
                total_params: 124_439_808,
            },

            Self::Gpt2Medium => ModelInfo {
                paths: ModelPaths {
                    weights_url: "https://huggingface.co/gpt2-medium/resolve/main/tf_model.h5",
                    tokenizer_url: "https://huggingface.co/gpt2-medium/resolve/main/tokenizer.json",
                },
                description: "GPT-2 medium: better coherence, ~3x the weights of small.",
                size_mb: 1420,
                total_params: 355_355_392,
            },

            Self::Gpt2Large => ModelInfo {
                paths: ModelPaths {
                    weights_url: "https://huggingface.co/gpt2-large/resolve/main/tf_model.h5",
                    tokenizer_url: "https://huggingface.co/gpt2-large/resolve/main/tokenizer.json",
                },
                description: "GPT-2 large: strongest of the three, slow on modest hardware.",
                size_mb: 3090,
                total_params: 774_650_112,
            },
        }
    }

    /// Exact parameter count, used as the progress denominator while loading.
    pub fn total_params(&self) -> u64 {
        self.info().total_params
    }

    pub fn from_cli_name(name: &str) -> Option<ModelType> {
        use strum::IntoEnumIterator;
        let normalized = name.to_lowercase();
        ModelType::iter().find(|m| m.cli_name() == normalized)
    }

    /// Resolves a user-supplied name, suggesting close matches on failure.
    pub fn resolve(name: &str) -> Result<ModelType, String> {
        if let Some(m) = Self::from_cli_name(name) {
            return Ok(m);
        }

        // Try substring match first
        let all_names: Vec<&str> = ModelType::all().map(|m| m.cli_name()).collect();
        let substring_matches: Vec<&str> = all_names
            .iter()
            .filter(|n| n.contains(&name.to_lowercase()))
            .copied()
            .collect();

        if !substring_matches.is_empty() {
            return Err(format!(
                "Unknown model '{name}'. Did you mean: {}?",
                substring_matches.join(", ")
            ));
        }

        // Fall back to Levenshtein
        let suggestions = levenshtein::find_similar(name, &all_names, 3, 0.4);
        if suggestions.is_empty() {
            Err(format!("Unknown model '{name}'"))
        } else {
            let names: Vec<&str> = suggestions.iter().map(|(n, _)| n.as_str()).collect();
            Err(format!(
                "Unknown model '{name}'. Did you mean: {}?",
                names.join(", ")
            ))
        }
    }

    pub fn all() -> impl Iterator<Item = ModelType> {
        use strum::IntoEnumIterator;
        ModelType::iter()
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

/// Returns the default cache directory for vefgpt weight files.
pub fn get_default_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VEFGPT_CACHE_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::cache_dir()
            .expect("No cache directory found on system")
            .join("vefgpt")
    }
}

/// Formats a parameter count in human-readable form.
pub fn format_params(params: u64) -> String {
    if params >= 1_000_000_000 {
        format!("{:.1}B", params as f64 / 1_000_000_000.0)
    } else {
        format!("{:.1}M", params as f64 / 1_000_000.0)
    }
}

/// Formats a file size in human-readable form.
pub fn format_size(mb: usize) -> String {
    if mb >= 1000 {
        format!("{:.1} GB", mb as f64 / 1000.0)
    } else {
        format!("{} MB", mb)
    }
}
