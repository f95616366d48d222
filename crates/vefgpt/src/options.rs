//! Generation options and decoding-strategy resolution.

/// Configuration for the one-call entry point and per-call generation.
///
/// `max_length` bounds the *total* sequence length, prompt included.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Registry name of the variant: `gpt2`, `gpt2-medium` or `gpt2-large`.
    pub model: String,
    /// Prompt text.
    pub input: String,
    /// Maximum total sequence length in tokens.
    pub max_length: usize,
    /// Sampling temperature. Values below 1.0 select the sampling path.
    pub temperature: f32,
    /// Optional top-k filter for the sampling path.
    pub top_k: Option<usize>,
    /// Optional top-p (nucleus) filter for the sampling path.
    pub top_p: Option<f32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "gpt2".to_string(),
            input: String::new(),
            max_length: 64,
            temperature: 1.0,
            top_k: None,
            top_p: None,
        }
    }
}

impl GenerateOptions {
    /// Checks option values, returning a human-readable complaint.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_length == 0 {
            return Err("max_length must be at least 1".to_string());
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(format!("temperature {} is not usable", self.temperature));
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("top_p {} must be within (0, 1]", p));
            }
        }
        Ok(())
    }
}

/// How the next token is selected from the logits.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodingStrategy {
    Greedy,
    Sample(SamplingParams),
}

/// Parameters of the sampling path.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: Option<usize>,
    pub top_p: Option<f32>,
}

/// Maps options onto a decoding strategy.
///
/// Sampling is selected iff `temperature < 1.0`; at or above 1.0 decoding is
/// greedy. A temperature of exactly 0.0 stays on the sampling path but
/// degenerates to argmax inside the sampler.
pub fn resolve_strategy(options: &GenerateOptions) -> DecodingStrategy {
    if options.temperature < 1.0 {
        DecodingStrategy::Sample(SamplingParams {
            temperature: options.temperature,
            top_k: options.top_k,
            top_p: options.top_p,
        })
    } else {
        DecodingStrategy::Greedy
    }
}
