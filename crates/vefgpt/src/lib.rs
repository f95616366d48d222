//! vefgpt — GPT-2 weight loading and streaming generation.
//!
//! This crate glues four things together: a persistent download cache, a
//! hierarchical weight archive, a name/shape remapper, and a token-by-token
//! generation driver. The transformer itself is injected behind the
//! [`GraphModel`] trait; vefgpt fills its weight slots from the archive and
//! runs the autoregressive loop on top of it.
//!
//! # Example
//!
//! ```ignore
//! use vefgpt::{GenerateOptions, Gpt2Session};
//!
//! let mut session = Gpt2Session::builder("gpt2")
//!     .on_progress(|p| eprintln!("{:?} {}/{}", p.stage, p.params_loaded, p.params_total))
//!     .load(my_graph_model)
//!     .await?;
//!
//! let options = GenerateOptions {
//!     input: "Hello".to_string(),
//!     max_length: 32,
//!     temperature: 0.8,
//!     ..Default::default()
//! };
//! let text = session.generate(&options).await?;
//! ```

pub mod error;
pub mod generate;
pub mod loader;
pub mod model;
pub mod options;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use generate::{StreamedToken, TokenType};
pub use loader::{LoadReport, LoadStage, Progress, ProgressCallback, SlotFailure};
pub use model::{GraphModel, GPT2_EOT};
pub use options::{DecodingStrategy, GenerateOptions, SamplingParams};
pub use session::{Gpt2Session, SessionBuilder};
pub use stats::GenerationStats;

// Re-export the weight infrastructure this API is built on.
pub use vefgpt_weights::{
    registry::{format_params, format_size},
    ArchiveEntry, FileStore, Hdf5Archive, ModelInfo, ModelType, SlotSpec, TensorData,
    WeightArchive,
};

/// One-call entry point: build a session for `options.model`, load the
/// weights into `graph`, and generate from `options.input`.
pub async fn generate(graph: impl GraphModel + 'static, options: GenerateOptions) -> Result<String> {
    let mut session = Gpt2Session::builder(options.model.as_str()).load(graph).await?;
    session.generate(&options).await
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
