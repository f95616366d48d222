//! The trait seam for the external tensor-graph model.
//!
//! vefgpt never implements transformer math. The caller injects an object
//! that owns the parameter slots and the forward pass; this crate fills the
//! slots from the archive and drives the token loop.

use anyhow::Result;
use ndarray::Array1;

pub use vefgpt_weights::{SlotSpec, TensorData};

/// End-of-text token id shared by all GPT-2 variants (also BOS and PAD).
pub const GPT2_EOT: u32 = 50256;

/// An autoregressive tensor-graph model with named, shaped weight slots.
///
/// The slot half mirrors the archive side: [`slots`](GraphModel::slots)
/// enumerates every parameter location, and
/// [`assign`](GraphModel::assign) mutates one in place with a
/// shape-matched tensor. The forward half produces next-token logits for a
/// token prefix; everything underneath (attention, caching, devices) is the
/// implementation's business.
pub trait GraphModel: Send {
    /// Every weight slot of the model, in assignment order.
    fn slots(&self) -> Vec<SlotSpec>;

    /// Assigns a shape-matched tensor into the named slot.
    fn assign(&mut self, name: &str, tensor: TensorData) -> Result<()>;

    /// Returns logits over the vocabulary for the next position.
    fn forward_next(&mut self, tokens: &[u32]) -> Result<Array1<f32>>;

    fn vocab_size(&self) -> usize;

    /// Maximum sequence length the model can attend over.
    fn context_size(&self) -> usize;

    fn eos_token_id(&self) -> Option<u32> {
        Some(GPT2_EOT)
    }
}
