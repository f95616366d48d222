//! Loads GPT-2 small into a toy graph model and generates a few tokens.
//!
//! The model below is a stand-in for a real tensor-graph runtime: it declares
//! a handful of real GPT-2 slots so the weight pipeline runs end-to-end, but
//! its forward pass is a trivial deterministic function. Swap in an actual
//! transformer implementation of `GraphModel` to get real text.
//!
//! ```bash
//! cargo run --example generate -- "The meaning of life is"
//! ```

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use ndarray::Array1;

use vefgpt::{format_params, GenerateOptions, GraphModel, Gpt2Session, SlotSpec, TensorData};

struct ToyGraph {
    assigned: HashMap<String, TensorData>,
}

impl ToyGraph {
    fn new() -> Self {
        Self {
            assigned: HashMap::new(),
        }
    }
}

impl GraphModel for ToyGraph {
    fn slots(&self) -> Vec<SlotSpec> {
        vec![
            SlotSpec::new("transformer/wte/embeddings", vec![50257, 768]),
            SlotSpec::new("transformer/h/0/attn/c_attn/bias", vec![2304]),
            SlotSpec::new("transformer/h/0/mlp/c_fc/kernel", vec![768, 3072]),
            SlotSpec::new("lm_head/kernel", vec![768, 50257]),
        ]
    }

    fn assign(&mut self, name: &str, tensor: TensorData) -> Result<()> {
        self.assigned.insert(name.to_string(), tensor);
        Ok(())
    }

    fn forward_next(&mut self, tokens: &[u32]) -> Result<Array1<f32>> {
        let wte = self
            .assigned
            .get("transformer/wte/embeddings")
            .ok_or_else(|| anyhow!("embeddings not loaded"))?;

        // Nonsense scoring, but it does read the loaded weights.
        let last = tokens.last().copied().unwrap_or(0) as usize;
        let row = &wte.data[last * 768..(last + 1) * 768];
        let seed: f32 = row.iter().take(16).sum();

        let mut logits = Array1::zeros(self.vocab_size());
        let next = (last + 1 + seed.abs() as usize) % self.vocab_size();
        logits[next] = 1.0;
        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        50257
    }

    fn context_size(&self) -> usize {
        1024
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello".to_string());

    let mut session = Gpt2Session::builder("gpt2")
        .on_progress(|p| {
            eprintln!(
                "[{:?}] {} / {}",
                p.stage,
                format_params(p.params_loaded),
                format_params(p.params_total)
            );
        })
        .load(ToyGraph::new())
        .await?;

    let options = GenerateOptions {
        input: prompt,
        max_length: 16,
        temperature: 0.0,
        ..Default::default()
    };

    let text = session.generate(&options).await?;
    println!("{}", text);
    Ok(())
}
