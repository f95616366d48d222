//! Shared fakes for unit tests: an in-memory archive, a slot-recording
//! model, and a tiny word-level tokenizer.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use ndarray::Array1;
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::Tokenizer;

use vefgpt_weights::{ArchiveEntry, SlotSpec, TensorData, WeightArchive};

use crate::model::GraphModel;

/// An in-memory weight archive backed by a path map.
#[derive(Debug, Default)]
pub(crate) struct MockArchive {
    tensors: HashMap<String, TensorData>,
}

impl MockArchive {
    pub fn insert(&mut self, path: &str, tensor: TensorData) {
        self.tensors.insert(path.to_string(), tensor);
    }
}

impl WeightArchive for MockArchive {
    fn get(&self, path: &str) -> Result<TensorData> {
        self.tensors
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("tensor '{}' not found in archive", path))
    }

    fn contains(&self, path: &str) -> bool {
        self.tensors.contains_key(path)
    }

    fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        Ok(self
            .tensors
            .iter()
            .map(|(path, t)| ArchiveEntry {
                path: path.clone(),
                shape: t.shape.clone(),
            })
            .collect())
    }
}

/// A deterministic stand-in for the external tensor-graph model.
///
/// Records every assignment for inspection and walks the vocabulary one id
/// at a time on the forward pass.
#[derive(Debug)]
pub(crate) struct StubModel {
    slots: Vec<SlotSpec>,
    assigned: HashMap<String, TensorData>,
    vocab: usize,
    context: usize,
    eos: Option<u32>,
}

impl StubModel {
    pub fn new(slots: Vec<SlotSpec>) -> Self {
        Self {
            slots,
            assigned: HashMap::new(),
            vocab: 8,
            context: 32,
            eos: None,
        }
    }

    pub fn with_eos(mut self, eos: Option<u32>) -> Self {
        self.eos = eos;
        self
    }

    pub fn push_slot(&mut self, slot: SlotSpec) {
        self.slots.push(slot);
    }

    pub fn assigned(&self, name: &str) -> Option<&TensorData> {
        self.assigned.get(name)
    }
}

impl GraphModel for StubModel {
    fn slots(&self) -> Vec<SlotSpec> {
        self.slots.clone()
    }

    fn assign(&mut self, name: &str, tensor: TensorData) -> Result<()> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow!("no slot named '{}'", name))?;
        if tensor.shape != slot.shape {
            return Err(anyhow!(
                "slot '{}' expects shape {:?}, got {:?}",
                name,
                slot.shape,
                tensor.shape
            ));
        }
        self.assigned.insert(name.to_string(), tensor);
        Ok(())
    }

    fn forward_next(&mut self, tokens: &[u32]) -> Result<Array1<f32>> {
        let last = tokens.last().copied().unwrap_or(0);
        let next = (last as usize + 1) % self.vocab;
        let mut logits = Array1::zeros(self.vocab);
        logits[next] = 1.0;
        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        self.vocab
    }

    fn context_size(&self) -> usize {
        self.context
    }

    fn eos_token_id(&self) -> Option<u32> {
        self.eos
    }
}

/// Builds a word-level tokenizer with tokens `t0..t{n-1}` mapped to ids
/// `0..n-1`.
pub(crate) fn tiny_tokenizer(n: usize) -> Tokenizer {
    let mut vocab: HashMap<String, u32> = (0..n).map(|i| (format!("t{}", i), i as u32)).collect();
    vocab.insert("<unk>".to_string(), n as u32);

    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token("<unk>".to_string())
        .build()
        .expect("word-level vocab");

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_pre_tokenizer(Whitespace {});
    tokenizer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_tokenizer_roundtrip() {
        let tokenizer = tiny_tokenizer(8);

        let encoding = tokenizer.encode("t0 t3", false).unwrap();
        assert_eq!(encoding.get_ids(), &[0, 3]);

        let text = tokenizer.decode(&[0, 3], false).unwrap();
        assert_eq!(text, "t0 t3");
    }
}
