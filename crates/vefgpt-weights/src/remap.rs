//! Slot-name to archive-name translation and shape adaptation.
//!
//! GPT-2 TensorFlow archives store tensors under TF scope paths like
//! `/transformer/tfgp_t2lm_head_model/transformer/h_._0/attn/c_attn/weight:0`,
//! while the runtime model names its slots in the
//! `transformer/h/0/attn/c_attn/kernel` convention. The bridge is a fixed,
//! ordered sequence of substring rewrites plus two shape rules applied after
//! lookup. The mapping is one-directional: slot name in, archive path out.

use anyhow::{anyhow, Result};

use crate::tensor::TensorData;

/// Archive path prefix shared by every tensor in the model archive.
pub const ARCHIVE_PREFIX: &str = "/transformer/tfgp_t2lm_head_model/";

/// TensorFlow variable suffix appended to every archive path.
pub const TENSOR_SUFFIX: &str = ":0";

/// Substring marking the tied output projection in slot names.
pub const OUTPUT_HEAD_MARKER: &str = "lm_head";

/// A named, shaped parameter slot of the runtime model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl SlotSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Translates a runtime slot name into its archive path.
///
/// The rewrites are applied in this exact order:
///
/// 1. `/h/` → `/h_._` (per-layer scope convention)
/// 2. `kernel` → `weight` (linear-layer parameter naming)
/// 3. `wte/embeddings` → `wte/weight` (embedding table naming)
/// 4. `lm_head` → `transformer/wte` (tied output projection aliasing)
///
/// then [`TENSOR_SUFFIX`] is appended and [`ARCHIVE_PREFIX`] prepended.
pub fn remap_name(slot_name: &str) -> String {
    let name = slot_name
        .replace("/h/", "/h_._")
        .replace("kernel", "weight")
        .replace("wte/embeddings", "wte/weight")
        .replace("lm_head", "transformer/wte");
    format!("{}{}{}", ARCHIVE_PREFIX, name, TENSOR_SUFFIX)
}

/// Adapts an archive tensor to the shape its target slot expects.
///
/// Two rules, applied in order:
///
/// - Output-head transpose: when the *slot* name contains
///   [`OUTPUT_HEAD_MARKER`], the stored 2-D tensor is the transposed view of
///   the tied embedding table and is transposed back before assignment.
/// - Leading-axis squeeze: some archives store rank-1 parameters as `[1, n]`;
///   when the slot expects rank 1, that leading axis is dropped.
///
/// Anything still shape-mismatched afterwards is an error; the caller records
/// it as a per-slot failure.
pub fn adapt_tensor(slot: &SlotSpec, tensor: TensorData) -> Result<TensorData> {
    let mut tensor = tensor;

    if slot.name.contains(OUTPUT_HEAD_MARKER) {
        tensor = transpose_2d(tensor)?;
    }

    if slot.shape.len() == 1 && tensor.rank() == 2 {
        if tensor.shape[0] != 1 {
            return Err(anyhow!(
                "cannot squeeze tensor '{}' of shape {:?} into rank-1 slot '{}'",
                tensor.name,
                tensor.shape,
                slot.name
            ));
        }
        tensor.shape = vec![tensor.shape[1]];
    }

    if tensor.shape != slot.shape {
        return Err(anyhow!(
            "tensor '{}' has shape {:?} but slot '{}' expects {:?}",
            tensor.name,
            tensor.shape,
            slot.name,
            slot.shape
        ));
    }

    Ok(tensor)
}

fn transpose_2d(tensor: TensorData) -> Result<TensorData> {
    let array = tensor.to_array2()?;
    let transposed = array.t().as_standard_layout().to_owned();
    let shape = vec![transposed.nrows(), transposed.ncols()];
    let data = transposed.into_raw_vec();
    TensorData::new(tensor.name, shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_index_convention() {
        assert_eq!(
            remap_name("transformer/h/0/attn/c_attn/kernel"),
            "/transformer/tfgp_t2lm_head_model/transformer/h_._0/attn/c_attn/weight:0"
        );
    }

    #[test]
    fn test_bias_keeps_its_name() {
        assert_eq!(
            remap_name("transformer/h/11/mlp/c_proj/bias"),
            "/transformer/tfgp_t2lm_head_model/transformer/h_._11/mlp/c_proj/bias:0"
        );
    }

    #[test]
    fn test_embedding_table_rename() {
        assert_eq!(
            remap_name("transformer/wte/embeddings"),
            "/transformer/tfgp_t2lm_head_model/transformer/wte/weight:0"
        );
    }

    #[test]
    fn test_output_head_aliases_to_embedding() {
        // The tied output projection reads from the embedding table.
        assert_eq!(
            remap_name("lm_head/kernel"),
            "/transformer/tfgp_t2lm_head_model/transformer/wte/weight:0"
        );
        assert_eq!(remap_name("lm_head/kernel"), remap_name("transformer/wte/embeddings"));
    }

    #[test]
    fn test_position_embeddings_pass_through() {
        assert_eq!(
            remap_name("transformer/wpe/embeddings"),
            "/transformer/tfgp_t2lm_head_model/transformer/wpe/embeddings:0"
        );
    }

    #[test]
    fn test_remap_is_deterministic() {
        let name = "transformer/h/3/attn/c_proj/kernel";
        assert_eq!(remap_name(name), remap_name(name));
    }

    #[test]
    fn test_squeeze_leading_axis() {
        let slot = SlotSpec::new("transformer/h/0/attn/c_attn/bias", vec![3]);
        let t = TensorData::new("b", vec![1, 3], vec![0.1, 0.2, 0.3]).unwrap();

        let adapted = adapt_tensor(&slot, t).unwrap();
        assert_eq!(adapted.shape, vec![3]);
        assert_eq!(adapted.data, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_squeeze_rejects_non_unit_axis() {
        let slot = SlotSpec::new("transformer/h/0/attn/c_attn/bias", vec![3]);
        let t = TensorData::new("b", vec![2, 3], vec![0.0; 6]).unwrap();

        assert!(adapt_tensor(&slot, t).is_err());
    }

    #[test]
    fn test_output_head_transpose() {
        let slot = SlotSpec::new("lm_head/kernel", vec![2, 3]);
        let t = TensorData::new("w", vec![3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        let adapted = adapt_tensor(&slot, t).unwrap();
        assert_eq!(adapted.shape, vec![2, 3]);
        assert_eq!(adapted.data, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_non_head_slot_is_not_transposed() {
        let slot = SlotSpec::new("transformer/wte/embeddings", vec![3, 2]);
        let t = TensorData::new("w", vec![3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        let adapted = adapt_tensor(&slot, t).unwrap();
        assert_eq!(adapted.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let slot = SlotSpec::new("transformer/wte/embeddings", vec![4, 2]);
        let t = TensorData::new("w", vec![3, 2], vec![0.0; 6]).unwrap();

        let err = adapt_tensor(&slot, t).unwrap_err().to_string();
        assert!(err.contains("expects"));
    }
}
