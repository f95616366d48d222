//! The weight-loading sweep: remap, read, adapt, assign — one slot at a time.
//!
//! Per-slot failures never abort the sweep; every slot is attempted exactly
//! once and the outcome is aggregated into a [`LoadReport`]. Whether a
//! partial load is acceptable is the caller's decision, made once at the end
//! rather than silently per slot.

use log::{debug, warn};

use vefgpt_weights::{adapt_tensor, remap_name, WeightArchive};

use crate::model::GraphModel;

/// Where the load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Downloading the weight archive.
    FetchingWeights,
    /// Weight archive served from the blob store.
    CacheHit,
    /// Downloading the tokenizer configuration.
    FetchingTokenizer,
    /// Parsing the archive container.
    OpeningArchive,
    /// Assigning tensors into model slots.
    LoadingSlot,
    /// All slots attempted.
    Done,
}

/// Progress update emitted while loading.
#[derive(Debug, Clone)]
pub struct Progress {
    pub stage: LoadStage,
    /// Parameters assigned so far; monotonically non-decreasing.
    pub params_loaded: u64,
    /// The variant's fixed total-parameter count.
    pub params_total: u64,
    pub message: Option<String>,
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// One slot that could not be loaded.
#[derive(Debug, Clone)]
pub struct SlotFailure {
    /// Runtime slot name.
    pub slot: String,
    /// The archive path the slot was remapped to.
    pub archive_path: String,
    /// What went wrong: missing path, shape mismatch, assignment error.
    pub error: String,
}

/// Aggregate outcome of a load sweep.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Slots successfully assigned.
    pub slots_loaded: usize,
    /// Sum of assigned tensor sizes.
    pub params_loaded: u64,
    /// The variant's fixed total-parameter count.
    pub params_total: u64,
    /// Every slot that was attempted and failed.
    pub failures: Vec<SlotFailure>,
}

impl LoadReport {
    /// True iff every slot received its tensor.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Attempts every model slot against the archive.
///
/// Transition from slot *i* to slot *i+1* happens whether or not slot *i*
/// succeeded. Yields to the runtime after each assignment so other tasks can
/// interleave with what is otherwise a long CPU/IO burst.
pub(crate) async fn load_weights(
    model: &mut dyn GraphModel,
    archive: &dyn WeightArchive,
    params_total: u64,
    progress: Option<&ProgressCallback>,
) -> LoadReport {
    let mut report = LoadReport {
        params_total,
        ..Default::default()
    };

    for slot in model.slots() {
        let archive_path = remap_name(&slot.name);

        let result = archive
            .get(&archive_path)
            .and_then(|tensor| adapt_tensor(&slot, tensor))
            .and_then(|tensor| {
                let params = tensor.len() as u64;
                model.assign(&slot.name, tensor)?;
                Ok(params)
            });

        match result {
            Ok(params) => {
                report.slots_loaded += 1;
                report.params_loaded += params;
                debug!(
                    "loaded weight {} {:?} from {}",
                    slot.name, slot.shape, archive_path
                );
            }
            Err(e) => {
                warn!("error loading weight {}: {:#}", archive_path, e);
                report.failures.push(SlotFailure {
                    slot: slot.name.clone(),
                    archive_path,
                    error: e.to_string(),
                });
            }
        }

        if let Some(callback) = progress {
            callback(Progress {
                stage: LoadStage::LoadingSlot,
                params_loaded: report.params_loaded,
                params_total,
                message: Some(slot.name.clone()),
            });
        }

        tokio::task::yield_now().await;
    }

    report
}
