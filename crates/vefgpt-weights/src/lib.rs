//! Weight infrastructure for vefgpt.
//!
//! This crate owns everything between a weights URL and a tensor ready for
//! assignment into a model slot:
//!
//! - [`store`] — persistent URL-keyed blob cache (`fileStorage`, version 1)
//! - [`download`] — fetch-through-cache HTTP download
//! - [`archive`] — hierarchical weight-archive reader over HDF5
//! - [`remap`] — archive name translation and shape adaptation
//! - [`registry`] — supported GPT-2 variants and their metadata
//!
//! The transformer itself is not here; callers hand each remapped tensor to
//! their own model object.

pub mod archive;
pub mod download;
pub mod registry;
pub mod remap;
pub mod store;
pub mod tensor;
pub mod utils;

pub use archive::{ArchiveEntry, Hdf5Archive, WeightArchive};
pub use download::fetch_and_cache;
pub use registry::{get_default_cache_dir, ModelInfo, ModelPaths, ModelType};
pub use remap::{adapt_tensor, remap_name, SlotSpec};
pub use store::{CachedFile, FileStore};
pub use tensor::TensorData;
