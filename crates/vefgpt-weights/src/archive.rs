//! Hierarchical weight-archive reader.
//!
//! A weight archive is a tree of groups with named, shaped numeric tensors at
//! the leaves. The format itself is parsed by the `hdf5` crate; this module
//! only wraps it behind a trait so the loader can be driven by any archive
//! implementation (including in-memory fakes in tests).

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::tensor::TensorData;

/// A leaf tensor discovered while walking the archive tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Absolute archive path, `/`-separated.
    pub path: String,
    /// Stored shape; empty for scalars.
    pub shape: Vec<usize>,
}

/// Read access to a hierarchical archive of named tensors.
pub trait WeightArchive: Send {
    /// Reads the tensor at `path` as a flat f32 buffer.
    fn get(&self, path: &str) -> Result<TensorData>;

    /// Whether a tensor exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// Walks the archive and returns every leaf with its shape.
    ///
    /// A node is a leaf iff it has no children.
    fn entries(&self) -> Result<Vec<ArchiveEntry>>;
}

/// An HDF5-backed weight archive (`tf_model.h5` and friends).
#[derive(Debug)]
pub struct Hdf5Archive {
    file: hdf5::File,
}

impl Hdf5Archive {
    /// Opens an archive file read-only.
    ///
    /// There is no validation beyond what the format library performs;
    /// malformed bytes surface here as an open error.
    pub fn open(path: &Path) -> Result<Self> {
        let file = hdf5::File::open(path)
            .with_context(|| format!("failed to open weight archive {:?}", path))?;
        Ok(Self { file })
    }
}

impl WeightArchive for Hdf5Archive {
    fn get(&self, path: &str) -> Result<TensorData> {
        let dataset = self
            .file
            .dataset(path)
            .map_err(|_| anyhow!("tensor '{}' not found in archive", path))?;
        let shape = dataset.shape();
        let data = dataset
            .read_raw::<f32>()
            .with_context(|| format!("failed to read tensor '{}'", path))?;
        TensorData::new(path, shape, data)
    }

    fn contains(&self, path: &str) -> bool {
        self.file.dataset(path).is_ok()
    }

    fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut out = Vec::new();
        walk_group(&self.file, "", &mut out)?;
        Ok(out)
    }
}

fn walk_group(group: &hdf5::Group, prefix: &str, out: &mut Vec<ArchiveEntry>) -> Result<()> {
    for name in group
        .member_names()
        .with_context(|| format!("failed to list members of '{}'", prefix))?
    {
        let path = format!("{}/{}", prefix, name);
        if let Ok(child) = group.group(&name) {
            walk_group(&child, &path, out)?;
        } else {
            let dataset = group
                .dataset(&name)
                .with_context(|| format!("failed to open '{}' as a dataset", path))?;
            out.push(ArchiveEntry {
                path,
                shape: dataset.shape(),
            });
        }
    }
    Ok(())
}
