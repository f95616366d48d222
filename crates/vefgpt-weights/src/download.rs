//! Fetch-through-cache download of large weight files.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::store::FileStore;

/// Returns the local path of the blob for `url`, downloading it into the
/// store first if it is not already cached.
///
/// An `HF_TOKEN` environment variable, when set, is forwarded as a bearer
/// token. Downloads are single-attempt with no timeout; a failed fetch is
/// fatal to the caller's load.
pub async fn fetch_and_cache(store: &mut FileStore, url: &str, quiet: bool) -> Result<PathBuf> {
    if let Some(record) = store.get(url) {
        if !quiet {
            log::info!("weights cached, loading from store: {}", url);
        }
        return Ok(store.blob_path(record));
    }

    if !quiet {
        log::info!("weights not cached, fetching from network: {}", url);
    }

    let client = reqwest::Client::new();
    let mut req = client.get(url);
    if let Ok(token) = std::env::var("HF_TOKEN") {
        req = req.header("Authorization", format!("Bearer {}", token));
    }

    let response = req
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;
    if !response.status().is_success() {
        return Err(anyhow!("failed to download {}: HTTP {}", url, response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read body of {}", url))?;

    if !quiet {
        log::info!("fetched {} bytes from {}", bytes.len(), url);
    }

    let record = store.put(url, &bytes).await?;
    Ok(store.blob_path(&record))
}
