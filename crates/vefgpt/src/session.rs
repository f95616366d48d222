//! The owned session object: weights in, text out.
//!
//! A session is built once, loads its weights once, and is then driven for
//! any number of generation calls. All state lives in the session itself;
//! nothing is cached process-wide, so two sessions never race each other.

use std::path::PathBuf;

use anyhow::anyhow;
use futures_util::{pin_mut, StreamExt};
use log::debug;
use tokenizers::Tokenizer;

use vefgpt_weights::{
    fetch_and_cache, get_default_cache_dir, FileStore, Hdf5Archive, ModelType, WeightArchive,
};

use crate::error::{Error, Result};
use crate::generate::{stream_tokens, StreamedToken};
use crate::loader::{load_weights, LoadReport, LoadStage, Progress, ProgressCallback};
use crate::model::GraphModel;
use crate::options::{resolve_strategy, GenerateOptions};

/// Builder for a [`Gpt2Session`].
pub struct SessionBuilder {
    model: String,
    cache_dir: Option<PathBuf>,
    weights_path: Option<PathBuf>,
    tokenizer: Option<Tokenizer>,
    allow_partial: bool,
    quiet: bool,
    progress: Option<ProgressCallback>,
}

impl SessionBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            cache_dir: None,
            weights_path: None,
            tokenizer: None,
            allow_partial: false,
            quiet: false,
            progress: None,
        }
    }

    /// Overrides the blob-store root directory.
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Loads weights from a local archive instead of the network.
    pub fn weights_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights_path = Some(path.into());
        self
    }

    /// Uses a pre-built tokenizer instead of downloading `tokenizer.json`.
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Accepts a partially loaded model instead of failing.
    ///
    /// Unassigned slots keep whatever state the injected model initialized
    /// them with; generation quality is then undefined.
    pub fn allow_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    /// Suppresses informational log output.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Receives progress updates during the load.
    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Fetches, remaps and assigns the weights into `graph`, returning a
    /// ready session.
    pub async fn load(self, graph: impl GraphModel + 'static) -> Result<Gpt2Session> {
        let SessionBuilder {
            model,
            cache_dir,
            weights_path,
            tokenizer,
            allow_partial,
            quiet,
            progress,
        } = self;

        let model_type = ModelType::resolve(&model).map_err(Error::UnknownModel)?;
        let info = model_type.info();
        let params_total = info.total_params;
        let mut graph: Box<dyn GraphModel> = Box::new(graph);

        let mut store = if weights_path.is_none() || tokenizer.is_none() {
            let root = cache_dir.unwrap_or_else(get_default_cache_dir);
            Some(FileStore::open(&root).await.map_err(Error::StoreFailed)?)
        } else {
            None
        };

        let weights_path = match weights_path {
            Some(path) => path,
            None => {
                let store = store.as_mut().expect("store opened for network load");
                let stage = if store.contains(info.paths.weights_url) {
                    LoadStage::CacheHit
                } else {
                    LoadStage::FetchingWeights
                };
                emit(&progress, stage, 0, params_total, info.paths.weights_url);

                fetch_and_cache(store, info.paths.weights_url, quiet)
                    .await
                    .map_err(|e| Error::DownloadFailed {
                        url: info.paths.weights_url.to_string(),
                        source: e,
                    })?
            }
        };

        let tokenizer = match tokenizer {
            Some(tokenizer) => tokenizer,
            None => {
                let store = store.as_mut().expect("store opened for network load");
                emit(
                    &progress,
                    LoadStage::FetchingTokenizer,
                    0,
                    params_total,
                    info.paths.tokenizer_url,
                );
                let path = fetch_and_cache(store, info.paths.tokenizer_url, quiet)
                    .await
                    .map_err(|e| Error::DownloadFailed {
                        url: info.paths.tokenizer_url.to_string(),
                        source: e,
                    })?;
                Tokenizer::from_file(&path).map_err(|e| Error::TokenizerFailed(anyhow!(e)))?
            }
        };

        emit(
            &progress,
            LoadStage::OpeningArchive,
            0,
            params_total,
            &weights_path.display().to_string(),
        );
        let archive = Hdf5Archive::open(&weights_path).map_err(Error::ArchiveFailed)?;

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(entries) = archive.entries() {
                for entry in entries {
                    debug!("{} {:?}", entry.path, entry.shape);
                }
            }
        }

        let report = load_weights(graph.as_mut(), &archive, params_total, progress.as_ref()).await;
        emit(
            &progress,
            LoadStage::Done,
            report.params_loaded,
            params_total,
            "load complete",
        );

        if !report.is_complete() && !allow_partial {
            return Err(Error::IncompleteLoad { report });
        }

        Ok(Gpt2Session {
            model: graph,
            tokenizer,
            model_type,
            report,
        })
    }
}

fn emit(
    progress: &Option<ProgressCallback>,
    stage: LoadStage,
    params_loaded: u64,
    params_total: u64,
    message: &str,
) {
    if let Some(callback) = progress {
        callback(Progress {
            stage,
            params_loaded,
            params_total,
            message: Some(message.to_string()),
        });
    }
}

/// A loaded GPT-2 model bound to its tokenizer, ready to generate.
pub struct Gpt2Session {
    model: Box<dyn GraphModel>,
    tokenizer: Tokenizer,
    model_type: ModelType,
    report: LoadReport,
}

impl Gpt2Session {
    /// Starts building a session for a registry model name.
    pub fn builder(model: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(model)
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// The outcome of the weight-loading sweep.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Generates text for `options.input`, returning the full decoded
    /// sequence (prompt included).
    pub async fn generate(&mut self, options: &GenerateOptions) -> Result<String> {
        options.validate().map_err(Error::InvalidOptions)?;
        let strategy = resolve_strategy(options);

        let mut ids = Vec::new();
        {
            let stream = stream_tokens(
                self.model.as_mut(),
                &self.tokenizer,
                &options.input,
                strategy,
                options.max_length,
            )
            .await
            .map_err(Error::GenerationFailed)?;
            pin_mut!(stream);

            while let Some(token) = stream.next().await {
                ids.push(token.map_err(Error::GenerationFailed)?.id);
            }
        }

        self.tokenizer
            .decode(&ids, false)
            .map_err(|e| Error::GenerationFailed(anyhow!(e)))
    }

    /// Streams tokens for `options.input`: prompt tokens first, then
    /// generated ones with per-token timing. Dropping the stream stops
    /// generation at the next step boundary.
    pub async fn generate_stream(
        &mut self,
        options: &GenerateOptions,
    ) -> Result<impl futures_core::Stream<Item = Result<StreamedToken>> + '_> {
        options.validate().map_err(Error::InvalidOptions)?;
        let strategy = resolve_strategy(options);

        let stream = stream_tokens(
            self.model.as_mut(),
            &self.tokenizer,
            &options.input,
            strategy,
            options.max_length,
        )
        .await
        .map_err(Error::GenerationFailed)?;

        Ok(stream.map(|item| item.map_err(Error::GenerationFailed)))
    }
}
