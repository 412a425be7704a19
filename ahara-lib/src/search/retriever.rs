use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::embed::Embedder;
use crate::search::{IndexArtifacts, SearchEngine};
use crate::store::FlatIndex;
use crate::{Error, Result};

type EngineLoader<E> = dyn Fn() -> Result<SearchEngine<E, FlatIndex>> + Send + Sync;

/// Request-time retrieval over a lazily loaded corpus.
///
/// The embedding model, vector index and chunk metadata are loaded on the
/// first call to [`Retriever::retrieve`] (or [`Retriever::warm_up`]) and
/// shared for the rest of the process. Concurrent first callers wait on a
/// single load; a failed load leaves the retriever empty so a later call
/// can try again.
pub struct Retriever<E: Embedder> {
    loader: Arc<EngineLoader<E>>,
    engine: OnceCell<Arc<SearchEngine<E, FlatIndex>>>,
}

impl<E: Embedder + 'static> Retriever<E> {
    /// Create a retriever that builds its engine with `loader` on first use.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<SearchEngine<E, FlatIndex>> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            engine: OnceCell::new(),
        }
    }

    /// Create a retriever backed by persisted artifacts.
    ///
    /// `make_embedder` is only called once the artifacts have loaded, and the
    /// embedder must be the model the index was built with.
    pub fn from_artifacts<F>(artifacts: IndexArtifacts, make_embedder: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self::new(move || {
            let loaded = artifacts.load()?;
            let embedder = make_embedder()
                .map_err(|e| Error::RetrievalUnavailable(format!("embedding model: {e}")))?;
            if embedder.model_name() != loaded.model {
                return Err(Error::RetrievalUnavailable(format!(
                    "index was built with {} but the embedder is {}",
                    loaded.model,
                    embedder.model_name()
                )));
            }
            SearchEngine::from_parts(embedder, loaded.index, loaded.chunks)
        })
    }

    /// Wrap an engine that is already built.
    pub fn from_engine(engine: SearchEngine<E, FlatIndex>) -> Self {
        Self {
            loader: Arc::new(|| -> Result<SearchEngine<E, FlatIndex>> {
                Err(Error::RetrievalUnavailable("engine already provided".to_string()))
            }),
            engine: OnceCell::new_with(Some(Arc::new(engine))),
        }
    }

    /// Returns `true` once the engine has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Load the engine now instead of on the first request.
    pub async fn warm_up(&self) -> Result<()> {
        self.engine().await.map(|_| ())
    }

    /// Text of the `top_k` chunks nearest to `query`, separated by a blank line.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<String> {
        let engine = self.engine().await?;
        let query = query.to_string();

        // embedding inference is CPU bound
        let context = tokio::task::spawn_blocking(move || engine.retrieve_context(&query, top_k))
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("retrieval task failed: {e}")))??;

        debug!(context_len = context.len(), "retrieved context");
        Ok(context)
    }

    async fn engine(&self) -> Result<Arc<SearchEngine<E, FlatIndex>>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let engine = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| Error::RetrievalUnavailable(format!("index loader failed: {e}")))?
                    .map_err(|e| match e {
                        Error::RetrievalUnavailable(_) => e,
                        other => Error::RetrievalUnavailable(other.to_string()),
                    })?;
                info!(rows = engine.len(), model = %engine.model_name(), "retrieval index loaded");
                Ok::<_, Error>(Arc::new(engine))
            })
            .await?;
        Ok(Arc::clone(engine))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::search::tests::{dosha_embedder, dosha_engine, PITTA, PITTA_QUERY};

    #[tokio::test]
    async fn test_retrieve_nearest_chunk() {
        let retriever = Retriever::from_engine(dosha_engine());
        assert!(retriever.is_loaded());

        let context = retriever.retrieve(PITTA_QUERY, 1).await.unwrap();
        assert_eq!(context, PITTA);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_load_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let retriever = Arc::new(Retriever::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(dosha_engine())
        }));
        assert!(!retriever.is_loaded());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let retriever = Arc::clone(&retriever);
            handles.push(tokio::spawn(async move {
                retriever.retrieve(PITTA_QUERY, 1).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), PITTA);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(retriever.is_loaded());
    }

    #[tokio::test]
    async fn test_missing_artifacts_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = IndexArtifacts::new(dir.path().join("absent"));
        let retriever = Retriever::from_artifacts(artifacts, || Ok(dosha_embedder()));

        let err = retriever.retrieve(PITTA_QUERY, 3).await.unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
        assert!(!retriever.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_can_be_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let retriever = Retriever::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Store("transient".to_string()))
            } else {
                Ok(dosha_engine())
            }
        });

        let err = retriever.warm_up().await.unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
        retriever.warm_up().await.unwrap();
        assert_eq!(retriever.retrieve(PITTA_QUERY, 1).await.unwrap(), PITTA);
    }

    #[tokio::test]
    async fn test_loads_from_saved_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = IndexArtifacts::new(dir.path().join("ayurveda"));
        artifacts.save(&dosha_engine()).unwrap();

        let retriever = Retriever::from_artifacts(artifacts, || Ok(dosha_embedder()));
        assert_eq!(retriever.retrieve(PITTA_QUERY, 1).await.unwrap(), PITTA);
    }
}
