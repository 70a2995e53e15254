//! Gateway service coordinating the embedding provider, Qdrant, and the PDF converter.

use crate::{
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client},
    gateway::types::{
        EmbedInput, EmbedOutcome, GatewayError, ImportInput, ImportOutcome, SearchHit,
        SearchInput, SearchOutcome,
    },
    metrics::{GatewayMetrics, MetricsSnapshot},
    pdf::{PdfConverter, PdfExtractConverter, ensure_pdf_signature},
    qdrant::{PointInsert, QdrantService},
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const EMBEDDING_PROVIDER: &str = "embedding provider";
const VECTOR_STORE: &str = "vector store";
const PDF_CONVERTER: &str = "pdf converter";

/// Orchestrates every gateway operation.
///
/// The service owns long-lived handles to the embedding client, the Qdrant transport, and the
/// PDF converter. Construct it once at startup and share it through an `Arc`; it holds no
/// per-request mutable state apart from metrics counters.
pub struct GatewayService {
    embedding_client: Box<dyn EmbeddingClient>,
    qdrant_service: QdrantService,
    pdf_converter: Arc<dyn PdfConverter>,
    metrics: GatewayMetrics,
    embedding_dimension: usize,
    upstream_timeout: Duration,
}

/// Abstraction over the gateway operations used by the HTTP surface.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Compute the embedding of a single text without persisting it.
    async fn embed(&self, input: EmbedInput) -> Result<EmbedOutcome, GatewayError>;

    /// Embed every text and upsert the records into the collection, creating it when absent.
    async fn import(&self, input: ImportInput) -> Result<ImportOutcome, GatewayError>;

    /// Return up to `top_k` stored texts most similar to the query.
    async fn search(&self, input: SearchInput) -> Result<SearchOutcome, GatewayError>;

    /// Drop a collection and all of its records.
    async fn delete_collection(&self, collection: &str) -> Result<(), GatewayError>;

    /// Convert an uploaded PDF document into Markdown.
    async fn parse_pdf(&self, bytes: Vec<u8>) -> Result<String, GatewayError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl GatewayService {
    /// Build the service and its collaborators from configuration.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = build_embedding_client(config)?;
        let qdrant_service = QdrantService::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            config.client_timeout(),
        )?;
        tracing::info!(
            provider = ?config.embedding_provider,
            dimension = config.embedding_dimension,
            "Gateway collaborators initialized"
        );

        Ok(Self::from_parts(
            embedding_client,
            qdrant_service,
            Arc::new(PdfExtractConverter::new()),
            config.embedding_dimension,
            config.upstream_timeout(),
        ))
    }

    /// Assemble the service from already constructed collaborators.
    pub fn from_parts(
        embedding_client: Box<dyn EmbeddingClient>,
        qdrant_service: QdrantService,
        pdf_converter: Arc<dyn PdfConverter>,
        embedding_dimension: usize,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            embedding_client,
            qdrant_service,
            pdf_converter,
            metrics: GatewayMetrics::new(),
            embedding_dimension,
            upstream_timeout,
        }
    }

    /// Compute the embedding of a single text.
    pub async fn embed(&self, input: EmbedInput) -> Result<EmbedOutcome, GatewayError> {
        let EmbedInput { collection, text } = input;
        let embedding = self.embed_one(text.clone()).await?;
        self.metrics.record_embed();
        tracing::debug!(collection = %collection, dimension = embedding.len(), "Text embedded");
        Ok(EmbedOutcome {
            collection: collection.to_string(),
            text,
            embedding,
        })
    }

    /// Embed and store a batch of texts.
    ///
    /// Every text is embedded before anything is written, so an embedding failure leaves the
    /// store untouched. The records are then sent in a single upsert; if that upsert fails the
    /// whole batch is reported as failed, although the store may have applied part of it.
    pub async fn import(&self, input: ImportInput) -> Result<ImportOutcome, GatewayError> {
        let ImportInput { collection, texts } = input;
        let vectors = self.embed_texts(texts.clone()).await?;
        self.ensure_collection(collection.as_str()).await?;

        let points = texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| PointInsert { text, vector })
            .collect();
        let ids = self
            .bounded(
                VECTOR_STORE,
                self.qdrant_service.upsert_points(collection.as_str(), points),
            )
            .await?;

        self.metrics.record_import(ids.len() as u64);
        tracing::info!(collection = %collection, count = ids.len(), "Texts imported");
        Ok(ImportOutcome {
            collection: collection.to_string(),
            ids,
        })
    }

    /// Search a collection for the texts most similar to the query.
    ///
    /// A missing collection fails with [`GatewayError::CollectionNotFound`] before the query is
    /// embedded. Hits are ordered by descending score; ties keep the order reported by Qdrant.
    pub async fn search(&self, input: SearchInput) -> Result<SearchOutcome, GatewayError> {
        let SearchInput {
            collection,
            query,
            top_k,
        } = input;
        let top_k = top_k.get();

        let exists = self
            .bounded(
                VECTOR_STORE,
                self.qdrant_service.collection_exists(collection.as_str()),
            )
            .await?;
        if !exists {
            return Err(GatewayError::CollectionNotFound(collection.to_string()));
        }

        let vector = self.embed_one(query.clone()).await?;
        let points = self
            .bounded(
                VECTOR_STORE,
                self.qdrant_service
                    .search_points(collection.as_str(), vector, top_k),
            )
            .await?;

        let hits = rank_hits(
            points
                .into_iter()
                .map(|point| (point.id.clone(), point.text().map(str::to_string), point.score)),
            top_k,
        );

        self.metrics.record_search();
        tracing::info!(collection = %collection, top_k, hits = hits.len(), "Search completed");
        Ok(SearchOutcome {
            query,
            collection: collection.to_string(),
            hits,
        })
    }

    /// Delete a collection. A missing collection fails with [`GatewayError::CollectionNotFound`].
    pub async fn delete_collection(&self, collection: &str) -> Result<(), GatewayError> {
        self.bounded(VECTOR_STORE, self.qdrant_service.delete_collection(collection))
            .await?;
        self.metrics.record_collection_deleted();
        tracing::info!(collection, "Collection deleted");
        Ok(())
    }

    /// Convert PDF bytes into Markdown on a blocking worker thread.
    pub async fn parse_pdf(&self, bytes: Vec<u8>) -> Result<String, GatewayError> {
        ensure_pdf_signature(&bytes)?;
        let size = bytes.len();
        let converter = Arc::clone(&self.pdf_converter);
        let task = tokio::task::spawn_blocking(move || converter.to_markdown(&bytes));

        // On timeout the blocking thread keeps running; only the response is abandoned.
        let joined = tokio::time::timeout(self.upstream_timeout, task)
            .await
            .map_err(|_| self.timeout_error(PDF_CONVERTER))?;
        let markdown = match joined {
            Ok(conversion) => conversion?,
            Err(join_error) if join_error.is_panic() => {
                return Err(GatewayError::InvalidPdf(
                    "document could not be parsed".to_string(),
                ));
            }
            Err(join_error) => return Err(GatewayError::PdfConverter(join_error.to_string())),
        };

        self.metrics.record_pdf();
        tracing::info!(bytes = size, markdown_chars = markdown.len(), "PDF converted");
        Ok(markdown)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), GatewayError> {
        self.bounded(
            VECTOR_STORE,
            self.qdrant_service
                .create_collection_if_not_exists(collection, self.embedding_dimension as u64),
        )
        .await?;
        tracing::debug!(collection, "Collection ensured");
        Ok(())
    }

    async fn embed_one(&self, text: String) -> Result<Vec<f32>, GatewayError> {
        let mut vectors = self.embed_texts(vec![text]).await?;
        vectors.pop().ok_or_else(|| {
            EmbeddingClientError::InvalidResponse("provider returned no vectors".to_string()).into()
        })
    }

    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, GatewayError> {
        let expected_count = texts.len();
        let vectors = self
            .bounded(
                EMBEDDING_PROVIDER,
                self.embedding_client.generate_embeddings(texts),
            )
            .await?;

        if vectors.len() != expected_count {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {expected_count} vectors, received {}",
                vectors.len()
            ))
            .into());
        }
        if let Some(vector) = vectors
            .iter()
            .find(|vector| vector.len() != self.embedding_dimension)
        {
            return Err(GatewayError::DimensionMismatch {
                expected: self.embedding_dimension,
                actual: vector.len(),
            });
        }
        Ok(vectors)
    }

    async fn bounded<T, E>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, GatewayError>
    where
        GatewayError: From<E>,
    {
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(_) => Err(self.timeout_error(collaborator)),
        }
    }

    fn timeout_error(&self, collaborator: &'static str) -> GatewayError {
        GatewayError::Timeout {
            collaborator,
            seconds: self.upstream_timeout.as_secs(),
        }
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        if let Err(error) = &result {
            self.metrics.record_failure();
            if error.is_client_error() {
                tracing::debug!(operation, kind = error.kind(), error = %error, "Request rejected");
            } else {
                tracing::error!(operation, kind = error.kind(), error = %error, "Collaborator failure");
            }
        }
        result
    }
}

/// Order hits by descending score, keeping the incoming order for equal scores.
fn rank_hits(
    points: impl IntoIterator<Item = (String, Option<String>, f32)>,
    top_k: usize,
) -> Vec<SearchHit> {
    let mut scored: Vec<_> = points.into_iter().collect();
    scored.sort_by(|a, b| b.2.total_cmp(&a.2));
    scored
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(index, (id, text, score))| SearchHit {
            id,
            text,
            score,
            rank: index + 1,
        })
        .collect()
}

#[async_trait]
impl GatewayApi for GatewayService {
    async fn embed(&self, input: EmbedInput) -> Result<EmbedOutcome, GatewayError> {
        self.observe("embed", GatewayService::embed(self, input).await)
    }

    async fn import(&self, input: ImportInput) -> Result<ImportOutcome, GatewayError> {
        self.observe("import", GatewayService::import(self, input).await)
    }

    async fn search(&self, input: SearchInput) -> Result<SearchOutcome, GatewayError> {
        self.observe("search", GatewayService::search(self, input).await)
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), GatewayError> {
        self.observe(
            "delete_collection",
            GatewayService::delete_collection(self, collection).await,
        )
    }

    async fn parse_pdf(&self, bytes: Vec<u8>) -> Result<String, GatewayError> {
        self.observe("parse_pdf", GatewayService::parse_pdf(self, bytes).await)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        GatewayService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::gateway::types::CollectionName;
    use crate::pdf::PdfError;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIMENSION: usize = 8;

    struct FailingEmbeddings;

    #[async_trait]
    impl EmbeddingClient for FailingEmbeddings {
        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Err(EmbeddingClientError::ProviderUnavailable("offline".into()))
        }
    }

    struct SlowEmbeddings;

    #[async_trait]
    impl EmbeddingClient for SlowEmbeddings {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|_| vec![0.0; DIMENSION]).collect())
        }
    }

    struct PanickingConverter;

    impl PdfConverter for PanickingConverter {
        fn to_markdown(&self, _bytes: &[u8]) -> Result<String, PdfError> {
            panic!("broken xref table");
        }
    }

    #[derive(Default)]
    struct CountingConverter {
        calls: AtomicUsize,
    }

    impl PdfConverter for CountingConverter {
        fn to_markdown(&self, _bytes: &[u8]) -> Result<String, PdfError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("# Title\n".to_string())
        }
    }

    fn gateway_with(
        server: &MockServer,
        embedding_client: Box<dyn EmbeddingClient>,
        pdf_converter: Arc<dyn PdfConverter>,
        timeout: Duration,
    ) -> GatewayService {
        let qdrant = QdrantService::new(&server.base_url(), None, Duration::from_secs(5))
            .expect("qdrant client");
        GatewayService::from_parts(embedding_client, qdrant, pdf_converter, DIMENSION, timeout)
    }

    fn gateway(server: &MockServer) -> GatewayService {
        gateway_with(
            server,
            Box::new(HashEmbeddingClient::new(DIMENSION)),
            Arc::new(PdfExtractConverter::new()),
            Duration::from_secs(5),
        )
    }

    fn collection(name: &str) -> CollectionName {
        CollectionName::parse(name).expect("collection name")
    }

    #[tokio::test]
    async fn embed_returns_vector_of_configured_dimension() {
        let server = MockServer::start_async().await;
        let service = gateway(&server);

        let outcome = service
            .embed(EmbedInput {
                collection: collection("docs"),
                text: "alpha beta".into(),
            })
            .await
            .expect("embedding");

        assert_eq!(outcome.embedding.len(), DIMENSION);
        assert_eq!(outcome.collection, "docs");
        assert_eq!(outcome.text, "alpha beta");
        assert_eq!(service.metrics_snapshot().embeds, 1);
    }

    #[tokio::test]
    async fn embed_reports_dimension_mismatch() {
        let server = MockServer::start_async().await;
        let service = gateway_with(
            &server,
            Box::new(HashEmbeddingClient::new(DIMENSION * 2)),
            Arc::new(PdfExtractConverter::new()),
            Duration::from_secs(5),
        );

        let error = service
            .embed(EmbedInput {
                collection: collection("docs"),
                text: "alpha".into(),
            })
            .await
            .expect_err("mismatch");

        assert!(matches!(
            error,
            GatewayError::DimensionMismatch {
                expected: DIMENSION,
                actual: 16
            }
        ));
    }

    #[tokio::test]
    async fn import_creates_collection_then_upserts() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/docs").json_body(json!({
                    "vectors": { "size": DIMENSION, "distance": "Cosine" }
                }));
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/docs/points")
                    .body_contains("alpha beta")
                    .body_contains("gamma delta");
                then.status(200)
                    .json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let service = gateway(&server);
        let outcome = service
            .import(ImportInput {
                collection: collection("docs"),
                texts: vec!["alpha beta".into(), "gamma delta".into()],
            })
            .await
            .expect("import");

        exists.assert();
        create.assert();
        upsert.assert();
        assert_eq!(outcome.ids.len(), 2);
        assert_eq!(outcome.collection, "docs");
        assert_eq!(service.metrics_snapshot().imported_texts, 2);
    }

    #[tokio::test]
    async fn import_writes_nothing_when_embedding_fails() {
        let server = MockServer::start_async().await;
        let any_request = server
            .mock_async(|when, then| {
                when.path_contains("/collections");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        let service = gateway_with(
            &server,
            Box::new(FailingEmbeddings),
            Arc::new(PdfExtractConverter::new()),
            Duration::from_secs(5),
        );
        let error = GatewayApi::import(
            &service,
            ImportInput {
                collection: collection("docs"),
                texts: vec!["alpha".into()],
            },
        )
        .await
        .expect_err("embedding failure");

        assert_eq!(error.kind(), "embedding_unavailable");
        any_request.assert_hits(0);
        assert_eq!(service.metrics_snapshot().failures, 1);
    }

    #[tokio::test]
    async fn search_on_missing_collection_is_not_found_without_embedding() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/nonexistent");
                then.status(404);
            })
            .await;

        // A failing provider proves the query is never embedded.
        let service = gateway_with(
            &server,
            Box::new(FailingEmbeddings),
            Arc::new(PdfExtractConverter::new()),
            Duration::from_secs(5),
        );

        for _ in 0..3 {
            let error = service
                .search(SearchInput {
                    collection: collection("nonexistent"),
                    query: "x".into(),
                    top_k: NonZeroUsize::new(5).expect("non-zero"),
                })
                .await
                .expect_err("missing collection");
            assert!(matches!(error, GatewayError::CollectionNotFound(ref name) if name == "nonexistent"));
        }
    }

    #[tokio::test]
    async fn search_orders_by_score_and_truncates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/docs/points/query")
                    .body_contains("\"limit\":2");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "id": "b", "score": 0.5, "payload": { "text": "gamma delta" } },
                            { "id": "a", "score": 0.99, "payload": { "text": "alpha beta" } },
                            { "id": "c", "score": 0.5, "payload": { "text": "epsilon" } }
                        ]
                    }
                }));
            })
            .await;

        let service = gateway(&server);
        let outcome = service
            .search(SearchInput {
                collection: collection("docs"),
                query: "alpha beta".into(),
                top_k: NonZeroUsize::new(2).expect("non-zero"),
            })
            .await
            .expect("search");

        query.assert();
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].text.as_deref(), Some("alpha beta"));
        assert_eq!(outcome.hits[0].rank, 1);
        assert_eq!(outcome.hits[1].id, "b");
        assert_eq!(outcome.hits[1].rank, 2);
        assert!(outcome.hits[0].score >= outcome.hits[1].score);
    }

    #[tokio::test]
    async fn slow_embedding_provider_times_out() {
        let server = MockServer::start_async().await;
        let service = gateway_with(
            &server,
            Box::new(SlowEmbeddings),
            Arc::new(PdfExtractConverter::new()),
            Duration::from_millis(50),
        );

        let error = service
            .embed(EmbedInput {
                collection: collection("docs"),
                text: "alpha".into(),
            })
            .await
            .expect_err("timeout");

        assert!(matches!(
            error,
            GatewayError::Timeout {
                collaborator: EMBEDDING_PROVIDER,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn slow_vector_store_is_a_timeout_not_a_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(json!({ "result": {} }));
            })
            .await;

        let config = Config {
            qdrant_url: server.base_url(),
            embedding_provider: crate::config::EmbeddingProvider::Hash,
            embedding_dimension: DIMENSION,
            upstream_timeout_secs: 1,
            ..Config::default()
        };
        let service = GatewayService::new(&config).expect("service");

        let error = service
            .search(SearchInput {
                collection: collection("docs"),
                query: "alpha".into(),
                top_k: NonZeroUsize::new(1).expect("non-zero"),
            })
            .await
            .expect_err("timeout");

        assert!(matches!(
            error,
            GatewayError::Timeout {
                collaborator: VECTOR_STORE,
                seconds: 1
            }
        ));
        assert_eq!(error.kind(), "upstream_timeout");
    }

    #[tokio::test]
    async fn non_pdf_bytes_never_reach_the_converter() {
        let server = MockServer::start_async().await;
        let converter = Arc::new(CountingConverter::default());
        let service = gateway_with(
            &server,
            Box::new(HashEmbeddingClient::new(DIMENSION)),
            converter.clone(),
            Duration::from_secs(5),
        );

        let error = service
            .parse_pdf(b"plain text".to_vec())
            .await
            .expect_err("not a pdf");
        assert_eq!(error.kind(), "invalid_pdf");
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);

        let markdown = service
            .parse_pdf(b"%PDF-1.7 stub".to_vec())
            .await
            .expect("converted");
        assert_eq!(markdown, "# Title\n");
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn converter_panic_is_reported_as_invalid_pdf() {
        let server = MockServer::start_async().await;
        let service = gateway_with(
            &server,
            Box::new(HashEmbeddingClient::new(DIMENSION)),
            Arc::new(PanickingConverter),
            Duration::from_secs(5),
        );

        let error = service
            .parse_pdf(b"%PDF-1.4 broken".to_vec())
            .await
            .expect_err("panic converted");
        assert!(matches!(error, GatewayError::InvalidPdf(_)));
    }

    #[test]
    fn equal_scores_keep_store_order() {
        let hits = rank_hits(
            vec![
                ("first".to_string(), None, 0.7),
                ("second".to_string(), None, 0.7),
                ("third".to_string(), None, 0.9),
            ],
            10,
        );
        let ids: Vec<_> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, ["third", "first", "second"]);
        assert_eq!(hits.iter().map(|hit| hit.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }
}
