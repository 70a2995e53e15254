//! Route handlers. Each handler validates its body into a gateway input before dispatching.

use crate::api::{
    AppState,
    error::AppError,
    schemas::{
        DeleteCollectionRequest, DeleteCollectionResponse, EmbedRequest, EmbedResponse,
        ImportRequest, ImportResponse, ParsePdfResponse, SearchRequest, SearchResponse,
    },
};
use crate::gateway::{GatewayApi, GatewayError};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
};

const PDF_FIELD: &str = "file";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Embed a single text without storing it.
pub async fn embed<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, AppError>
where
    S: GatewayApi,
{
    let Json(request) = payload?;
    let input = request.validate()?;
    let outcome = state.service.embed(input).await?;
    Ok(Json(outcome.into()))
}

/// Embed and store a batch of texts.
pub async fn import<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, AppError>
where
    S: GatewayApi,
{
    let Json(request) = payload?;
    let input = request.validate()?;
    let collection = input.collection.clone();
    let count = input.texts.len();
    let outcome = state.service.import(input).await?;
    tracing::info!(collection = %collection, count, "Import request completed");
    Ok(Json(outcome.into()))
}

/// Rank stored texts by similarity to a query.
pub async fn search<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: GatewayApi,
{
    let Json(request) = payload?;
    let input = request.validate(state.settings.search_max_top_k)?;
    let outcome = state.service.search(input).await?;
    Ok(Json(outcome.into()))
}

/// Drop a collection.
pub async fn delete_collection<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<DeleteCollectionRequest>, JsonRejection>,
) -> Result<Json<DeleteCollectionResponse>, AppError>
where
    S: GatewayApi,
{
    let Json(request) = payload?;
    let collection = request.validate()?;
    state.service.delete_collection(collection.as_str()).await?;
    Ok(Json(DeleteCollectionResponse::deleted(collection.to_string())))
}

/// Convert an uploaded PDF (multipart field `file`) into Markdown.
pub async fn parse_pdf<S>(
    State(state): State<AppState<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ParsePdfResponse>, AppError>
where
    S: GatewayApi,
{
    let limit = state.settings.max_upload_bytes;
    let mut multipart = multipart
        .map_err(|rejection| GatewayError::Validation(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| upload_error(error, limit))?
    {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        if let Some(content_type) = field.content_type()
            && content_type != PDF_CONTENT_TYPE
        {
            return Err(GatewayError::InvalidPdf(format!(
                "unsupported content type '{content_type}'; only {PDF_CONTENT_TYPE} is accepted"
            ))
            .into());
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|error| upload_error(error, limit))?;
        tracing::debug!(filename = ?filename, bytes = bytes.len(), "Received PDF upload");

        let markdown = state.service.parse_pdf(bytes.to_vec()).await?;
        return Ok(Json(ParsePdfResponse { filename, markdown }));
    }

    Err(GatewayError::Validation(format!("multipart field '{PDF_FIELD}' is required")).into())
}

fn upload_error(error: MultipartError, limit: usize) -> GatewayError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(limit, "Rejected upload exceeding the body limit");
        GatewayError::PayloadTooLarge { limit }
    } else {
        GatewayError::Validation(error.body_text())
    }
}

/// Report gateway counters.
pub async fn metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: GatewayApi,
{
    Json(state.service.metrics_snapshot())
}
