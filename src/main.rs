use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use vaultmd_core::{
    CommandGenerator, CoreConfig, DocumentKind, DocumentMerger, ExtractedSections,
    FileRecordStore, GenerationError, InMemoryFileAccess, MergeResult, NonEmptyText,
    PipelineError, ProcedureSession, ProcessOutcome, SourceDocument,
    config::{data_dir_from_env_value, generator_command_from_env_value},
};

/// Application state shared across REST API handlers
///
/// The generator is resolved once at startup. When it could not be constructed the reason is
/// kept so that every processing request can report it.
#[derive(Clone)]
struct AppState {
    generator: Result<Arc<CommandGenerator>, String>,
    store: Arc<FileRecordStore>,
}

impl AppState {
    fn new(cfg: &CoreConfig) -> Self {
        let generator = CommandGenerator::from_config(cfg)
            .map(Arc::new)
            .map_err(|e| e.to_string());
        Self {
            generator,
            store: Arc::new(FileRecordStore::new(cfg)),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
    ai_available: bool,
}

/// A document uploaded inline.
#[derive(Deserialize, ToSchema)]
struct DocumentUpload {
    /// File name, used for kind detection and in placeholders
    name: String,
    /// Raw file bytes, base64 encoded
    content_base64: String,
}

#[derive(Deserialize, ToSchema)]
struct MergeReq {
    documents: Vec<DocumentUpload>,
}

#[derive(Serialize, ToSchema)]
struct FragmentRes {
    name: String,
    text: String,
    error: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct MergeRes {
    merged_text: String,
    fragments: Vec<FragmentRes>,
}

impl From<MergeResult> for MergeRes {
    fn from(result: MergeResult) -> Self {
        let fragments = result
            .fragments()
            .iter()
            .map(|f| FragmentRes {
                name: f.name().to_string(),
                text: f.text().to_string(),
                error: f.error().map(ToString::to_string),
            })
            .collect();
        Self {
            merged_text: result.into_merged_text(),
            fragments,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct SectionsReq {
    output: String,
}

#[derive(Serialize, ToSchema)]
struct SectionsRes {
    operative_note: Option<String>,
    icd10_codes: Option<String>,
    cpt_codes: Option<String>,
}

impl From<ExtractedSections> for SectionsRes {
    fn from(sections: ExtractedSections) -> Self {
        Self {
            operative_note: sections.operative_note,
            icd10_codes: sections.icd10_codes,
            cpt_codes: sections.cpt_codes,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct ProcessReq {
    documents: Vec<DocumentUpload>,
    /// Hand-edited text to send instead of the merged text
    edited_text: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct ProcessRes {
    id: String,
    timestamp: String,
    original_text: String,
    output: String,
    sections: SectionsRes,
}

type ApiError = (StatusCode, String);

fn api_error(e: PipelineError) -> ApiError {
    let status = match &e {
        PipelineError::NoFilesSelected
        | PipelineError::NothingToProcess
        | PipelineError::DocumentIndexOutOfRange { .. }
        | PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::AiServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::AiGenerationFailed(_) => StatusCode::BAD_GATEWAY,
        PipelineError::PersistenceFailed(_) => {
            tracing::error!("Save procedure error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

/// Decodes uploads into in-memory documents, in request order.
fn upload_documents(
    uploads: Vec<DocumentUpload>,
) -> Result<(InMemoryFileAccess, Vec<SourceDocument>), PipelineError> {
    let mut access = InMemoryFileAccess::new();
    let mut documents = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let name = NonEmptyText::new(&upload.name)
            .map_err(|_| PipelineError::InvalidInput("document name is required".into()))?;
        let bytes = STANDARD.decode(upload.content_base64.trim()).map_err(|e| {
            PipelineError::InvalidInput(format!("{} is not valid base64: {}", name, e))
        })?;
        let kind = DocumentKind::detect(name.as_str(), &bytes);
        let handle = access.insert(name.as_str(), bytes);
        documents.push(SourceDocument::new(name, kind, handle));
    }
    Ok((access, documents))
}

#[derive(OpenApi)]
#[openapi(
    paths(health, merge_documents, extract_sections, process_procedure),
    components(schemas(
        HealthRes,
        DocumentUpload,
        MergeReq,
        MergeRes,
        FragmentRes,
        SectionsReq,
        SectionsRes,
        ProcessReq,
        ProcessRes
    ))
)]
struct ApiDoc;

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/merge", post(merge_documents))
        .route("/sections", post(extract_sections))
        .route("/procedures", post(process_procedure))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Main entry point for the VaultMD REST service
///
/// # Environment Variables
/// - `VAULTMD_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `VAULTMD_DATA_DIR`: directory for procedure records (default: "procedure_data")
/// - `VAULTMD_GENERATOR_CMD`: command run for AI generation; processing is unavailable when unset
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the data directory path is not a directory,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vaultmd_run=info".parse()?)
                .add_directive("vaultmd_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("VAULTMD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::new(
        data_dir_from_env_value(std::env::var("VAULTMD_DATA_DIR").ok()),
        generator_command_from_env_value(std::env::var("VAULTMD_GENERATOR_CMD").ok()),
    )?;

    let state = AppState::new(&cfg);
    if let Err(reason) = &state.generator {
        tracing::warn!("AI processing disabled: {}", reason);
    }

    tracing::info!("++ Starting VaultMD REST on {}", addr);
    tracing::info!("++ Storing procedures under {}", cfg.procedures_dir().display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Also reports whether AI processing is configured.
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "VaultMD REST API is alive".into(),
        ai_available: state.generator.is_ok(),
    })
}

#[utoipa::path(
    post,
    path = "/merge",
    request_body = MergeReq,
    responses(
        (status = 200, description = "Merged text and per-document fragments", body = MergeRes),
        (status = 400, description = "No documents, or a document could not be decoded")
    )
)]
/// Merge uploaded documents into one text
///
/// Documents that cannot be read appear as placeholder fragments; they do not fail the request.
async fn merge_documents(Json(req): Json<MergeReq>) -> Result<Json<MergeRes>, ApiError> {
    let (access, documents) = upload_documents(req.documents).map_err(api_error)?;
    let result = DocumentMerger::new(&access)
        .merge(&documents)
        .map_err(api_error)?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/sections",
    request_body = SectionsReq,
    responses(
        (status = 200, description = "Labelled sections found in the output", body = SectionsRes)
    )
)]
/// Split a generated output into operative note, ICD-10 and CPT sections
async fn extract_sections(Json(req): Json<SectionsReq>) -> Json<SectionsRes> {
    Json(ExtractedSections::from_output(&req.output).into())
}

#[utoipa::path(
    post,
    path = "/procedures",
    request_body = ProcessReq,
    responses(
        (status = 201, description = "Procedure generated and saved", body = ProcessRes),
        (status = 400, description = "No documents or nothing to process"),
        (status = 502, description = "AI generation failed"),
        (status = 503, description = "AI generation is not configured"),
        (status = 500, description = "Procedure could not be saved")
    )
)]
/// Merge documents, generate documentation and save the procedure record
///
/// # Errors
/// Returns the single user-visible failure message with a status matching its cause.
async fn process_procedure(
    State(state): State<AppState>,
    Json(req): Json<ProcessReq>,
) -> Result<(StatusCode, Json<ProcessRes>), ApiError> {
    let (access, documents) = upload_documents(req.documents).map_err(api_error)?;

    let generator = state
        .generator
        .clone()
        .map_err(GenerationError::Unavailable);
    let session = ProcedureSession::new(access, generator, state.store.clone());
    session.select_documents(documents);
    session.merge().map_err(api_error)?;
    if let Some(edited) = req.edited_text {
        session.set_merged_text(edited);
    }

    match session.process().await.map_err(api_error)? {
        ProcessOutcome::Saved(record) => {
            let output = record.generated_output().unwrap_or_default().to_string();
            Ok((
                StatusCode::CREATED,
                Json(ProcessRes {
                    id: record.id().to_string(),
                    timestamp: record.timestamp().to_rfc3339(),
                    original_text: record.original_text().to_string(),
                    sections: ExtractedSections::from_output(&output).into(),
                    output,
                }),
            ))
        }
        ProcessOutcome::AlreadyInFlight => Err((
            StatusCode::CONFLICT,
            "Processing is already in progress.".into(),
        )),
        ProcessOutcome::Discarded => Err((
            StatusCode::CONFLICT,
            "Processing was cancelled.".into(),
        )),
    }
}
