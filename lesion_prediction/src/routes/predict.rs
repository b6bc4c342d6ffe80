use crate::{
    model_service::{ModelError, ModelService},
    prediction::{LesionClass, Prediction},
    preprocessing::{load_image, to_input_tensor, PreprocessError},
    server::SharedState,
    staging::{StagedUpload, StagingError},
};
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{instrument, Span};
use uuid::Uuid;

const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No file provided")]
    NoFile,
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PredictError {
    fn status(&self) -> StatusCode {
        match self {
            PredictError::NoFile => StatusCode::BAD_REQUEST,
            PredictError::Multipart(err) => err.status(),
            PredictError::Staging(_)
            | PredictError::Preprocess(_)
            | PredictError::Model(_)
            | PredictError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Prediction failed: {}", self);
        } else {
            tracing::warn!("Rejected prediction request: {}", self);
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct PredictionResponse {
    prediction: LesionClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f32>,
}

#[instrument(skip_all, fields(request_id = tracing::field::Empty))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let request_id = Uuid::new_v4();
    Span::current().record("request_id", tracing::field::display(request_id));

    // A body that is not multipart at all carries no file either.
    let mut multipart = multipart.map_err(|_| PredictError::NoFile)?;
    let (filename, image_data) = read_file_field(&mut multipart)
        .await?
        .ok_or(PredictError::NoFile)?;
    tracing::info!("Received {:?} ({} bytes)", filename, image_data.len());

    let prediction = run_prediction(&state, request_id, image_data).await?;
    tracing::info!(
        "Predicted {} (class {})",
        prediction.class.as_str(),
        prediction.class.class_id()
    );

    Ok(Json(PredictionResponse {
        prediction: prediction.class,
        probability: state.include_probability.then_some(prediction.probability),
    }))
}

async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, Bytes)>, PredictError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A plain form value under the same name is not an upload.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let image_data = field.bytes().await?;
        if image_data.is_empty() {
            return Ok(None);
        }
        return Ok(Some((filename, image_data)));
    }
    Ok(None)
}

/// Stages, decodes and classifies on the blocking pool. The staged file
/// is dropped before the closure returns, on success and on every error.
async fn run_prediction<M: ModelService>(
    state: &SharedState<M>,
    request_id: Uuid,
    image_data: Bytes,
) -> Result<Prediction, PredictError> {
    let model_service = state.model_service.clone();
    let scratch_dir = state.scratch_dir.clone();
    let span = Span::current();

    tokio::task::spawn_blocking(move || -> Result<Prediction, PredictError> {
        let _entered = span.enter();
        let staged = StagedUpload::write(&scratch_dir, request_id, &image_data)?;
        let image = load_image(staged.path())?;
        let input = to_input_tensor(&image);
        let prediction = model_service.predict(&input)?;
        Ok(prediction)
    })
    .await?
}
