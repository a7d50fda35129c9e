//! Handler for `GET /download`.
//!
//! Stages a small artifact and delivers it according to the deployment
//! mode: streamed from disk, or handed to the proxy through an
//! `X-Accel-Redirect` header with an empty body.

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::Response;
use jobline_core::error::CoreError;
use jobline_core::staging::Delivery;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Content of the demo artifact.
pub const DOWNLOAD_CONTENT: &[u8] = b"hello\n";

/// Generic content type that makes browsers save instead of render.
pub const FORCE_DOWNLOAD: &str = "application/force-download";

/// Internal redirect header understood by nginx.
pub const X_ACCEL_REDIRECT: &str = "x-accel-redirect";

/// GET /download
pub async fn download(State(state): State<AppState>) -> AppResult<Response> {
    let staged = state.stager.stage(DOWNLOAD_CONTENT).await?;
    let file_name = staged.file_name().to_string();
    let mode = staged.mode();
    let delivery = staged.deliver().await?;
    tracing::info!(
        file_name = %file_name,
        mode = ?mode,
        bytes = delivery.len(),
        "Delivering staged file",
    );
    delivery_response(delivery).await
}

/// Turn a [`Delivery`] into a response.
///
/// Only direct delivery sets `Content-Length`, from the staged length. A
/// handoff response has an empty body, so hyper frames it as
/// `content-length: 0`; the proxy sets the real length when it serves the
/// file.
pub async fn delivery_response(delivery: Delivery) -> AppResult<Response> {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, FORCE_DOWNLOAD)
        .header(header::CONTENT_DISPOSITION, delivery.content_disposition());

    let response = match delivery {
        Delivery::Direct { path, len, .. } => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(CoreError::Staging)?;
            builder
                .header(header::CONTENT_LENGTH, len.to_string())
                .body(Body::from_stream(ReaderStream::new(file)))
        }
        Delivery::ProxyHandoff { redirect_uri, .. } => builder
            .header(X_ACCEL_REDIRECT, redirect_uri)
            .body(Body::empty()),
    };

    response.map_err(|e| AppError::InternalError(e.to_string()))
}
