use std::{io::ErrorKind, sync::Arc};

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use codenotify_run_core::{AppError, config::Config, models::RunId, util::run_log_path};

pub const RUN_LOG_MISSING: &str = "The run log no longer exists";

/// Serve the redacted log of a run as plain text.
pub async fn get_run(
    State(config): State<Arc<Config>>,
    Path(run_id): Path<String>,
) -> Result<Response, AppError> {
    // Unknown and malformed ids look the same to the caller.
    let Ok(run_id) = run_id.parse::<RunId>() else {
        return Ok(RUN_LOG_MISSING.into_response());
    };
    let path = run_log_path(&config.server.logs_root_dir, &run_id);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RUN_LOG_MISSING.into_response()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to read run log {}", path.display()))
                .into());
        }
    };
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], data).into_response())
}
