use crate::config::{ServerConfig, SolverSettings};
use crate::data::{RosterInput, RosterOutput};
use crate::error::{Result, RosterError};
use crate::registry::Registry;
use crate::solver;
use axum::{http::StatusCode, routing::post, Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Body of a solve request: the month plus optional solver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub input: RosterInput,
    #[serde(default)]
    pub settings: SolverSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    pub issues: Vec<String>,
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> std::result::Result<Json<RosterOutput>, (StatusCode, String)> {
    let solved =
        tokio::task::spawn_blocking(move || solver::solve(&request.input, &request.settings)).await;
    match solved {
        Ok(Ok(output)) => Ok(Json(output)),
        Ok(Err(e)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("Solver task failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn validate_handler(Json(input): Json<RosterInput>) -> Json<ValidationResponse> {
    let issues = match Registry::build(&input) {
        Ok(_) => Vec::new(),
        Err(e) => e.issues().to_vec(),
    };
    Json(ValidationResponse {
        valid: issues.is_empty(),
        issues,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/roster/solve", post(solve_handler))
        .route("/v1/roster/validate", post(validate_handler))
}

pub async fn run_server(config: &ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router())
        .await
        .map_err(RosterError::from)
}
