//! Leaderboard API Handlers
//!
//! `GET` and `POST` on `/api/leaderboard`; any other method is a 405.

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{LeaderboardResponse, SubmitScoreRequest};
use crate::services::LeaderboardService;

/// Request bodies above this size are rejected.
pub const MAX_BODY_BYTES: usize = 1_000_000;

pub struct LeaderboardHandlerState {
    pub service: Arc<LeaderboardService>,
}

/// GET /api/leaderboard
pub async fn get_leaderboard(state: web::Data<LeaderboardHandlerState>) -> Result<HttpResponse> {
    let entries = state.service.get_top().await?;
    Ok(HttpResponse::Ok().json(LeaderboardResponse { entries }))
}

/// POST /api/leaderboard
pub async fn submit_score(
    state: web::Data<LeaderboardHandlerState>,
    payload: web::Json<SubmitScoreRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    let entries = state
        .service
        .submit(request.name.as_ref(), request.score.as_ref())
        .await?;

    Ok(HttpResponse::Created().json(LeaderboardResponse { entries }))
}

pub async fn method_not_allowed() -> Result<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}

/// Body extractor settings: size cap, any content type, parse failures as 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .content_type(|_| true)
        .content_type_required(false)
        .error_handler(|err, _req| {
            debug!("Rejected leaderboard request body: {}", err);
            AppError::BadRequest(err.to_string()).into()
        })
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/leaderboard")
            .app_data(json_config())
            .route(web::get().to(get_leaderboard))
            .route(web::post().to(submit_score))
            .default_service(web::to(method_not_allowed)),
    );
}
