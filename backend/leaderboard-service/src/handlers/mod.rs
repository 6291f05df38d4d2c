pub mod assets;
pub mod leaderboard;

use actix_web::web;

pub use assets::{serve_asset, StaticAssets};
pub use leaderboard::{get_leaderboard, submit_score, LeaderboardHandlerState, MAX_BODY_BYTES};

/// Configure routes for the leaderboard service.
///
/// Expects `web::Data<LeaderboardHandlerState>` and `web::Data<StaticAssets>`
/// to be registered on the app.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }));
    leaderboard::register_routes(cfg);
    cfg.default_service(web::to(serve_asset));
}
