use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::arena::Match;
use crate::config::{GameConfig, Strategy};
use crate::game::{GameError, Snapshot, Team};

/// Shared handle to the game being watched
#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<WebGame>>,
}

struct WebGame {
    game: Match,
    config: GameConfig,
}

#[derive(Serialize, Deserialize, Default)]
pub struct NewGameRequest {
    seed: Option<u64>,
    rows: Option<usize>,
    cols: Option<usize>,
    roster_size: Option<usize>,
    red: Option<Strategy>,
    blue: Option<Strategy>,
}

#[derive(Serialize)]
pub struct GameResponse {
    snapshot: Snapshot,
    red_bot: String,
    blue_bot: String,
    seed: u64,
    game_over: bool,
    message: String,
}

impl AppState {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        let game = config.build_match()?;
        Ok(AppState {
            game: Arc::new(Mutex::new(WebGame { game, config })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebGame> {
        self.game.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn game_response(web: &WebGame, message: String) -> GameResponse {
    GameResponse {
        snapshot: web.game.state().snapshot(),
        red_bot: web.game.bot_name(Team::Red).to_string(),
        blue_bot: web.game.bot_name(Team::Blue).to_string(),
        seed: web.config.seed,
        game_over: web.game.state().is_game_over(),
        message,
    }
}

#[axum::debug_handler]
async fn new_game(State(app_state): State<AppState>, Json(req): Json<NewGameRequest>) -> Response {
    let mut web = app_state.lock();

    let mut config = web.config.clone();
    if let Some(seed) = req.seed {
        config.seed = seed;
    }
    if let Some(rows) = req.rows {
        config.rows = rows;
    }
    if let Some(cols) = req.cols {
        config.cols = cols;
    }
    if let Some(roster_size) = req.roster_size {
        config.roster_size = roster_size;
    }
    if let Some(red) = req.red {
        config.red = red;
    }
    if let Some(blue) = req.blue {
        config.blue = blue;
    }

    match config.build_match() {
        Ok(game) => {
            web.game = game;
            web.config = config;
            Json(game_response(&web, "New game ready".to_string())).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, format!("Invalid game: {}", e)),
    }
}

#[axum::debug_handler]
async fn step(State(app_state): State<AppState>) -> Response {
    let mut web = app_state.lock();

    if web.game.state().is_game_over() {
        return error_response(StatusCode::BAD_REQUEST, "Game is over".to_string());
    }

    match web.game.step() {
        Ok(report) => {
            let message = match report.winner {
                Some(team) => format!("{} -> {}: {} wins!", report.mv.agent, report.mv.to, team),
                None => format!("{} -> {}", report.mv.agent, report.mv.to),
            };
            Json(game_response(&web, message)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "game aborted");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Game aborted: {}", e))
        }
    }
}

async fn get_game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let web = app_state.lock();
    Json(game_response(&web, String::new()))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/step", post(step))
        .route("/api/game-state", get(get_game_state))
        .fallback_service(ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(addr: &str, config: GameConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("spectator server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn test_app() -> Router {
        router(AppState::new(GameConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_initial_game_state() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/game-state", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snapshot"]["turn"], 0);
        assert_eq!(body["snapshot"]["turn_owner"], "Red");
        assert_eq!(body["red_bot"], "Red Heuristic");
        assert_eq!(body["game_over"], false);
    }

    #[tokio::test]
    async fn test_step_advances_turn() {
        let app = test_app();

        let (status, body) = send(&app, "POST", "/api/step", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snapshot"]["turn"], 1);
        assert_eq!(body["snapshot"]["turn_owner"], "Blue");
        assert!(body["message"].as_str().unwrap().starts_with("Red#"));

        let (_, body) = send(&app, "GET", "/api/game-state", None).await;
        assert_eq!(body["snapshot"]["turn"], 1);
    }

    #[tokio::test]
    async fn test_new_game_applies_overrides() {
        let app = test_app();
        send(&app, "POST", "/api/step", None).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/new-game",
            Some(r#"{ "seed": 5, "rows": 5, "cols": 5, "roster_size": 2, "blue": "random" }"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seed"], 5);
        assert_eq!(body["snapshot"]["turn"], 0);
        assert_eq!(body["blue_bot"], "Blue Random");
        assert_eq!(body["snapshot"]["teams"][1]["base"], 24);
        assert_eq!(body["snapshot"]["teams"][0]["agents"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_new_game_rejects_bad_board() {
        let app = test_app();
        let (status, body) =
            send(&app, "POST", "/api/new-game", Some(r#"{ "roster_size": 0 }"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("roster"));
    }

    #[tokio::test]
    async fn test_new_game_rejects_oversized_board() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/new-game",
            Some(r#"{ "rows": 8589934592, "cols": 8589934592 }"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("exceeds"));

        // The previous game is still being served
        let (status, body) = send(&app, "GET", "/api/game-state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snapshot"]["teams"][1]["base"], 11);
    }
}
