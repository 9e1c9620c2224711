use serde::Deserialize;
use std::sync::Arc;
use warp::Filter;

use crate::room_manager::RoomManager;
use crate::websocket::ConnectionManager;
use game_persistence::repositories::PlayerRepository;

pub mod config;
pub mod room_manager;
pub mod websocket;

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<u64>,
}

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    player_repository: Arc<PlayerRepository>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let room_manager_filter = warp::any().map({
        let room_manager = room_manager.clone();
        move || room_manager.clone()
    });

    let player_repository_filter = warp::any().map({
        let player_repository = player_repository.clone();
        move || player_repository.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .and(room_manager_filter.clone())
        .and(player_repository_filter.clone())
        .map(|ws: warp::ws::Ws, conn_mgr, room_mgr, repo| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, room_mgr, repo)
            })
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Room document endpoint - lets an invite link preview the room
    let room_state = warp::path!("room" / String)
        .and(warp::get())
        .and(room_manager_filter.clone())
        .and_then(handle_room_request);

    // Leaderboard endpoint
    let leaderboard = warp::path("leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(player_repository_filter.clone())
        .and_then(handle_leaderboard_request);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(room_state)
        .or(leaderboard)
        .with(cors)
        .with(warp::log("tictactoe"))
}

async fn handle_room_request(
    code: String,
    room_manager: Arc<RoomManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match room_manager.get_room(&code).await {
        Some(room) => Ok(warp::reply::with_status(
            warp::reply::json(&room),
            warp::http::StatusCode::OK,
        )),
        None => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Room not found"
            })),
            warp::http::StatusCode::NOT_FOUND,
        )),
    }
}

async fn handle_leaderboard_request(
    query: LeaderboardQuery,
    player_repository: Arc<PlayerRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let limit = query.limit.unwrap_or(10).min(100); // Default 10, max 100

    match player_repository.get_leaderboard(limit).await {
        Ok(leaderboard) => Ok(warp::reply::with_status(
            warp::reply::json(&leaderboard),
            warp::http::StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("Failed to fetch leaderboard: {}", err);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to fetch leaderboard"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
