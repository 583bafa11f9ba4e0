//! Song catalog endpoints (/songs/*)
//!
//! Every handler validates its parameters first, then runs its repository
//! calls inside one transaction and lets `SongTransaction::finish` pick
//! commit or rollback from the outcome.

pub mod dto;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::AppState;
use crate::domain::songs;
use crate::models::{
    PageMaxQuery, Song, SongCreateQuery, SongDetail, SongDetailQuery, SongUpdate, SongsQuery,
};
use crate::services::db::SongTransaction;
use crate::services::error::ApiError;
use dto::{Message, Paginator};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route("/songs/info", get(get_song_detail))
        .route("/songs/{id}", axum::routing::patch(update_song))
        .route("/songs/{id}/text", get(get_song_text))
}

fn validate_page(query: PageMaxQuery) -> Result<(), ApiError> {
    if query.page < 0 {
        return Err(ApiError::BadRequest("page must be >= 0".to_string()));
    }
    if query.max < 1 {
        return Err(ApiError::BadRequest("max must be >= 1".to_string()));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

fn song_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Path(id) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(id)
}

/// GET /songs - List songs filtered by group, title and release date
async fn list_songs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SongsQuery>, QueryRejection>,
) -> Result<Json<Paginator<Vec<Song>>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_page(query.pagination())?;

    let mut tx = SongTransaction::begin(&state.db).await?;
    let outcome = songs::get_songs(&mut tx.executor(), &query)
        .await
        .map_err(ApiError::from);
    let (rows, amount) = tx.finish(outcome).await?;

    Ok(Json(Paginator::new(rows, query.pagination(), amount)))
}

/// POST /songs - Create a new song
async fn create_song(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SongCreateQuery>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(payload) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    require("group", &payload.group)?;
    require("song", &payload.song)?;
    require("text", &payload.text)?;
    require("link", &payload.link)?;

    let mut tx = SongTransaction::begin(&state.db).await?;
    let outcome = songs::create_song(&mut tx.executor(), &payload)
        .await
        .map_err(ApiError::from);
    let id = tx.finish(outcome).await?;

    tracing::info!(song_id = id, group = %payload.group, song = %payload.song, "song created");
    Ok((StatusCode::CREATED, Json(Message::success("created"))))
}

/// GET /songs/info?group=&song= - Song details with a lyrics preview
async fn get_song_detail(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SongDetailQuery>, QueryRejection>,
) -> Result<Json<SongDetail>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    require("group", &query.group)?;
    require("song", &query.song)?;

    let mut tx = SongTransaction::begin(&state.db).await?;
    let outcome = songs::get_song(&mut tx.executor(), &query)
        .await
        .map_err(ApiError::from);
    let detail = tx.finish(outcome).await?;

    Ok(Json(detail))
}

/// PATCH /songs/:id - Replace the fields present in the body
async fn update_song(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<SongUpdate>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let id = song_id(path)?;
    let Json(update) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut tx = SongTransaction::begin(&state.db).await?;
    let outcome = async {
        let mut executor = tx.executor();
        if !songs::check_if_exists(&mut executor, id).await? {
            return Err(ApiError::NotFound);
        }
        songs::update_song(&mut executor, &update, id).await?;
        Ok::<_, ApiError>(())
    }
    .await;
    tx.finish(outcome).await?;

    tracing::info!(song_id = id, empty = update.is_empty(), "song updated");
    Ok(Json(Message::success("updated")))
}

/// GET /songs/:id/text?page=&max= - Page through a song's lyrics line by line
async fn get_song_text(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageMaxQuery>, QueryRejection>,
) -> Result<Json<Paginator<Vec<String>>>, ApiError> {
    let id = song_id(path)?;
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_page(query)?;

    let mut tx = SongTransaction::begin(&state.db).await?;
    let outcome = songs::get_song_text(&mut tx.executor(), id, &query)
        .await
        .map_err(ApiError::from);
    let (lines, amount) = tx.finish(outcome).await?;

    Ok(Json(Paginator::new(lines, query, amount)))
}
