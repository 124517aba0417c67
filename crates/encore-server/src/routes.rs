use std::path::{Component, Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use encore_core::{MediaRecord, ScrapeRecord};

use crate::error::AppError;
use crate::AppState;

type Result<T> = std::result::Result<T, AppError>;

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/alive", get(alive))
        .route("/scrapes", get(list_scrapes))
        .route(
            "/scrape/*path",
            get(scrape_status).post(start_scrape).delete(stop_scrape),
        )
        .route("/dirs", get(list_root_dirs))
        .route("/dirs/*path", get(list_dirs))
        .route("/videos", get(list_videos))
        .route("/videos/:hash", get(get_video))
}

async fn alive() -> impl IntoResponse {
    Json(json!({ "alive": true }))
}

async fn start_scrape(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<(StatusCode, Json<ScrapeRecord>)> {
    let root = resolve(&state.browse_root, &raw)?;
    let record = state.engine.start(&root).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

async fn scrape_status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ScrapeRecord>> {
    let root = resolve(&state.browse_root, &raw)?;
    match state.engine.status(&root).await? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::ScrapeNotFound(root)),
    }
}

async fn stop_scrape(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<(StatusCode, Json<ScrapeRecord>)> {
    let root = resolve(&state.browse_root, &raw)?;
    if state.engine.status(&root).await?.is_none() {
        return Err(AppError::ScrapeNotFound(root));
    }
    state.engine.stop(&root).await?;
    let record = state
        .engine
        .status(&root)
        .await?
        .ok_or(AppError::ScrapeNotFound(root))?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

async fn list_scrapes(State(state): State<AppState>) -> Result<Json<Vec<ScrapeRecord>>> {
    Ok(Json(state.engine.status_all().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DirListing {
    path: PathBuf,
    directories: Vec<String>,
}

async fn list_root_dirs(State(state): State<AppState>) -> Result<Json<DirListing>> {
    let root = state.browse_root.clone();
    Ok(Json(read_dirs(root).await?))
}

async fn list_dirs(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<DirListing>> {
    let path = resolve(&state.browse_root, &raw)?;
    Ok(Json(read_dirs(path).await?))
}

async fn read_dirs(path: PathBuf) -> Result<DirListing> {
    let not_found = |source: std::io::Error| AppError::DirNotFound {
        path: path.clone(),
        source,
    };
    let mut entries = tokio::fs::read_dir(&path).await.map_err(not_found)?;

    let mut directories = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(not_found)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks, so linked directories are listed too.
        if tokio::fs::metadata(entry.path())
            .await
            .is_ok_and(|meta| meta.is_dir())
        {
            directories.push(name);
        }
    }
    directories.sort();
    Ok(DirListing { path, directories })
}

async fn list_videos(State(state): State<AppState>) -> Json<Vec<MediaRecord>> {
    Json(state.catalog.list())
}

async fn get_video(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<MediaRecord>> {
    state
        .catalog
        .get(&hash)
        .map(Json)
        .ok_or(AppError::VideoNotFound(hash))
}

/// Resolve a request path below `base`, refusing to climb out of it.
fn resolve(base: &FsPath, raw: &str) -> Result<PathBuf> {
    let mut path = base.to_path_buf();
    for component in FsPath::new(raw).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(AppError::IllegalPath(raw.to_string()));
            }
        }
    }
    Ok(path)
}
