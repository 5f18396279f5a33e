//! File operations: Load, Save, Close

use crate::host::board::BoardDescription;
use crate::host::protocol::{error_codes, parse_params, Response};
use crate::host::state::ServerState;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Handle Load request - reads a board description and builds a fresh router
pub fn handle_load(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize)]
    struct LoadParams {
        file_path: String,
    }

    let params: LoadParams = match parse_params(&id, params, "{file_path: string}") {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let start = Instant::now();
    let board = match BoardDescription::load(&params.file_path) {
        Ok(board) => board,
        Err(e) => {
            warn!(path = %params.file_path, "load failed: {e:#}");
            return Response::error(id, error_codes::INTERNAL_ERROR, format!("{e:#}"));
        }
    };
    let layers = board.layers.clone();
    let items = board.items.len();
    state.open(board, Some(PathBuf::from(&params.file_path)));
    info!(path = %params.file_path, items, elapsed = ?start.elapsed(), "board loaded");

    Response::success(id, json!({ "layers": layers, "item_count": items }))
}

/// Handle Save request - writes the current board, by default over the loaded file
pub fn handle_save(state: &mut ServerState, id: Option<serde_json::Value>, params: Option<serde_json::Value>) -> Response {
    #[derive(Deserialize, Default)]
    struct SaveParams {
        file_path: Option<String>,
    }

    let params: SaveParams = match params {
        None => SaveParams::default(),
        some => match parse_params(&id, some, "{file_path?: string}") {
            Ok(p) => p,
            Err(resp) => return resp,
        },
    };
    let Some(router) = state.router.as_ref() else {
        return Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded".to_string());
    };
    let Some(path) = params.file_path.map(PathBuf::from).or_else(|| state.board_path.clone()) else {
        return Response::error(id, error_codes::INVALID_PARAMS, "No file path to save to".to_string());
    };

    let board = router.iface().describe(router.config());
    if let Err(e) = board.save(&path) {
        warn!(path = %path.display(), "save failed: {e:#}");
        return Response::error(id, error_codes::INTERNAL_ERROR, format!("{e:#}"));
    }
    info!(path = %path.display(), items = board.items.len(), "board saved");
    Response::success(id, json!({ "file_path": path.display().to_string(), "item_count": board.items.len() }))
}

pub fn handle_close(state: &mut ServerState, id: Option<serde_json::Value>) -> Response {
    let was_open = state.router.is_some();
    state.close();
    Response::success(id, json!({ "closed": was_open }))
}
