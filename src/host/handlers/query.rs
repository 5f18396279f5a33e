//! Query operations: GetState, GetItems

use crate::host::headless::HeadlessHost;
use crate::host::protocol::{error_codes, Response};
use crate::host::state::ServerState;
use crate::router::{Router, RouterInterface};
use serde::Deserialize;
use serde_json::{json, Value};

/// Router status and the current preview, as sent after every event
pub fn router_snapshot(router: &Router<HeadlessHost>) -> Value {
    let host = router.iface();
    json!({
        "state": router.state(),
        "mode": router.mode(),
        "layer": host.board_layer_from_pns(router.layer()),
        "placing_via": router.is_placing_via(),
        "failure_reason": router.failure_reason(),
        "tuning": router.tuning(),
        "undo_depth": host.undo_depth(),
        "preview": host.preview(),
    })
}

pub fn handle_get_state(state: &mut ServerState, id: Option<Value>) -> Response {
    match state.router.as_ref() {
        Some(router) => Response::success(id, router_snapshot(router)),
        None => Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded".to_string()),
    }
}

/// Handle GetItems request - board items, optionally only those touching one layer
pub fn handle_get_items(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize, Default)]
    struct GetItemsParams {
        layer: Option<String>,
    }

    let params: GetItemsParams = params.and_then(|p| serde_json::from_value(p).ok()).unwrap_or_default();
    let Some(router) = state.router.as_ref() else {
        return Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded".to_string());
    };
    let host = router.iface();
    let layer = match params.layer.as_deref() {
        None => None,
        Some(name) => match host.pns_layer_from_board(name) {
            Some(l) => Some(l),
            None => return Response::error(id, error_codes::LAYER_NOT_FOUND, format!("Unknown layer {name}")),
        },
    };
    let items: Vec<_> = host.items().filter(|item| layer.map_or(true, |l| item.layers.contains(l))).collect();
    Response::success(id, json!({ "items": items }))
}
