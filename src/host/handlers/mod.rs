//! Handler module declarations and request dispatch

pub mod file;
pub mod query;
pub mod routing;

pub use file::*;
pub use query::*;
pub use routing::*;

use super::protocol::{error_codes, Request, Response};
use super::state::ServerState;

/// Route one request to its handler
pub fn handle_request(state: &mut ServerState, request: Request) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "Load" => handle_load(state, id, params),
        "Save" => handle_save(state, id, params),
        "Close" => handle_close(state, id),
        "GetState" => handle_get_state(state, id),
        "GetItems" => handle_get_items(state, id, params),
        "StartRouting" => handle_start_routing(state, id, params),
        "StartDrag" => handle_start_drag(state, id, params),
        "Move" => handle_move(state, id, params),
        "Fix" => handle_fix(state, id, params),
        "UndoSegment" => handle_undo_segment(state, id),
        "Cancel" => handle_cancel(state, id),
        "ToggleVia" => handle_toggle_via(state, id),
        "SwitchLayer" => handle_switch_layer(state, id, params),
        "FlipPosture" => handle_flip_posture(state, id),
        "AmplitudeStep" => handle_amplitude_step(state, id, params),
        "SpacingStep" => handle_spacing_step(state, id, params),
        "SetMode" => handle_set_mode(state, id, params),
        "UndoCommit" => handle_undo_commit(state, id),
        _ => Response::error(id, error_codes::METHOD_NOT_FOUND, format!("Method not found: {method}")),
    }
}
