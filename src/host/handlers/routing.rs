//! Interactive routing: gestures and their in-flight adjustments
//!
//! Every handler turns its params into a `RouterEvent`, feeds it to the
//! router and answers with the resulting action plus the fresh preview.

use super::query::router_snapshot;
use crate::geometry::Point;
use crate::host::headless::HeadlessHost;
use crate::host::protocol::{error_codes, parse_params, Response};
use crate::host::state::ServerState;
use crate::router::{Router, RouterAction, RouterEvent, RouterInterface, RouterMode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Deserialize)]
struct PosParams {
    x: i64,
    y: i64,
}

#[derive(Deserialize)]
struct StartParams {
    x: i64,
    y: i64,
    layer: String,
}

#[derive(Deserialize)]
struct FixParams {
    x: i64,
    y: i64,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct LayerParams {
    layer: String,
}

#[derive(Deserialize)]
struct StepParams {
    dir: i32,
}

#[derive(Deserialize)]
struct ModeParams {
    mode: RouterMode,
}

fn router_mut<'a>(state: &'a mut ServerState, id: &Option<Value>) -> Result<&'a mut Router<HeadlessHost>, Response> {
    state
        .router
        .as_mut()
        .ok_or_else(|| Response::error(id.clone(), error_codes::NO_BOARD_LOADED, "No board loaded".to_string()))
}

fn board_layer(router: &Router<HeadlessHost>, id: &Option<Value>, name: &str) -> Result<i32, Response> {
    router
        .iface()
        .pns_layer_from_board(name)
        .ok_or_else(|| Response::error(id.clone(), error_codes::LAYER_NOT_FOUND, format!("Unknown layer {name}")))
}

fn apply(router: &mut Router<HeadlessHost>, id: Option<Value>, event: RouterEvent) -> Response {
    debug!(?event, "router event");
    match router.handle_event(event) {
        RouterAction::Rejected(reason) => Response::error(id, error_codes::ROUTER_REJECTED, reason),
        action => Response::success(id, json!({ "action": action, "router": router_snapshot(router) })),
    }
}

/// Shared shape of every handler: parse params, build the event, apply it
fn handle_with<P, F>(state: &mut ServerState, id: Option<Value>, params: Option<Value>, expected: &str, build: F) -> Response
where
    P: for<'de> Deserialize<'de>,
    F: FnOnce(&Router<HeadlessHost>, &Option<Value>, P) -> Result<RouterEvent, Response>,
{
    let params: P = match parse_params(&id, params, expected) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let router = match router_mut(state, &id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match build(router, &id, params) {
        Ok(event) => apply(router, id, event),
        Err(resp) => resp,
    }
}

fn handle_plain(state: &mut ServerState, id: Option<Value>, event: RouterEvent) -> Response {
    match router_mut(state, &id) {
        Ok(router) => apply(router, id, event),
        Err(resp) => resp,
    }
}

pub fn handle_start_routing(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{x, y, layer}", |router, id, p: StartParams| {
        let layer = board_layer(router, id, &p.layer)?;
        Ok(RouterEvent::StartRouting { pos: Point::new(p.x, p.y), layer })
    })
}

pub fn handle_start_drag(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{x, y, layer}", |router, id, p: StartParams| {
        let layer = board_layer(router, id, &p.layer)?;
        Ok(RouterEvent::StartDrag { pos: Point::new(p.x, p.y), layer })
    })
}

pub fn handle_move(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{x, y}", |_, _, p: PosParams| Ok(RouterEvent::Move { pos: Point::new(p.x, p.y) }))
}

pub fn handle_fix(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{x, y, force?}", |_, _, p: FixParams| {
        Ok(RouterEvent::Fix { pos: Point::new(p.x, p.y), force: p.force })
    })
}

pub fn handle_switch_layer(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{layer: string}", |router, id, p: LayerParams| {
        Ok(RouterEvent::SwitchLayer { layer: board_layer(router, id, &p.layer)? })
    })
}

pub fn handle_amplitude_step(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{dir: int}", |_, _, p: StepParams| Ok(RouterEvent::AmplitudeStep { dir: p.dir }))
}

pub fn handle_spacing_step(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{dir: int}", |_, _, p: StepParams| Ok(RouterEvent::SpacingStep { dir: p.dir }))
}

pub fn handle_set_mode(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    handle_with(state, id, params, "{mode: string}", |_, _, p: ModeParams| Ok(RouterEvent::SetMode { mode: p.mode }))
}

pub fn handle_undo_segment(state: &mut ServerState, id: Option<Value>) -> Response {
    handle_plain(state, id, RouterEvent::Undo)
}

pub fn handle_cancel(state: &mut ServerState, id: Option<Value>) -> Response {
    handle_plain(state, id, RouterEvent::Cancel)
}

pub fn handle_toggle_via(state: &mut ServerState, id: Option<Value>) -> Response {
    handle_plain(state, id, RouterEvent::ToggleVia)
}

pub fn handle_flip_posture(state: &mut ServerState, id: Option<Value>) -> Response {
    handle_plain(state, id, RouterEvent::FlipPosture)
}

/// Handle UndoCommit request - reverts the last committed gesture on the board
pub fn handle_undo_commit(state: &mut ServerState, id: Option<Value>) -> Response {
    let router = match router_mut(state, &id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if router.state() != crate::router::RouterState::Idle {
        return Response::error(id, error_codes::ROUTER_REJECTED, "A gesture is in progress".to_string());
    }
    let undone = router.iface_mut().undo();
    if undone {
        router.sync_world();
    }
    Response::success(id, json!({ "undone": undone, "router": router_snapshot(router) }))
}
