mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use pns_router::host::protocol::error_codes;
    use pns_router::host::{handle_request, BoardDescription, Request, Response, ServerState};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pns_router_{}_{name}.json", std::process::id()))
    }

    fn call(state: &mut ServerState, method: &str, params: Value) -> Response {
        let request: Request = serde_json::from_value(json!({ "id": 1, "method": method, "params": params })).unwrap();
        let response = handle_request(state, request);
        println!("{method} -> {}", serde_json::to_string(&response).unwrap());
        response
    }

    fn error_code(response: &Response) -> Option<i32> {
        response.error.as_ref().map(|e| e.code)
    }

    fn loaded_state(name: &str) -> (ServerState, PathBuf) {
        let path = temp_path(name);
        board(vec![pad_item(pt(0, 0), 300_000, 1), pad_item(pt(3 * MM, 0), 300_000, 1)]).save(&path).unwrap();
        let mut state = ServerState::new();
        let response = call(&mut state, "Load", json!({ "file_path": path.to_string_lossy() }));
        assert!(!response.is_error());
        (state, path)
    }

    #[test]
    fn test_requests_need_a_board() {
        let mut state = ServerState::new();
        let response = call(&mut state, "Move", json!({ "x": 0, "y": 0 }));
        assert_eq!(error_code(&response), Some(error_codes::NO_BOARD_LOADED));
        let response = call(&mut state, "GetState", Value::Null);
        assert_eq!(error_code(&response), Some(error_codes::NO_BOARD_LOADED));
        let response = call(&mut state, "Frobnicate", Value::Null);
        assert_eq!(error_code(&response), Some(error_codes::METHOD_NOT_FOUND));
    }

    #[test]
    fn test_route_save_and_undo_over_protocol() {
        let (mut state, path) = loaded_state("route");

        let response = call(&mut state, "StartRouting", json!({ "x": 0, "y": 0, "layer": "F.Cu" }));
        let result = response.result.unwrap();
        assert_eq!(result["action"], "Updated");
        assert_eq!(result["router"]["state"], "RouteTrack");
        assert_eq!(result["router"]["layer"], "F.Cu");

        let response = call(&mut state, "Move", json!({ "x": 3 * MM, "y": 0 }));
        let preview = &response.result.unwrap()["router"]["preview"];
        assert!(!preview["items"].as_array().unwrap().is_empty());

        let response = call(&mut state, "Fix", json!({ "x": 3 * MM, "y": 0 }));
        let result = response.result.unwrap();
        assert_eq!(result["action"], "Committed");
        assert_eq!(result["router"]["state"], "Idle");
        assert_eq!(result["router"]["undo_depth"], 1);

        let response = call(&mut state, "GetItems", json!({ "layer": "F.Cu" }));
        assert_eq!(response.result.unwrap()["items"].as_array().unwrap().len(), 3);

        let saved = temp_path("route_saved");
        let response = call(&mut state, "Save", json!({ "file_path": saved.to_string_lossy() }));
        assert!(!response.is_error());
        let reloaded = BoardDescription::load(&saved).unwrap();
        assert_eq!(reloaded.items.len(), 3);
        assert_eq!(reloaded.layers, vec!["F.Cu".to_string(), "B.Cu".to_string()]);

        let response = call(&mut state, "UndoCommit", Value::Null);
        assert_eq!(response.result.unwrap()["undone"], true);
        let response = call(&mut state, "GetItems", Value::Null);
        assert_eq!(response.result.unwrap()["items"].as_array().unwrap().len(), 2);

        let response = call(&mut state, "Close", Value::Null);
        assert_eq!(response.result.unwrap()["closed"], true);
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(saved);
    }

    #[test]
    fn test_bad_params_and_layers_are_reported() {
        let (mut state, path) = loaded_state("errors");

        let response = call(&mut state, "StartRouting", json!({ "x": 0, "y": 0, "layer": "In5.Cu" }));
        assert_eq!(error_code(&response), Some(error_codes::LAYER_NOT_FOUND));
        let response = call(&mut state, "Move", json!({ "x": "left" }));
        assert_eq!(error_code(&response), Some(error_codes::INVALID_PARAMS));

        // a second start while routing is refused
        call(&mut state, "StartRouting", json!({ "x": 0, "y": 0, "layer": "F.Cu" }));
        let response = call(&mut state, "StartRouting", json!({ "x": 0, "y": 0, "layer": "F.Cu" }));
        assert_eq!(error_code(&response), Some(error_codes::ROUTER_REJECTED));
        let response = call(&mut state, "UndoCommit", Value::Null);
        assert_eq!(error_code(&response), Some(error_codes::ROUTER_REJECTED));

        let response = call(&mut state, "Cancel", Value::Null);
        assert_eq!(response.result.unwrap()["action"], "Cancelled");
        let _ = std::fs::remove_file(path);
    }
}
