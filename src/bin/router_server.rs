//! Line-delimited JSON-RPC front end for the headless router
//!
//! Reads one request per line on stdin and writes one response per line on
//! stdout. Logs go to stderr; set `RUST_LOG` to change the level.

use pns_router::host::protocol::error_codes;
use pns_router::host::{handle_request, Request, Response, ServerState};
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn write_response(stdout: &mut impl Write, response: &Response) -> io::Result<()> {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!("failed to serialize response: {e}");
            let fallback = Response::error(response.id.clone(), error_codes::INTERNAL_ERROR, e.to_string());
            serde_json::to_string(&fallback).map_err(io::Error::other)?
        }
    };
    writeln!(stdout, "{json}")?;
    stdout.flush()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    info!("starting router server");
    let mut state = ServerState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("error reading stdin: {e}");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(&mut state, request),
            Err(e) => {
                warn!("failed to parse request: {e}");
                Response::error(None, error_codes::PARSE_ERROR, format!("Parse error: {e}"))
            }
        };
        write_response(&mut stdout, &response)?;
    }

    info!("shutting down");
    Ok(())
}
