mod annual;
mod bulletin;
mod comments;
mod competency;
mod db;
mod grading;
mod ipc;
mod model;
mod telemetry;
mod weighting;

use std::io::{self, BufRead, Write};

fn main() {
    if let Err(e) = telemetry::init(telemetry::DEFAULT_FILTER) {
        // Logging is optional; the IPC channel still works without it.
        eprintln!("bulletind: {e}");
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bulletind started");

    let mut state = ipc::AppState::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed; shutting down");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparsable request line");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed; bulletind exiting");
}
