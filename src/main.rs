use gradebookd::ipc;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState::default();
    if let Ok(path) = std::env::var("GRADEBOOKD_WORKSPACE") {
        if !path.trim().is_empty() {
            let boot = ipc::Request {
                id: "boot".to_string(),
                method: "workspace.select".to_string(),
                params: serde_json::json!({ "path": path }),
            };
            let _ = ipc::handle_request(&mut state, boot);
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
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
}
