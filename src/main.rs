use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use campusd::config::CoreConfig;
use campusd::ipc;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about = "Campus identity and aggregation sidecar")]
struct Args {
    /// JSON config file merged over the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries responses, so logs go to stderr (env_logger's default).
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = CoreConfig::load(args.config.as_deref())?;
    log::info!(
        "campusd {} ready (empty attendance = {}%, low threshold = {}%)",
        env!("CARGO_PKG_VERSION"),
        config.attendance.empty_percentage,
        config.attendance.low_threshold
    );
    let mut state = ipc::AppState { config };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::error!("stdin closed: {}", e);
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
                log::warn!("unparseable request: {}", e);
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                writeln!(stdout, "{}", resp)?;
                stdout.flush()?;
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}
