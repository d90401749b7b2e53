use std::io::{BufRead, Write};

use affect_recommender::config::Config;
use affect_recommender::logging::init_tracing;
use affect_recommender::protocol::handle_line;
use affect_recommender::state::AppState;

fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "invalid engine configuration");
            std::process::exit(2);
        }
    };
    let engine = state.engine();

    tracing::info!(
        data_dir = %config.data_dir.display(),
        journal = config.feedback_journal,
        "recommender ready, reading requests from stdin"
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "failed to read request");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&engine, &line);
        if writeln!(stdout, "{reply}").and_then(|_| stdout.flush()).is_err() {
            tracing::warn!("stdout closed, stopping");
            break;
        }
    }

    tracing::info!(uptime_secs = state.uptime_seconds(), "recommender stopped");
}
