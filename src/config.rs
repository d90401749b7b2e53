use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub data_dir: PathBuf,
    pub engine_config: Option<PathBuf>,
    pub feedback_journal: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let engine_config = std::env::var("ENGINE_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let feedback_journal = std::env::var("FEEDBACK_JOURNAL")
            .map(|v| !(v == "false" || v == "0"))
            .unwrap_or(true);

        Self {
            log_level,
            data_dir,
            engine_config,
            feedback_journal,
        }
    }
}
