use std::{fs, path::Path, sync::Mutex};

use crate::{config::AppConfig, error::Result};

/// Sends tracing output to the configured log file; the terminal itself is
/// owned by the dashboard while it runs.
pub fn init(config: &AppConfig) -> Result<()> {
    let path = Path::new(&config.log_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pharmadesk={level},dashboard={level}",
            level = config.log_level
        ))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
