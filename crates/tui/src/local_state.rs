use std::{fs, path::Path};

use dashboard::Session;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What survives between runs: the signed-in vendor and the last tab.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LocalState {
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub last_section: Option<String>,
}

impl LocalState {
    pub fn load(path: &str) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let parent = Path::new(path).parent();
        if let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_state() {
        let state = LocalState::load("/nonexistent/pharmadesk/state.json").unwrap();
        assert_eq!(state, LocalState::default());
    }

    #[test]
    fn session_survives_save_and_load() {
        let dir = std::env::temp_dir().join(format!("pharmadesk-state-{}", std::process::id()));
        let path = dir.join("state.json");
        let path = path.to_str().unwrap();

        let state = LocalState {
            session: Some(Session {
                token: "t".to_string(),
                vendor_id: "v1".to_string(),
                email: "shop@example.com".to_string(),
            }),
            last_section: Some("orders".to_string()),
        };
        state.save(path).unwrap();
        assert_eq!(LocalState::load(path).unwrap(), state);

        fs::remove_dir_all(dir).unwrap();
    }
}
