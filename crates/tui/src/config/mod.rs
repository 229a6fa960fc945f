use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dashboard::WritePolicy;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    section::Section,
};

const DEFAULT_CONFIG_PATH: &str = "config/pharmadesk.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub email: String,
    pub page_size: usize,
    pub poll_interval_secs: u64,
    pub timezone: String,
    pub state_path: String,
    pub log_path: String,
    pub log_level: String,
    pub export_dir: String,
    pub export_delimiter: char,
    pub write_policy: WritePolicy,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api/vendor".to_string(),
            email: String::new(),
            page_size: 10,
            poll_interval_secs: 30,
            timezone: "UTC".to_string(),
            state_path: "config/pharmadesk_state.json".to_string(),
            log_path: "logs/pharmadesk.log".to_string(),
            log_level: "info".to_string(),
            export_dir: "exports".to_string(),
            export_delimiter: ',',
            write_policy: WritePolicy::Optimistic,
            request_timeout_secs: 15,
        }
    }
}

impl AppConfig {
    /// The delimiter as a single byte, as the CSV writer expects.
    ///
    /// Non-ASCII characters, `"` and line breaks are rejected.
    pub fn delimiter(&self) -> Result<u8> {
        let byte = u8::try_from(self.export_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                AppError::InvalidConfig(format!(
                    "export_delimiter must be an ASCII character, got {:?}",
                    self.export_delimiter
                ))
            })?;
        if matches!(byte, b'"' | b'\n' | b'\r') {
            return Err(AppError::InvalidConfig(format!(
                "export_delimiter cannot be {:?}",
                self.export_delimiter
            )));
        }
        Ok(byte)
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| AppError::InvalidConfig(format!("unknown timezone {}", self.timezone)))
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AppError::InvalidConfig(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::InvalidConfig(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        self.delimiter()?;
        self.timezone()?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(name = "pharmadesk", version, about = "Vendor dashboard for the medicine delivery platform")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:5000/api/vendor).
    #[arg(long)]
    base_url: Option<String>,
    /// Prefill the login email (the password is never read from CLI).
    #[arg(long)]
    email: Option<String>,
    /// Rows per page.
    #[arg(long)]
    page_size: Option<usize>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Log level for the log file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Interactive terminal dashboard (default).
    Tui,
    /// Write the filtered collection as CSV without opening the dashboard.
    Export {
        entity: Section,
        /// Output file.
        #[arg(long)]
        out: PathBuf,
        /// Filter as field=value; repeatable. Ranges use min..max.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
        /// Override export_delimiter.
        #[arg(long)]
        delimiter: Option<char>,
    },
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {raw}"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in {raw}"));
    }
    Ok((field.to_string(), value.to_string()))
}

pub fn load() -> Result<(AppConfig, Command)> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("PHARMADESK"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(email) = args.email {
        settings.email = email;
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    let command = args.command.unwrap_or(Command::Tui);
    if let Command::Export {
        delimiter: Some(delimiter),
        ..
    } = &command
    {
        settings.export_delimiter = *delimiter;
    }

    settings.validate()?;
    Ok((settings, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.delimiter().unwrap(), b',');
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = AppConfig {
            page_size: 0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let config = AppConfig {
            export_delimiter: '§',
            ..AppConfig::default()
        };
        assert!(config.delimiter().is_err());
    }

    #[test]
    fn quote_and_line_break_delimiters_are_rejected() {
        for export_delimiter in ['"', '\n', '\r'] {
            let config = AppConfig {
                export_delimiter,
                ..AppConfig::default()
            };
            assert!(matches!(config.delimiter(), Err(AppError::InvalidConfig(_))));
        }
        let tabs = AppConfig {
            export_delimiter: '\t',
            ..AppConfig::default()
        };
        assert_eq!(tabs.delimiter().unwrap(), b'\t');
    }

    #[test]
    fn filter_arguments_split_on_first_equals() {
        assert_eq!(
            parse_filter("total=10..20").unwrap(),
            ("total".to_string(), "10..20".to_string())
        );
        assert_eq!(
            parse_filter("search=a=b").unwrap(),
            ("search".to_string(), "a=b".to_string())
        );
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn export_subcommand_parses() {
        let args = Args::try_parse_from([
            "pharmadesk",
            "export",
            "orders",
            "--out",
            "orders.csv",
            "--filter",
            "status=Pending",
        ])
        .unwrap();
        match args.command {
            Some(Command::Export {
                entity, filters, ..
            }) => {
                assert_eq!(entity, Section::Orders);
                assert_eq!(filters, [("status".to_string(), "Pending".to_string())]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
