use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qiming", about = "A Chinese name generation service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub coze: CozeConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub max_login_attempts: u32,
    pub lockout_minutes: i64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub rate_limit_requests: u32,
    pub rate_limit_window_minutes: u64,
    pub max_body_bytes: usize,
}

/// Credentials and bot ids for the upstream Coze API. The api key is
/// normally supplied via QIMING_COZE_API_KEY rather than the config file.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CozeConfig {
    pub api_base: String,
    pub api_key: String,
    /// Bot that generates name candidates.
    pub bot_id: String,
    /// Bot that generates calligraphy images.
    pub image_bot_id: String,
    pub user_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "qiming_session".to_string(),
            session_hours: 720,
            max_login_attempts: 5,
            lockout_minutes: 15,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: 100,
            rate_limit_window_minutes: 15,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for CozeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.coze.cn".to_string(),
            api_key: String::new(),
            bot_id: String::new(),
            image_bot_id: String::new(),
            user_id: String::new(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Environment overrides for Coze credentials
        config.coze.apply_env();

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("qiming.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".qiming")
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        self.database.path.as_ref().unwrap()
    }
}

impl CozeConfig {
    /// QIMING_COZE_* environment variables take precedence over the file.
    pub fn apply_env(&mut self) {
        for (var, field) in [
            ("QIMING_COZE_API_BASE", &mut self.api_base as &mut String),
            ("QIMING_COZE_API_KEY", &mut self.api_key),
            ("QIMING_COZE_BOT_ID", &mut self.bot_id),
            ("QIMING_COZE_IMAGE_BOT_ID", &mut self.image_bot_id),
            ("QIMING_COZE_USER_ID", &mut self.user_id),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = value;
                }
            }
        }
    }
}
