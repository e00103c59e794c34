//! Server configuration from environment variables.

use anyhow::Context;
use feud_core::QuestionBank;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address (`SERVER_ADDR`, port overridden by `PORT`/`SOCKET_PORT`)
    pub addr: SocketAddr,
    /// JSON question bank (`QUESTION_BANK`), built-in bank when unset
    pub question_bank: Option<PathBuf>,
    /// Browser origins allowed to open a socket (`CORS_ORIGIN`, comma separated)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let mut addr: SocketAddr = raw_addr
            .parse()
            .with_context(|| format!("invalid SERVER_ADDR '{}'", raw_addr))?;

        if let Some(port) = lookup("PORT").or_else(|| lookup("SOCKET_PORT")) {
            let port = port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port '{}'", port))?;
            addr.set_port(port);
        }

        let question_bank = lookup("QUESTION_BANK")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let mut allowed_origins: Vec<String> = lookup("CORS_ORIGIN")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if allowed_origins.is_empty() {
            allowed_origins = DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect();
        }

        Ok(Self {
            addr,
            question_bank,
            allowed_origins,
        })
    }

    /// Load the configured question bank
    pub fn load_bank(&self) -> anyhow::Result<QuestionBank> {
        let bank = match &self.question_bank {
            Some(path) => QuestionBank::load(path)
                .with_context(|| format!("loading question bank {}", path.display()))?,
            None => QuestionBank::builtin(),
        };
        info!(questions = bank.len(), "question bank loaded");
        Ok(bank)
    }

    /// Requests without an `Origin` header (health checks, CLI tools) are allowed
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.allowed_origins.iter().any(|o| o == origin),
        }
    }
}
