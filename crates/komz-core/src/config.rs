//! Gateway configuration.
//!
//! Settings are layered: built-in defaults, then the TOML file, then
//! `.env.local` / `.env`, then process environment variables. API keys are
//! normally supplied through the environment only.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Project name used for config directories and env prefixes.
pub const PROJECT_NAME: &str = "komz";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "KOMZ_CONFIG";

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are the official Komz Consulting Chatbot, a \
professional, calm, friendly, and knowledgeable assistant for https://komzconsulting.com. \
Always greet warmly, answer accurately using only website information (as of Dec 31, 2025), \
and focus on services: application development, cloud migration, infrastructure \
modernization, cyber security, enterprise applications, quality assurance, intelligent \
process automation, artificial intelligence, digital engineering, IoT, chatbot creation, and \
voice agents. Be concise yet complete, never hype or pushy, use \"we/our team\" when \
referring to Komz, and gently guide interested visitors toward a free discovery call or \
contact when natural. If asked about pricing, say we offer fixed rates tailored to the \
project and suggest a short call for details. Never discuss internal info, employee names \
(except public team), or promise specific results without consultation. End every response \
with an open question to continue the conversation. You exist to help businesses build \
reliable, future-ready technology solutions with real expertise.";

/// Top-level configuration for the gateway and the terminal client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Voice-agent provider settings.
    pub retell: RetellConfig,
    /// Generative-language provider settings.
    pub gemini: GeminiConfig,
    /// Demo chat throttling.
    pub rate_limit: RateLimitConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

/// Voice-agent provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetellConfig {
    /// API root.
    pub base_url: String,
    /// Secret API key (`RETELL_API_KEY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Agent used when a request names none (`RETELL_AGENT_ID`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_agent_id: Option<String>,
}

impl Default for RetellConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.retellai.com".to_string(),
            api_key: None,
            default_agent_id: None,
        }
    }
}

/// Generative-language provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API root.
    pub base_url: String,
    /// Secret API key (`GEMINI_API_KEY`, or `VITE_GEMINI_API_KEY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Persona prompt sent with every request.
    pub system_instruction: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Demo chat throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Messages allowed per window.
    pub max_messages: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages: crate::rate_limit::DEMO_RATE_LIMIT,
            window_secs: crate::rate_limit::RESET_INTERVAL.as_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl GatewayConfig {
    /// `<config dir>/komz/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
    }

    /// Picks the config file: explicit path, then `KOMZ_CONFIG`, then the default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Loads the layered configuration.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config file");
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
                Self::from_toml_str(&content)?
            }
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };

        load_dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document, filling unset fields with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config: {e}")))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Overrides settings from environment-style variables.
    ///
    /// `lookup` is usually `std::env::var`; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("RETELL_API_KEY") {
            self.retell.api_key = Some(key);
        }
        if let Some(agent) = get("RETELL_AGENT_ID") {
            self.retell.default_agent_id = Some(agent);
        }
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("VITE_GEMINI_API_KEY")) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(host) = get("KOMZ_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("KOMZ_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config(format!("KOMZ_PORT is not a valid port: {port}")))?;
        }
        Ok(())
    }

    /// Rejects settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_secs == 0 {
            return Err(Error::config("rate_limit.window_secs must be positive"));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host must not be empty"));
        }
        if let Some(origin) = self
            .server
            .cors_origins
            .iter()
            .find(|origin| !is_valid_origin(origin))
        {
            return Err(Error::config(format!(
                "server.cors_origins: invalid origin {origin:?} (expected scheme://host[:port])"
            )));
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |key: &mut Option<String>| {
            if key.is_some() {
                *key = Some("********".to_string());
            }
        };
        mask(&mut copy.retell.api_key);
        mask(&mut copy.gemini.api_key);
        copy
    }

    /// The effective settings as environment variables.
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            ("KOMZ_HOST".to_string(), self.server.host.clone()),
            ("KOMZ_PORT".to_string(), self.server.port.to_string()),
            ("GEMINI_MODEL".to_string(), self.gemini.model.clone()),
        ];
        if let Some(key) = &self.retell.api_key {
            vars.push(("RETELL_API_KEY".to_string(), key.clone()));
        }
        if let Some(agent) = &self.retell.default_agent_id {
            vars.push(("RETELL_AGENT_ID".to_string(), agent.clone()));
        }
        if let Some(key) = &self.gemini.api_key {
            vars.push(("GEMINI_API_KEY".to_string(), key.clone()));
        }
        vars
    }
}

/// `scheme://host[:port]` with an http(s) scheme and no path or whitespace.
fn is_valid_origin(origin: &str) -> bool {
    let Some((scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    matches!(scheme, "http" | "https")
        && !rest.is_empty()
        && !rest.contains('/')
        && rest.bytes().all(|b| b.is_ascii_graphic())
}

/// Loads `.env.local`, then `.env`, from the working directory.
///
/// Variables already set in the process win over both files.
pub fn load_dotenv() {
    if let Ok(path) = dotenv::from_filename(".env.local") {
        tracing::debug!(path = %path.display(), "Loaded env file");
    }
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded env file");
    }
}
