use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::audio::{ADSRConfig, Wave};
use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "composer.ron";
pub const BACKEND_URL_ENV: &str = "COMPOSER_BACKEND_URL";
/// Engine.IO v4 over a websocket, the transport Socket.IO servers accept.
pub const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub wave: Wave,
    pub adsr: ADSRConfig,
    /// 0.0 -> 1.0
    pub volume: f32,
    pub max_voices: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            wave: Wave::Triangle,
            adsr: ADSRConfig {
                attack: 0.005,
                decay: 0.1,
                sustain: 0.3,
                release: 1.0,
            },
            volume: 0.5,
            max_voices: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub channel_path: String,
    pub tick_interval_ms: u64,
    pub synth: SynthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".to_string(),
            channel_path: SOCKET_IO_PATH.to_string(),
            tick_interval_ms: 5,
            synth: SynthConfig::default(),
        }
    }
}

impl Config {
    /// Reads `composer.ron` from `dir` if it exists, then applies the
    /// `COMPOSER_BACKEND_URL` override.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with(dir, std::env::var(BACKEND_URL_ENV).ok())
    }

    /// [`Config::load`] with the backend URL override passed in.
    pub fn load_with(dir: &Path, backend_url: Option<String>) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let ron_string = fs::read_to_string(&path)?;
            Self::from_ron(&ron_string)?
        } else {
            Self::default()
        };

        if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
            config.backend_url = url;
        }

        Ok(config)
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn file_url(&self) -> Result<Url> {
        let base = self.base_url()?;
        base.join("getfile")
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.backend_url, e)))
    }

    /// Persistent channel endpoint: the backend URL with its scheme swapped
    /// to `ws`/`wss` and `channel_path` appended.
    pub fn channel_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(Error::InvalidUrl(format!(
                    "{}: unsupported scheme {}",
                    self.backend_url, other
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidUrl(self.backend_url.clone()))?;
        url.join(self.channel_path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.backend_url, e)))
    }

    fn base_url(&self) -> Result<Url> {
        let mut raw = self.backend_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.backend_url, e)))
    }
}
