use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const APP_DIR: &str = "octagon_terminal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Live,
    Offline,
}

impl Variant {
    pub fn suggestion_limit(self) -> usize {
        match self {
            Variant::Live => 10,
            Variant::Offline => 5,
        }
    }

    pub fn blur_grace(self) -> Duration {
        match self {
            Variant::Live => Duration::from_millis(200),
            Variant::Offline => Duration::from_millis(150),
        }
    }

    /// Whether the result view spells the confidence out as High/Medium/Low.
    pub fn qualitative_confidence(self) -> bool {
        matches!(self, Variant::Offline)
    }

    pub fn fetches_comparison(self) -> bool {
        matches!(self, Variant::Live)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub variant: Variant,
    pub request_timeout: Duration,
    /// `None` keeps the error banner up until the next submit.
    pub error_dismiss: Option<Duration>,
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            variant: Variant::Live,
            request_timeout: Duration::from_secs(10),
            error_dismiss: Some(Duration::from_secs(5)),
            state_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let api_url = env::var("OCTAGON_API_URL")
            .ok()
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let variant = env::var("OCTAGON_BACKEND")
            .ok()
            .and_then(|val| parse_variant(&val))
            .unwrap_or(Variant::Live);
        let timeout_secs = env::var("OCTAGON_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(10)
            .max(1);
        let dismiss_secs = env::var("OCTAGON_ERROR_DISMISS_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(5);
        let state_dir = env::var("OCTAGON_STATE_DIR")
            .ok()
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        // The offline demo never auto-hid its error banner.
        let error_dismiss = match variant {
            Variant::Live if dismiss_secs > 0 => Some(Duration::from_secs(dismiss_secs)),
            _ => None,
        };

        Self {
            api_url,
            variant,
            request_timeout: Duration::from_secs(timeout_secs),
            error_dismiss,
            state_dir,
        }
    }

    pub fn state_file(&self) -> Option<PathBuf> {
        let dir = match &self.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        Some(dir.join("state.json"))
    }
}

pub fn parse_variant(raw: &str) -> Option<Variant> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "live" | "http" => Some(Variant::Live),
        "offline" | "mock" | "demo" => Some(Variant::Offline),
        _ => None,
    }
}

fn default_state_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}
