use crate::resolve::StreamFallback;
use std::path::PathBuf;

pub const DEFAULT_MAX_PERIODS: u8 = 8;
const MAX_PERIODS_CEILING: u8 = 12;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub workspace: Option<PathBuf>,
    pub max_periods: u8,
    pub unknown_stream: StreamFallback,
    pub font_dir: PathBuf,
    pub font_name: String,
    pub institution: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_filter: "info".to_string(),
            workspace: None,
            max_periods: DEFAULT_MAX_PERIODS,
            unknown_stream: StreamFallback::default(),
            font_dir: PathBuf::from("./fonts"),
            font_name: "LiberationSans".to_string(),
            institution: "Smart Presence".to_string(),
        }
    }
}

impl Config {
    /// Reads `ATTENDD_*` variables, after loading `.env` when one exists.
    /// Returns the config plus one warning per value that had to be ignored;
    /// logging is not up yet when this runs.
    pub fn from_env() -> (Config, Vec<String>) {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> (Config, Vec<String>) {
        let mut cfg = Config::default();
        let mut warnings = Vec::new();
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("ATTENDD_LOG") {
            cfg.log_filter = v;
        }
        cfg.workspace = get("ATTENDD_WORKSPACE").map(PathBuf::from);

        if let Some(v) = get("ATTENDD_MAX_PERIODS") {
            match v.parse::<i64>() {
                Ok(n) => {
                    cfg.max_periods = n.clamp(1, MAX_PERIODS_CEILING as i64) as u8;
                    if cfg.max_periods as i64 != n {
                        warnings.push(format!(
                            "ATTENDD_MAX_PERIODS={n} clamped to {}",
                            cfg.max_periods
                        ));
                    }
                }
                Err(_) => warnings.push(format!(
                    "ATTENDD_MAX_PERIODS={v:?} is not a number; using {DEFAULT_MAX_PERIODS}"
                )),
            }
        }

        if let Some(v) = get("ATTENDD_UNKNOWN_STREAM") {
            match StreamFallback::parse(&v) {
                Some(f) => cfg.unknown_stream = f,
                None => warnings.push(format!(
                    "ATTENDD_UNKNOWN_STREAM={v:?} must be default:<id> or reject"
                )),
            }
        }

        if let Some(v) = get("ATTENDD_FONT_DIR") {
            cfg.font_dir = PathBuf::from(v);
        }
        if let Some(v) = get("ATTENDD_FONT_NAME") {
            cfg.font_name = v;
        }
        if let Some(v) = get("ATTENDD_INSTITUTION") {
            cfg.institution = v;
        }

        (cfg, warnings)
    }
}
