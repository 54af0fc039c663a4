//! Fixed paths, endpoints and intervals, overridable through `EPIDAILY_*`
//! environment variables. There is deliberately no CLI surface: the daemon
//! targets one upstream dataset and one directory layout.

use std::path::PathBuf;
use std::time::Duration;

pub const DATA_REPO_URL: &str = "https://github.com/CSSEGISandData/COVID-19";

pub const DEFAULT_GIT_PATH: &str = "data/git/COVID-19";
pub const DEFAULT_REPORTS_SUBDIR: &str = "csse_covid_19_data/csse_covid_19_daily_reports";
pub const DEFAULT_PUBLIC_PATH: &str = "www";
pub const DEFAULT_CONVERTED_PATH: &str = "www/data/daily_reports/json";
pub const DEFAULT_SUMMARY_PATH: &str = "www/data/daily_reports/summary.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// First day of the dataset; alias slots point here until the first cycle
/// has produced real output.
pub const FIRST_REPORT_JSON: &str = "2020-01-22.json";

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_UPDATE_CYCLE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub repo_url: String,
    /// Local mirror of the upstream repository.
    pub git_path: PathBuf,
    /// Directory of dated CSVs inside the mirror.
    pub reports_path: PathBuf,
    /// Root served by the static-file fallback.
    pub public_path: PathBuf,
    /// Per-day converted JSON output.
    pub converted_path: PathBuf,
    /// Rolling summary, overwritten each cycle.
    pub summary_path: PathBuf,
    pub bind_addr: String,
    /// Deadline for one clone or pull.
    pub git_timeout: Duration,
    /// Wall time between ingestion cycles.
    pub update_cycle: Duration,
}

impl Config {
    pub fn from_env() -> Config {
        let git_path = PathBuf::from(env_or("EPIDAILY_GIT_PATH", DEFAULT_GIT_PATH));
        let reports_path = git_path.join(DEFAULT_REPORTS_SUBDIR);
        Config {
            repo_url: env_or("EPIDAILY_REPO_URL", DATA_REPO_URL),
            git_path,
            reports_path,
            public_path: PathBuf::from(env_or("EPIDAILY_PUBLIC_PATH", DEFAULT_PUBLIC_PATH)),
            converted_path: PathBuf::from(env_or(
                "EPIDAILY_CONVERTED_PATH",
                DEFAULT_CONVERTED_PATH,
            )),
            summary_path: PathBuf::from(env_or("EPIDAILY_SUMMARY_PATH", DEFAULT_SUMMARY_PATH)),
            bind_addr: env_or("EPIDAILY_BIND", DEFAULT_BIND_ADDR),
            git_timeout: env_secs("EPIDAILY_GIT_TIMEOUT_SECS", DEFAULT_GIT_TIMEOUT),
            update_cycle: env_secs("EPIDAILY_UPDATE_CYCLE_SECS", DEFAULT_UPDATE_CYCLE),
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
