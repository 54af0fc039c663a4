//! One-shot conversion of the local mirror into per-day JSON plus the
//! rolling summary, without syncing or serving. Useful for rebuilding the
//! published outputs after changing paths or recovering a box.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use epidaily::config::Config;
use epidaily::pipeline;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env();
    if !cfg.reports_path.is_dir() {
        anyhow::bail!(
            "daily reports directory not found: {} (clone the data repository first)",
            cfg.reports_path.display()
        );
    }

    let days = pipeline::refresh_data_files(&cfg)
        .with_context(|| format!("converting reports from {}", cfg.reports_path.display()))?;
    println!(
        "conversion complete: days={days} output={}",
        cfg.converted_path.display()
    );
    Ok(())
}
