mod app;
mod chat_core;
mod logging;
mod model;
mod services;
mod theme;
mod ui;
mod visuals;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    let (cfg, cfg_path) = model::load_config()?;
    match logging::init_file_logging(&cfg) {
        Ok(path) => tracing::info!(log = %path.display(), "equilibria-tui starting"),
        Err(e) => eprintln!("warning: logging disabled: {e:#}"),
    }
    if let Some(p) = &cfg_path {
        tracing::info!(config = %p.display(), "loaded config");
    }
    ui::run(cfg, cfg_path)
}
