//! Binary entry point: resolve the configuration, start logging, load the
//! catalog, and drive the Ratatui event loop until the user exits.
use anyhow::Context;
use library_catalog::{logging, run_app, App, Catalog, Config, Storage};
use tracing::{error, info};

/// Returning a `Result` bubbles fatal startup problems (an unreadable data
/// directory, for example) to the terminal instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    logging::init(&config)?;
    info!(dir = %config.data_dir.display(), "starting library catalog");

    let (catalog, report) = Catalog::open(Storage::new(&config.data_dir))
        .with_context(|| format!("failed to load catalog from {}", config.data_dir.display()))?;

    let mut app = App::with_load_report(catalog, &report);
    let outcome = run_app(&mut app);

    // Final snapshot, whether the UI exited cleanly or not.
    if let Err(err) = app.catalog().save_all() {
        error!("final save failed: {err}");
        outcome?;
        return Err(err).context("failed to save catalog on exit");
    }

    outcome
}
