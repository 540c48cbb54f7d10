use anyhow::Result;

/// Initialize the logging system.
///
/// The `verbose` flag enables debug-level records from this crate;
/// `RUST_LOG` still overrides everything. Call once from the host.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "chordfall=debug,warn"
    } else {
        "chordfall=info,warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init()?;

    Ok(())
}
