use anyhow::{Context, Result};
use impervious::DiskStore;

use super::load_config;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::CheckArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = DiskStore::new(&args.layers);

    let manifest = impervious::check(&config, &store)?;
    println!("{}", serde_json::to_string_pretty(&manifest).context("[check] Failed to serialize manifest")?);

    eprintln!(
        "[check] {} excluded features, {} empty categories",
        manifest.excluded.len(),
        manifest.empty_categories.len(),
    );
    Ok(())
}
