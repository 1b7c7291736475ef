use anyhow::Result;
use impervious::{DiskStore, LayerFingerprints};

use super::load_config;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut store = DiskStore::new(&args.layers)
        .with_parcels(&args.parcels)
        .with_output(&args.output);

    tracing::info!(layers = %args.layers.display(), parcels = %args.parcels.display(), "loading inputs");
    let inputs = impervious::load(&config, &store, &store)?;

    if let Some(state) = &args.state {
        match LayerFingerprints::load(state)? {
            Some(previous) => {
                let changed = inputs.fingerprints.changed_since(&previous);
                if changed.is_empty() && !args.force {
                    eprintln!("[run] inputs unchanged since last run, skipping (use --force to rerun)");
                    return Ok(())
                }
                tracing::info!(?changed, "inputs changed");
            }
            None => tracing::info!(state = %state.display(), "no previous state"),
        }
    }

    let report = impervious::execute(&config, inputs, &mut store)?;

    if let Some(state) = &args.state {
        report.fingerprints.save(state)?;
    }

    let area = report.regions.iter().map(|r| r.area()).sum::<f64>();
    eprintln!(
        "[run] {} regions ({area:.2} impervious), {} parcels -> {}",
        report.regions.len(),
        report.summaries.len(),
        args.output.display(),
    );
    if report.manifest.is_degraded() {
        eprintln!("[run] degraded: {} categories failed, see manifest", report.manifest.failed_categories.len());
    }

    Ok(())
}
