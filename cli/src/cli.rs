use std::path::PathBuf;

/// Impervious surface resolver and per-parcel area aggregator
#[derive(clap::Parser, Debug)]
#[command(name = "impervious", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Resolve all layers and write regions, parcel summaries and the manifest
    Run(RunArgs),

    /// Decode and repair the layers without resolving, print the manifest
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Directory holding one `<category>.geojson` per surface layer
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub layers: PathBuf,

    /// Parcel GeoJSON file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub parcels: PathBuf,

    /// Output directory
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// JSON configuration file, defaults are used when omitted
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Fingerprint state file; the run is skipped when no input changed
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub state: Option<PathBuf>,

    /// Run even if the inputs are unchanged
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Directory holding one `<category>.geojson` per surface layer
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub layers: PathBuf,

    /// JSON configuration file, defaults are used when omitted
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}
