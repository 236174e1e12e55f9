use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use lcf::{load_events, CleaningConfig, IcaParams, Orchestrator};

#[derive(Parser)]
#[command(name = "lcf-clean", about = "Partitioned ICA + LCF artifact cleaning for EEG sessions")]
struct Args {
    /// Directory holding the recordings; all derived files are written here
    #[arg(long)]
    ephys_dir: PathBuf,

    /// Session events (JSON array of {type, eegoffset, eegfile})
    #[arg(long)]
    events: PathBuf,

    /// Recording to clean (.safetensors); repeat for several
    #[arg(long = "recording", required = true)]
    recordings: Vec<PathBuf>,

    /// IQR multiplier for artifact detection (default: 3.0)
    #[arg(long, default_value_t = 3.0)]
    iqr_thresh: f64,

    /// Dilator / transition window width in seconds (default: 0.1)
    #[arg(long, default_value_t = 0.1)]
    lcf_winsize: f64,

    /// Highpass cutoff in Hz applied before ICA (off unless given)
    #[arg(long)]
    highpass: Option<f32>,

    /// Apply common average reference before ICA
    #[arg(long)]
    reref: bool,

    /// Leave channels listed in <basename>_bad_chan.txt out of the output
    #[arg(long)]
    exclude_bad_channels: bool,

    /// Worker threads for partition jobs (0 = one per core)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Queue name jobs are submitted under
    #[arg(long, default_value = "local")]
    queue: String,

    /// Seed for the ICA initialisation
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let events = load_events(&args.events)?;
    log::info!("loaded {} events from {}", events.len(), args.events.display());

    let cfg = CleaningConfig {
        iqr_thresh: args.iqr_thresh,
        lcf_winsize: args.lcf_winsize,
        highpass_freq: args.highpass,
        reref: args.reref,
        exclude_bad_channels: args.exclude_bad_channels,
        ica: IcaParams { seed: args.seed, ..IcaParams::default() },
        workers: args.workers,
        queue: args.queue,
    };

    let orch = Orchestrator::new(cfg, &args.ephys_dir);
    let report = orch.clean_session(&args.recordings, &events);
    println!(
        "cleaned {}, skipped {}, failed {}",
        report.cleaned.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (path, err) in &report.failed {
        eprintln!("  {}: {err}", path.display());
    }

    if !report.is_success() {
        bail!("{} recording(s) failed", report.failed.len());
    }
    Ok(())
}
