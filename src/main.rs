//! Binary entrypoint for the stereo plate viewer.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::{ArgAction, Parser};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use stereo_plate::coords::FullUv;
use stereo_plate::manifest::IiifPlate;
use stereo_plate::render::composite::{ModeKind, compose_frame};
use stereo_plate::render::loader::load_plate;
use stereo_plate::{Configuration, PlateSource, StereoSession, run_viewer};

/// Align and view stereo plates as anaglyph or wiggle images
#[derive(Debug, Parser)]
#[command(name = "stereo-plate", about = "Stereo plate alignment and compositing")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Plate image to open (file path or http(s) URL)
    #[arg(long, value_name = "PATH|URL", conflicts_with = "ie")]
    plate: Option<String>,

    /// Resolve the plate through IIIF by IE number
    #[arg(long, value_name = "NUMBER")]
    ie: Option<String>,

    /// Compositing mode at startup
    #[arg(long, value_enum)]
    mode: Option<ModeKind>,

    /// Render one frame to this PNG instead of opening a window
    #[arg(long, value_name = "OUT.png")]
    snapshot: Option<PathBuf>,

    /// Snapshot surface size
    #[arg(long, value_name = "WxH", default_value = "1200x800", value_parser = parse_size)]
    snapshot_size: (u32, u32),

    /// Clock time for the snapshot frame, in seconds (selects the wiggle phase)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    time: f32,

    /// Landmark pick in full-plate UV, applied in pick order (repeatable)
    #[arg(long = "pick", value_name = "U,V", value_parser = parse_uv)]
    picks: Vec<FullUv>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .context("expected WIDTHxHEIGHT")?;
    let size = (w.trim().parse()?, h.trim().parse()?);
    ensure!(size.0 > 0 && size.1 > 0, "snapshot size must be non-zero");
    Ok(size)
}

fn parse_uv(raw: &str) -> Result<FullUv> {
    let (u, v) = raw.split_once(',').context("expected U,V")?;
    let (u, v): (f32, f32) = (u.trim().parse()?, v.trim().parse()?);
    ensure!(
        (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v),
        "pick coordinates must be within [0, 1]"
    );
    Ok(FullUv::new(u, v))
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("stereo_plate={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)?,
        None => Configuration::default(),
    };
    if let Some(raw) = &cli.plate {
        cfg.plate = Some(PlateSource::from_arg(raw));
    }
    if let Some(ie) = &cli.ie {
        let iiif = match cfg.plate.take() {
            Some(PlateSource::Iiif(mut existing)) => {
                existing.ie = ie.clone();
                existing
            }
            _ => IiifPlate::new(ie.clone()),
        };
        cfg.plate = Some(PlateSource::Iiif(iiif));
    }
    if let Some(mode) = cli.mode {
        cfg.mode = mode;
    }
    cfg.validated().context("validating configuration")
}

fn snapshot(cfg: &Configuration, source: &PlateSource, cli: &Cli, out: &Path) -> Result<()> {
    let plate = load_plate(source, cfg.max_texture_dim, |stage| info!("{stage}"))
        .with_context(|| format!("loading plate {source}"))?;
    let (width, height) = cli.snapshot_size;

    let mut session = StereoSession::new(cfg.pick_order.clone(), cfg.mode, cfg.wiggle, cfg.crop);
    session.plate_loaded(&source.label(), plate.width(), plate.height());
    session.on_resize(width, height);
    for uv in &cli.picks {
        if let Some(outcome) = session.submit_pick(*uv) {
            if !outcome.is_stored() {
                warn!(u = uv.u, v = uv.v, "{}", outcome.hint());
            }
        }
    }

    let frame = compose_frame(
        &session.mode(),
        &session.frame_params(),
        cli.time,
        &session.geometry(),
        &plate,
    );
    frame
        .save(out)
        .with_context(|| format!("writing snapshot {}", out.display()))?;
    info!(
        path = %out.display(),
        width,
        height,
        mode = session.mode().label(),
        theta = session.frame_params().theta,
        "snapshot written",
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    let Some(source) = cfg.plate.clone() else {
        bail!("no plate given: use --plate, --ie or set `plate` in the config file");
    };

    match &cli.snapshot {
        Some(out) => snapshot(&cfg, &source, &cli, out),
        None => run_viewer(cfg, source),
    }
}
