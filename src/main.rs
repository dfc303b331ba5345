use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facefit::{batch, config, locate};
use facefit_vision::{FaceDetector, FaceHint, Point, Rect};
use log::info;

#[derive(Parser)]
#[command(name = "facefit")]
#[command(version, about = "Stabilize the location and size of a face in a photograph")]
struct Cli {
    /// Config file (defaults to $FACEFIT_CONFIG, then the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log every detector probe
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Localize the face in one image and print the result as JSON
    Locate {
        image: PathBuf,
        /// Rough face location as CX,CY,RADIUS in image pixels
        #[arg(long, value_parser = parse_hint)]
        hint: Option<FaceHint>,
        /// Also write the final face region to <IMAGE>.framed.jpg
        #[arg(long)]
        save_crop: bool,
    },
    /// Localize every image of a CSV file list, one JSON line per image
    Batch {
        list: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Open config file in editor
    Config,
    /// Write the default configuration
    InitConfig { path: Option<PathBuf> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_target(false)
        .format_timestamp(None)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);

    match cli.command {
        Commands::Locate {
            image,
            hint,
            save_crop,
        } => {
            let cfg = config::load_config(Some(&config_path))?;
            let detector = open_detector(&cfg, &config_path)?;
            locate_one(&cfg, &image, hint, save_crop, detector)
        }
        Commands::Batch { list, output } => {
            let cfg = config::load_config(Some(&config_path))?;
            let mut detector = open_detector(&cfg, &config_path)?;
            let mut out: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            let summary = batch::run_batch(&cfg, &list, &mut detector, &mut out)?;
            if summary.failed > 0 {
                log::warn!("{} of {} entries failed", summary.failed, summary.total);
            }
            Ok(())
        }
        Commands::Config => open_config(&config_path),
        Commands::InitConfig { path } => {
            let path = path.unwrap_or(config_path);
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            config::save_config(&config::Config::default(), Some(&path))?;
            info!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn locate_one(
    cfg: &config::Config,
    image: &Path,
    hint: Option<FaceHint>,
    save_crop: bool,
    detector: Box<dyn FaceDetector>,
) -> Result<()> {
    let (report, source) = locate::locate_file(cfg, image, hint, detector)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if save_crop {
        match report.final_face {
            Some(face) => {
                locate::save_crop(&source, Rect::from(face), &locate::framed_path(image))?
            }
            None => anyhow::bail!("no stable face found, nothing to save"),
        }
    }
    Ok(())
}

#[cfg(feature = "yunet")]
fn open_detector(cfg: &config::Config, config_path: &Path) -> Result<Box<dyn FaceDetector>> {
    let model = cfg.model_path(config_path);
    info!("Loading detector model: {}", model.display());
    let detector = facefit_vision::YuNetDetector::from_file(
        &model,
        cfg.detector.score_threshold,
        cfg.detector.nms_threshold,
    )
    .context("Failed to initialize face detector")?;
    Ok(Box::new(detector))
}

#[cfg(not(feature = "yunet"))]
fn open_detector(_cfg: &config::Config, _config_path: &Path) -> Result<Box<dyn FaceDetector>> {
    anyhow::bail!("facefit was built without a detector backend; rebuild with `--features yunet`")
}

fn parse_hint(s: &str) -> Result<FaceHint, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[cx, cy, r] = parts.as_slice() else {
        return Err(format!("expected CX,CY,RADIUS, got `{}`", s));
    };
    let num = |v: &str| v.parse::<i32>().map_err(|e| format!("`{}`: {}", v, e));
    Ok(FaceHint::new(Point::new(num(cx)?, num(cy)?), num(r)?))
}

fn open_config(config_path: &Path) -> Result<()> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
