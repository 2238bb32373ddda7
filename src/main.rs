use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exifkit::config::Config;
use exifkit::formats::tiff::tags;
use exifkit::{ExifWriter, GpsPosition};

#[derive(Parser, Debug)]
#[command(name = "exifkit", version, about = "Inspect and edit EXIF metadata in place")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every directory and entry
    Dump {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the orientation of the main image
    Orientation {
        file: PathBuf,
        #[arg(value_parser = clap::value_parser!(u16).range(1..=8))]
        value: u16,
    },
    /// Set the GPS position
    Gps {
        file: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Altitude in meters
        #[arg(long, allow_hyphen_values = true)]
        alt: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Dump { file, json } => dump(&file, json, &config),
        Command::Orientation { file, value } => {
            let mut exif = open(&file, &config)?;
            let main = exif.main_ifd().context("no main IFD")?;
            exif.ifd_mut(main)?
                .get_tag_value(tags::ORIENTATION, true)?
                .context("orientation entry")?
                .set_int(value.into())?;
            save(&file, &mut exif, &config)
        }
        Command::Gps { file, lat, lon, alt } => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                anyhow::bail!("coordinates out of range: {lat}, {lon}");
            }
            let mut exif = open(&file, &config)?;
            GpsPosition { latitude: lat, longitude: lon, altitude: alt }.write(&mut exif)?;
            save(&file, &mut exif, &config)
        }
    }
}

fn open(file: &Path, config: &Config) -> Result<exifkit::Exif> {
    exifkit::open(file, &config.read)
        .with_context(|| format!("reading {}", file.display()))?
        .with_context(|| format!("{} has no EXIF data", file.display()))
}

fn dump(file: &Path, json: bool, config: &Config) -> Result<()> {
    let mut exif = open(file, config)?;
    exif.materialize()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&exif.report())?);
    } else {
        println!("{exif}");
        if let Some(position) = GpsPosition::read(&mut exif)? {
            println!("GPS: {:.6}, {:.6}", position.latitude, position.longitude);
        }
    }
    Ok(())
}

fn save(file: &Path, exif: &mut exifkit::Exif, config: &Config) -> Result<()> {
    let outcome = ExifWriter::new(&config.write)
        .save(file, exif)
        .with_context(|| format!("saving {}", file.display()))?;
    log::debug!("{outcome:?}");
    Ok(())
}
