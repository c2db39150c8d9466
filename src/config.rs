use crate::data::InputFormat;
use crate::error::{ChargepolError, Result};
use crate::event::TimeWindow;
use crate::map::SceneBounds;

use clap::Parser;
use std::{env, path::PathBuf};

const ENV_MAP_DIR: &str = "CHARGEPOL3D_MAP_DIR";
const DEFAULT_MAP_DIR: &str = "data";

/// Ceiling used when there are no events to size the altitude axis from
const DEFAULT_ALT_MAX_KM: f64 = 20.0;

#[derive(Debug, Parser)]
#[command(author, version, about = "3-D scatter of chargepol lightning charge layers over a Texas map", long_about = None)]
pub struct Cli {
    /// Chargepol output or CSV file (time, charge, zmin, zwidth, lon, lat)
    pub path: PathBuf,

    /// Input layout
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Window start in seconds (defaults to the first event)
    #[arg(long, allow_negative_numbers = true)]
    pub start: Option<f64>,

    /// Window end in seconds (defaults to the last event)
    #[arg(long, allow_negative_numbers = true)]
    pub end: Option<f64>,

    #[arg(long, default_value_t = -98.0, allow_negative_numbers = true)]
    pub lon_min: f64,

    #[arg(long, default_value_t = -92.0, allow_negative_numbers = true)]
    pub lon_max: f64,

    #[arg(long, default_value_t = 28.0, allow_negative_numbers = true)]
    pub lat_min: f64,

    #[arg(long, default_value_t = 32.0, allow_negative_numbers = true)]
    pub lat_max: f64,

    /// Altitude ceiling in km (defaults to the highest layer top, rounded up)
    #[arg(long)]
    pub alt_max: Option<f64>,

    /// Directory holding the boundary GeoJSON files
    #[arg(long)]
    pub map_dir: Option<PathBuf>,

    /// County boundary GeoJSON, overriding the map directory's
    #[arg(long)]
    pub counties: Option<PathBuf>,

    /// Render once to this file ("-" for stdout) instead of opening the viewer
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Snapshot size in character cells, COLSxROWS
    #[arg(long, default_value = "120x40")]
    pub size: String,
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub format: InputFormat,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub bounds: SceneBounds,
    pub alt_max: Option<f64>,
    pub map_dir: PathBuf,
    pub counties: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    /// (cols, rows)
    pub snapshot_size: (u16, u16),
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if !(cli.lon_min < cli.lon_max) {
            return Err(ChargepolError::Config(format!(
                "lon-min ({}) must be below lon-max ({})",
                cli.lon_min, cli.lon_max
            )));
        }
        if !(cli.lat_min < cli.lat_max) {
            return Err(ChargepolError::Config(format!(
                "lat-min ({}) must be below lat-max ({})",
                cli.lat_min, cli.lat_max
            )));
        }
        if let Some(alt) = cli.alt_max {
            if !(alt > 0.0) {
                return Err(ChargepolError::Config(format!("alt-max must be positive, got {}", alt)));
            }
        }

        let map_dir = match cli.map_dir {
            Some(dir) => dir,
            None => match env::var(ENV_MAP_DIR) {
                Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
                _ => PathBuf::from(DEFAULT_MAP_DIR),
            },
        };

        if map_dir.exists() && !map_dir.is_dir() {
            return Err(ChargepolError::Config(format!(
                "Map path is not a directory: {}",
                map_dir.display()
            )));
        }

        Ok(Self {
            data_path: cli.path,
            format: cli.format,
            start: cli.start,
            end: cli.end,
            bounds: SceneBounds {
                lon_min: cli.lon_min,
                lon_max: cli.lon_max,
                lat_min: cli.lat_min,
                lat_max: cli.lat_max,
                alt_min: 0.0,
                alt_max: DEFAULT_ALT_MAX_KM,
            },
            alt_max: cli.alt_max,
            map_dir,
            counties: cli.counties,
            snapshot: cli.snapshot,
            snapshot_size: parse_size(&cli.size)?,
        })
    }

    /// Scene bounds with the altitude ceiling resolved against the data
    pub fn scene_bounds(&self, data_alt_max: Option<f64>) -> SceneBounds {
        let alt_max = self
            .alt_max
            .or_else(|| data_alt_max.filter(|a| *a > 0.0).map(f64::ceil))
            .unwrap_or(DEFAULT_ALT_MAX_KM);
        self.bounds.with_altitude(alt_max)
    }

    /// Initial time window; unset ends fall back to the data span
    pub fn time_window(&self, span: Option<TimeWindow>) -> TimeWindow {
        let (span_start, span_end) = span.map(|w| (w.start, w.end)).unwrap_or((0.0, 0.0));
        TimeWindow::new(self.start.unwrap_or(span_start), self.end.unwrap_or(span_end))
    }
}

/// Parse `COLSxROWS`
fn parse_size(s: &str) -> Result<(u16, u16)> {
    let invalid = || ChargepolError::Config(format!("Invalid size {:?}, expected COLSxROWS", s));
    let (cols, rows) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let cols: u16 = cols.trim().parse().map_err(|_| invalid())?;
    let rows: u16 = rows.trim().parse().map_err(|_| invalid())?;
    if cols < 10 || rows < 5 {
        return Err(invalid());
    }
    Ok((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["chargepol3d"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let config = Config::from_cli(cli(&["events.csv", "--map-dir", dir_arg])).unwrap();
        assert_eq!(config.data_path, PathBuf::from("events.csv"));
        assert_eq!(config.format, InputFormat::Auto);
        assert_eq!(config.bounds, SceneBounds::texas());
        assert_eq!(config.snapshot_size, (120, 40));
        assert!(config.snapshot.is_none());
    }

    #[test]
    fn test_negative_bounds_and_window() {
        let config = Config::from_cli(cli(&[
            "events.txt",
            "--lon-min", "-100",
            "--lon-max", "-90.5",
            "--start", "-5",
            "--format", "chargepol",
            "--map-dir", ".",
        ]))
        .unwrap();
        assert_eq!(config.bounds.lon_min, -100.0);
        assert_eq!(config.bounds.lon_max, -90.5);
        assert_eq!(config.start, Some(-5.0));
        assert_eq!(config.format, InputFormat::Chargepol);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let result = Config::from_cli(cli(&["e.csv", "--lat-min", "33", "--map-dir", "."]));
        assert!(matches!(result, Err(ChargepolError::Config(_))));
    }

    #[test]
    fn test_rejects_file_as_map_dir() {
        let file = NamedTempFile::new().unwrap();
        let result = Config::from_cli(cli(&["e.csv", "--map-dir", file.path().to_str().unwrap()]));
        assert!(matches!(result, Err(ChargepolError::Config(_))));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("200x60").unwrap(), (200, 60));
        assert_eq!(parse_size(" 80X24 ").unwrap(), (80, 24));
        assert!(parse_size("80").is_err());
        assert!(parse_size("axb").is_err());
        assert!(parse_size("4x4").is_err());
    }

    #[test]
    fn test_scene_bounds_altitude() {
        let config = Config::from_cli(cli(&["e.csv", "--map-dir", "."])).unwrap();
        assert_eq!(config.scene_bounds(Some(13.2)).alt_max, 14.0);
        assert_eq!(config.scene_bounds(None).alt_max, 20.0);
        assert_eq!(config.scene_bounds(Some(0.0)).alt_max, 20.0);

        let fixed = Config::from_cli(cli(&["e.csv", "--alt-max", "18", "--map-dir", "."])).unwrap();
        assert_eq!(fixed.scene_bounds(Some(13.2)).alt_max, 18.0);
    }

    #[test]
    fn test_time_window_resolution() {
        let span = Some(TimeWindow::new(100.0, 200.0));
        let config = Config::from_cli(cli(&["e.csv", "--map-dir", "."])).unwrap();
        assert_eq!(config.time_window(span), TimeWindow::new(100.0, 200.0));

        let config = Config::from_cli(cli(&["e.csv", "--end", "150", "--map-dir", "."])).unwrap();
        assert_eq!(config.time_window(span), TimeWindow::new(100.0, 150.0));
        assert_eq!(config.time_window(None), TimeWindow::new(0.0, 150.0));
    }
}
