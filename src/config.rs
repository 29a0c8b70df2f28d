//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::overpass::{DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(name = "urbanway")]
#[command(about = "Road accessibility pipeline - import OSM roads and serve them")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Snapshot file holding the road table
    #[arg(long, global = true, env = "URBANWAY_DATA_FILE", default_value = "data/roads.json.gz")]
    pub data_file: PathBuf,

    /// Overpass interpreter endpoint
    #[arg(long, global = true, env = "URBANWAY_OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
    pub overpass_url: String,

    /// Client and server-side timeout for the Overpass query
    #[arg(
        long,
        global = true,
        env = "URBANWAY_FETCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub fetch_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch roads around a point, classify them and store them
    Import(ImportArgs),

    /// Serve the query API
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Center latitude (default: Rome)
    #[arg(long, default_value_t = 41.9028, allow_negative_numbers = true)]
    pub lat: f64,

    /// Center longitude
    #[arg(long, default_value_t = 12.4964, allow_negative_numbers = true)]
    pub lon: f64,

    /// Half-width of the import box in km
    #[arg(long, default_value_t = 5.0)]
    pub radius_km: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// How often to check the snapshot for rows written by imports (0 = never)
    #[arg(long, env = "URBANWAY_RELOAD_SECS", default_value_t = 5)]
    pub reload_secs: u64,
}

impl ImportArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(format!("radius must be positive, got {}", self.radius_km));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("center ({}, {}) is out of range", self.lat, self.lon));
        }
        Ok(())
    }
}

impl ServeArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_import_defaults() {
        let cli = parse(&["urbanway", "import"]);

        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.lat, 41.9028);
                assert_eq!(args.lon, 12.4964);
                assert_eq!(args.radius_km, 5.0);
                assert!(args.validate().is_ok());
            }
            other => panic!("expected import, got {:?}", other),
        }
        assert_eq!(cli.settings.fetch_timeout_secs, 60);
    }

    #[test]
    fn test_import_negative_coordinates() {
        let cli = parse(&[
            "urbanway",
            "import",
            "--lat",
            "-33.86",
            "--lon",
            "-151.2",
            "--radius-km",
            "1",
        ]);

        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.lat, -33.86);
                assert_eq!(args.lon, -151.2);
                assert_eq!(args.radius_km, 1.0);
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_import_rejects_bad_radius() {
        let cli = parse(&["urbanway", "import", "--radius-km", "0"]);
        match cli.command {
            Command::Import(args) => assert!(args.validate().is_err()),
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_serve_with_global_options() {
        let cli = parse(&[
            "urbanway",
            "serve",
            "--port",
            "8080",
            "--data-file",
            "/tmp/roads.json.gz",
        ]);

        assert_eq!(cli.settings.data_file, PathBuf::from("/tmp/roads.json.gz"));
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.addr(), "0.0.0.0:8080");
                assert_eq!(args.reload_secs, 5);
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["urbanway"]).is_err());
    }
}
