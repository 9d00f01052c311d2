use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flood-extent")]
#[command(about = "Two-date Sentinel-2 flood extent mapping")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Catalog root holding collections and vector assets
    #[arg(long, default_value = "catalog", global = true)]
    pub catalog: PathBuf,

    /// JSON run configuration (study area, windows, cloud ceiling)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output", global = true)]
    pub output_dir: PathBuf,

    /// GeoTIFF compression (DEFLATE, LZW, ZSTD or NONE)
    #[arg(long, default_value = "DEFLATE", global = true)]
    pub compress: String,

    /// Compression level
    #[arg(long, default_value = "6", global = true)]
    pub compress_level: u8,

    /// Write striped instead of tiled GeoTIFFs
    #[arg(long, global = true)]
    pub no_tiled: bool,

    /// Number of band reader threads (defaults to the CPU count)
    #[arg(long, global = true)]
    pub io_threads: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Window {
    Pre,
    Post,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full pipeline: flood mask, map layers and map.json
    Detect,

    /// False-color mean composite of one window
    Composite {
        #[arg(short, long, value_enum)]
        window: Window,
    },

    /// Binary water confidence of one window
    Confidence {
        #[arg(short, long, value_enum)]
        window: Window,
    },

    /// NDWI and MNDWI of one window's composite
    Indices {
        #[arg(short, long, value_enum)]
        window: Window,

        /// Use float32 instead of int16
        #[arg(long)]
        float: bool,

        /// Scaling factor for fixed-point
        #[arg(long, default_value = "10000")]
        scale_factor: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_after_subcommand() {
        let cli = Cli::parse_from(["flood-extent", "indices", "--window", "post", "--float", "-o", "out", "--no-tiled"]);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert!(cli.no_tiled);
        match cli.command {
            Commands::Indices { window, float, scale_factor } => {
                assert_eq!(window, Window::Post);
                assert!(float);
                assert_eq!(scale_factor, 10000);
            }
            _ => panic!("expected indices"),
        }
    }

    #[test]
    fn window_is_required() {
        assert!(Cli::try_parse_from(["flood-extent", "composite"]).is_err());
    }
}
