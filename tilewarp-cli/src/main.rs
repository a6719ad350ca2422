//! tilewarp CLI - Command-line interface
//!
//! Drives the tilewarp engine against real tile servers and writes the
//! results as PNG files.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::common::{MaskArgs, ProjectionArg, TerrainArg, TileArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "tilewarp")]
#[command(version = tilewarp::VERSION)]
#[command(about = "Fetch, reproject, mask and terrain-encode map tiles", long_about = None)]
struct Cli {
    /// Config file (default: ~/.tilewarp/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one tile, compositing every --url layer
    Tile {
        #[command(flatten)]
        tile: TileArgs,

        /// Tile URL template (repeat for layers)
        #[arg(long = "url", required = true)]
        urls: Vec<String>,

        /// Subdomains substituted for {s}
        #[arg(long, value_delimiter = ',')]
        subdomains: Vec<String>,

        /// Pyramid the tile address refers to
        #[arg(long, value_enum, default_value = "3857")]
        projection: ProjectionArg,

        /// Deepest zoom the server provides; deeper tiles are cut from it
        #[arg(long)]
        max_zoom: Option<u8>,

        /// Output tile size in pixels (default from config)
        #[arg(long)]
        tile_size: Option<u32>,

        #[command(flatten)]
        mask: MaskArgs,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reproject a tile from a source pyramid in another projection
    Transform {
        #[command(flatten)]
        tile: TileArgs,

        /// Source tile URL template
        #[arg(long)]
        url: String,

        /// Subdomains substituted for {s}
        #[arg(long, value_delimiter = ',')]
        subdomains: Vec<String>,

        /// Output pyramid
        #[arg(long, value_enum, default_value = "3857")]
        projection: ProjectionArg,

        /// Source pyramid (default: the other projection)
        #[arg(long, value_enum)]
        source: Option<ProjectionArg>,

        /// Source zoom relative to the output zoom
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        zoom_offset: i8,

        /// Deepest zoom the source provides
        #[arg(long)]
        max_zoom: Option<u8>,

        /// Output tile size in pixels (default from config)
        #[arg(long)]
        tile_size: Option<u32>,

        #[command(flatten)]
        mask: MaskArgs,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render a terrain payload as an RGB height tile
    Terrain {
        /// Payload URL
        #[arg(long, conflicts_with = "input")]
        url: Option<String>,

        /// Payload file
        #[arg(long)]
        input: Option<PathBuf>,

        /// Payload format
        #[arg(long = "type", value_enum)]
        terrain_type: TerrainArg,

        /// Lowest height, for range-scaled formats
        #[arg(long, allow_negative_numbers = true)]
        min_height: Option<f32>,

        /// Highest height, for range-scaled formats
        #[arg(long, allow_negative_numbers = true)]
        max_height: Option<f32>,

        /// Output tile size in pixels (default from config)
        #[arg(long)]
        tile_size: Option<u32>,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = cli.config;
    match cli.command {
        Commands::Tile {
            tile,
            urls,
            subdomains,
            projection,
            max_zoom,
            tile_size,
            mask,
            output,
        } => {
            commands::tile::run(commands::tile::TileCommandArgs {
                config,
                tile,
                urls,
                subdomains,
                projection,
                max_zoom,
                tile_size,
                mask,
                output,
            })
            .await
        }
        Commands::Transform {
            tile,
            url,
            subdomains,
            projection,
            source,
            zoom_offset,
            max_zoom,
            tile_size,
            mask,
            output,
        } => {
            commands::transform::run(commands::transform::TransformArgs {
                config,
                tile,
                url,
                subdomains,
                projection,
                source,
                zoom_offset,
                max_zoom,
                tile_size,
                mask,
                output,
            })
            .await
        }
        Commands::Terrain {
            url,
            input,
            terrain_type,
            min_height,
            max_height,
            tile_size,
            output,
        } => {
            commands::terrain::run(commands::terrain::TerrainArgs {
                config,
                url,
                input,
                terrain_type,
                min_height,
                max_height,
                tile_size,
                output,
            })
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli).await {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transform() {
        let cli = Cli::try_parse_from([
            "tilewarp",
            "transform",
            "-z",
            "3",
            "-x",
            "5",
            "-y",
            "2",
            "--url",
            "http://geo/{z}/{x}/{y}.png",
            "--zoom-offset",
            "-1",
            "--source",
            "epsg:4326",
            "-o",
            "out.png",
        ])
        .unwrap();

        match cli.command {
            Commands::Transform {
                tile,
                zoom_offset,
                source,
                projection,
                ..
            } => {
                assert_eq!(tile.coord(), tilewarp::grid::TileCoord::new(5, 2, 3));
                assert_eq!(zoom_offset, -1);
                assert_eq!(source, Some(ProjectionArg::Geodetic));
                assert_eq!(projection, ProjectionArg::WebMercator);
            }
            _ => panic!("expected transform"),
        }
    }

    #[test]
    fn test_tile_requires_url() {
        let result = Cli::try_parse_from(["tilewarp", "tile", "-z", "0", "-x", "0", "-y", "0", "-o", "a.png"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reverse_requires_mask() {
        let result = Cli::try_parse_from([
            "tilewarp", "tile", "-z", "0", "-x", "0", "-y", "0", "--url", "http://t/{z}/{x}/{y}.png",
            "--reverse", "-o", "a.png",
        ]);
        assert!(result.is_err());
    }
}
