//! Tile command - fetch one tile to a PNG file.

use std::path::PathBuf;
use tilewarp::engine::{OutputFormat, TileRequest};
use tilewarp::fetch::TaskId;

use super::common::{tile_url, MaskArgs, ProjectionArg, TileArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the tile command.
pub struct TileCommandArgs {
    pub config: Option<PathBuf>,
    pub tile: TileArgs,
    /// One URL template per layer, drawn in order
    pub urls: Vec<String>,
    pub subdomains: Vec<String>,
    pub projection: ProjectionArg,
    pub max_zoom: Option<u8>,
    pub tile_size: Option<u32>,
    pub mask: MaskArgs,
    pub output: PathBuf,
}

/// Run the tile command.
pub async fn run(args: TileCommandArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("tile");

    if args.urls.is_empty() {
        return Err(CliError::Argument("at least one --url is required".into()));
    }
    let urls = args
        .urls
        .iter()
        .map(|template| tile_url(template, &args.subdomains))
        .collect::<Result<Vec<_>, _>>()?;

    let engine = runner.create_engine()?;
    let coord = args.tile.coord();
    let mut request = TileRequest::new(TaskId::new(), coord, urls[0].clone());
    request.urls = urls;
    request.projection = args.projection.into();
    request.tile_size = args.tile_size;
    request.max_available_zoom = args.max_zoom;
    request.mask = args.mask.register(&engine)?;
    request.output = OutputFormat::Png;

    println!("Fetching tile {} ({})", coord, request.projection);
    let start = std::time::Instant::now();
    let output = engine.get_tile_with_max_zoom(&request).await?;
    println!("Done in {:.2}s", start.elapsed().as_secs_f64());

    runner.save_png(&args.output, output)
}
