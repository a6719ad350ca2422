//! Transform command - reproject a tile from a pyramid in another projection.

use std::path::PathBuf;
use tilewarp::engine::{OutputFormat, TransformRequest};
use tilewarp::fetch::TaskId;
use tilewarp::grid::Projection;

use super::common::{tile_url, MaskArgs, ProjectionArg, TileArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the transform command.
pub struct TransformArgs {
    pub config: Option<PathBuf>,
    pub tile: TileArgs,
    pub url: String,
    pub subdomains: Vec<String>,
    /// Display pyramid
    pub projection: ProjectionArg,
    /// Source pyramid; the other projection when absent
    pub source: Option<ProjectionArg>,
    pub zoom_offset: i8,
    pub max_zoom: Option<u8>,
    pub tile_size: Option<u32>,
    pub mask: MaskArgs,
    pub output: PathBuf,
}

/// Run the transform command.
pub async fn run(args: TransformArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("transform");

    let url = tile_url(&args.url, &args.subdomains)?;
    let engine = runner.create_engine()?;

    let projection: Projection = args.projection.into();
    let coord = args.tile.coord();
    let mut request = TransformRequest::new(TaskId::new(), coord, url, projection);
    if let Some(source) = args.source {
        request.source = source.into();
    }
    request.zoom_offset = args.zoom_offset;
    request.max_available_zoom = args.max_zoom;
    request.tile_size = args.tile_size;
    request.mask = args.mask.register(&engine)?;
    request.output = OutputFormat::Png;

    println!(
        "Reprojecting tile {} from {} to {}",
        coord, request.source, request.projection
    );
    let start = std::time::Instant::now();
    let output = engine.transform_tile(&request).await?;
    println!("Done in {:.2}s", start.elapsed().as_secs_f64());

    runner.save_png(&args.output, output)
}
