//! Terrain command - render a terrain payload as an RGB height tile.

use bytes::Bytes;
use std::path::PathBuf;
use tilewarp::engine::{OutputFormat, TerrainRequest, TerrainSource};
use tilewarp::fetch::TaskId;

use super::common::{read_bytes, TerrainArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the terrain command.
pub struct TerrainArgs {
    pub config: Option<PathBuf>,
    pub url: Option<String>,
    pub input: Option<PathBuf>,
    pub terrain_type: TerrainArg,
    pub min_height: Option<f32>,
    pub max_height: Option<f32>,
    pub tile_size: Option<u32>,
    pub output: PathBuf,
}

impl TerrainArgs {
    fn source(&self) -> Result<TerrainSource, CliError> {
        match (&self.url, &self.input) {
            (Some(url), None) => Ok(TerrainSource::Url(url.clone())),
            (None, Some(path)) => Ok(TerrainSource::Buffer(Bytes::from(read_bytes(path)?))),
            _ => Err(CliError::Argument(
                "exactly one of --url or --input is required".into(),
            )),
        }
    }

    fn height_range(&self) -> Result<Option<(f32, f32)>, CliError> {
        match (self.min_height, self.max_height) {
            (Some(min), Some(max)) => Ok(Some((min, max))),
            (None, None) => Ok(None),
            _ => Err(CliError::Argument(
                "--min-height and --max-height must be given together".into(),
            )),
        }
    }
}

/// Run the terrain command.
pub async fn run(args: TerrainArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("terrain");

    let source = args.source()?;
    let engine = runner.create_engine()?;

    let mut request = TerrainRequest::new(TaskId::new(), source, args.terrain_type.into());
    request.height_range = args.height_range()?;
    request.tile_size = args.tile_size;
    request.output = OutputFormat::Png;

    println!("Rendering {} terrain", request.terrain_type);
    let output = engine.encode_terrain(&request).await?;

    runner.save_png(&args.output, output)
}
