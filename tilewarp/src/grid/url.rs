//! Tile URL templates.

use super::types::{Projection, TileCoord};
use crate::error::TileError;

/// A tile URL with `{x}`, `{y}`, `{z}`, `{-y}` and `{s}` placeholders.
///
/// `{-y}` is the TMS row, counted from the south edge of the pyramid the
/// tile belongs to. `{s}` rotates through the configured subdomains by
/// `(x + y) % n` so neighbouring tiles spread across hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrl {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrl {
    pub fn new(template: impl Into<String>) -> Result<Self, TileError> {
        Self::with_subdomains(template, Vec::<String>::new())
    }

    pub fn with_subdomains<I, S>(template: impl Into<String>, subdomains: I) -> Result<Self, TileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = template.into();
        let subdomains: Vec<String> = subdomains.into_iter().map(Into::into).collect();

        if template.trim().is_empty() {
            return Err(TileError::Validation("tile url is empty".into()));
        }
        if template.contains("{s}") && subdomains.is_empty() {
            return Err(TileError::Validation(format!(
                "url '{}' uses {{s}} but no subdomains were given",
                template
            )));
        }

        Ok(Self {
            template,
            subdomains,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expands the template for `tile` of the `projection` pyramid.
    pub fn expand(&self, tile: TileCoord, projection: Projection) -> String {
        let (_, rows) = projection.grid_size(tile.z);
        let tms_y = rows.saturating_sub(1).saturating_sub(u64::from(tile.y));

        let mut url = self
            .template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{-y}", &tms_y.to_string())
            .replace("{y}", &tile.y.to_string());

        if !self.subdomains.is_empty() {
            let index = (u64::from(tile.x) + u64::from(tile.y)) as usize % self.subdomains.len();
            url = url.replace("{s}", &self.subdomains[index]);
        }
        url
    }
}
