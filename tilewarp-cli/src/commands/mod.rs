//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`tile`] - Fetch one tile, optionally cut from a lower zoom and masked
//! - [`transform`] - Reproject a tile from a pyramid in another projection
//! - [`terrain`] - Render a terrain payload as an RGB height tile

pub mod common;
pub mod terrain;
pub mod tile;
pub mod transform;
