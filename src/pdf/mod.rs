//! PDF page assembly using lopdf.
//!
//! This module provides:
//! - Fixed page formats (A4 landscape by default)
//! - Append-only pages holding full-bleed raster images
//! - PNG payloads embedded as image XObjects by lopdf

mod document;

pub use document::*;
