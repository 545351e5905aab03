//! Panel rasterization.
//!
//! This module provides:
//! - The [`Rasterizer`] seam used by the export controller
//! - A software painter for [`RenderedPanel`] display lists
//! - PNG encoding of captured bitmaps

mod resources;

pub use resources::{same_origin, DefaultResourceLoader, ResourceLoader};

use crate::error::{Error, Result};
use crate::panel::font::{self, GLYPH_COLUMNS, GLYPH_ROWS, LINE_HEIGHT};
use crate::panel::{PaintItem, Rect, RenderedPanel};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use url::Url;

/// Capture settings.
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Opaque fill behind the panel
    pub background: Rgb<u8>,
    /// Device pixels per CSS pixel
    pub scale: u32,
    /// Whether images from other origins may be drawn
    pub allow_cross_origin: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            background: Rgb([255, 255, 255]),
            scale: 2,
            allow_cross_origin: true,
        }
    }
}

/// An opaque RGB capture of one panel.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixels: RgbImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Encode into an embeddable PNG payload.
    pub fn to_png(&self) -> Result<ImagePayload> {
        let mut png = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Image(e.to_string()))?;
        Ok(ImagePayload {
            width: self.width(),
            height: self.height(),
            png,
        })
    }
}

impl From<RgbImage> for Bitmap {
    fn from(pixels: RgbImage) -> Self {
        Self { pixels }
    }
}

/// PNG-encoded bitmap ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Converts a rendered panel into a bitmap.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn capture(&self, panel: &RenderedPanel) -> Result<Bitmap>;
}

/// Software rasterizer painting display lists on a blocking worker.
#[derive(Clone)]
pub struct PanelRasterizer {
    config: RasterConfig,
    loader: Arc<dyn ResourceLoader>,
}

impl Default for PanelRasterizer {
    fn default() -> Self {
        Self::new(RasterConfig::default(), Arc::new(DefaultResourceLoader::default()))
    }
}

impl PanelRasterizer {
    pub fn new(config: RasterConfig, loader: Arc<dyn ResourceLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }
}

#[async_trait]
impl Rasterizer for PanelRasterizer {
    async fn capture(&self, panel: &RenderedPanel) -> Result<Bitmap> {
        let panel = panel.clone();
        let config = self.config.clone();
        let loader = Arc::clone(&self.loader);
        tokio::task::spawn_blocking(move || rasterize(&panel, &config, loader.as_ref()))
            .await
            .map_err(|e| Error::Image(format!("rasterizer worker failed: {}", e)))?
    }
}

/// Paint `panel` synchronously.
///
/// Every image resource is resolved before any pixel is painted.
pub fn rasterize(
    panel: &RenderedPanel,
    config: &RasterConfig,
    loader: &dyn ResourceLoader,
) -> Result<Bitmap> {
    if panel.width == 0 || panel.height == 0 {
        return Err(Error::Image(format!("panel {} has no rendered size", panel.id)));
    }
    let width = panel
        .width
        .checked_mul(config.scale)
        .ok_or_else(|| Error::Image("bitmap width overflow".to_string()))?;
    let height = panel
        .height
        .checked_mul(config.scale)
        .ok_or_else(|| Error::Image("bitmap height overflow".to_string()))?;

    let resources = resolve_resources(panel, config, loader)?;

    let mut canvas = Canvas {
        pixels: RgbImage::from_pixel(width, height, config.background),
        scale: config.scale as f32,
    };
    for item in &panel.items {
        match item {
            PaintItem::Fill { rect, color } => canvas.fill(rect, *color),
            PaintItem::Text {
                x,
                y,
                size,
                color,
                text,
            } => canvas.text(*x, *y, *size, *color, text),
            PaintItem::Image { rect, src } => {
                if let Some(image) = resources.get(src) {
                    canvas.image(rect, image);
                }
            }
        }
    }
    Ok(Bitmap::from(canvas.pixels))
}

fn resolve_resources(
    panel: &RenderedPanel,
    config: &RasterConfig,
    loader: &dyn ResourceLoader,
) -> Result<HashMap<Url, RgbaImage>> {
    let mut resolved = HashMap::new();
    for src in panel.image_sources() {
        if resolved.contains_key(src) {
            continue;
        }
        if !config.allow_cross_origin && !same_origin(panel.origin.as_ref(), src) {
            return Err(Error::Resource(format!("cross-origin image blocked: {}", src)));
        }
        let image = loader.load(src)?.to_rgba8();
        resolved.insert(src.clone(), image);
    }
    Ok(resolved)
}

struct Canvas {
    pixels: RgbImage,
    scale: f32,
}

impl Canvas {
    /// Device pixel bounds of a CSS rectangle, clipped to the canvas.
    fn bounds(&self, rect: &Rect) -> Option<(u32, u32, u32, u32)> {
        let clamp = |v: f32, max: u32| (v * self.scale).round().clamp(0.0, max as f32) as u32;
        let x0 = clamp(rect.x, self.pixels.width());
        let y0 = clamp(rect.y, self.pixels.height());
        let x1 = clamp(rect.x + rect.width, self.pixels.width());
        let y1 = clamp(rect.y + rect.height, self.pixels.height());
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }

    fn fill(&mut self, rect: &Rect, color: Rgba<u8>) {
        if let Some((x0, y0, x1, y1)) = self.bounds(rect) {
            for y in y0..y1 {
                for x in x0..x1 {
                    blend(self.pixels.get_pixel_mut(x, y), color);
                }
            }
        }
    }

    fn text(&mut self, x: f32, y: f32, size: f32, color: Rgba<u8>, text: &str) {
        let unit = font::unit(size);
        let top = y + size * (LINE_HEIGHT - 1.0) / 2.0;
        for (index, c) in text.chars().enumerate() {
            let left = x + index as f32 * font::ADVANCE * unit;
            let columns = font::glyph(c);
            for column in 0..GLYPH_COLUMNS {
                for row in 0..GLYPH_ROWS {
                    if (columns[column] >> row) & 1 == 1 {
                        let cell = Rect::new(
                            left + column as f32 * unit,
                            top + row as f32 * unit,
                            unit,
                            unit,
                        );
                        self.fill(&cell, color);
                    }
                }
            }
        }
    }

    fn image(&mut self, rect: &Rect, image: &RgbaImage) {
        let Some((x0, y0, x1, y1)) = self.bounds(rect) else {
            return;
        };
        let scaled = imageops::resize(image, x1 - x0, y1 - y0, FilterType::Triangle);
        for (dx, dy, pixel) in scaled.enumerate_pixels() {
            blend(self.pixels.get_pixel_mut(x0 + dx, y0 + dy), *pixel);
        }
    }
}

/// Source-over compositing onto an opaque pixel.
fn blend(dst: &mut Rgb<u8>, src: Rgba<u8>) {
    let alpha = src[3] as u32;
    for channel in 0..3 {
        let s = src[channel] as u32;
        let d = dst[channel] as u32;
        dst[channel] = ((s * alpha + d * (255 - alpha) + 127) / 255) as u8;
    }
}
