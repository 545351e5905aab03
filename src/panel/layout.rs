//! Slide card layout.
//!
//! Cards stack a decorative pattern band, the slide number badge, the title,
//! the highlight line and the bullet list from top to bottom.

use super::font::{measure, wrap, LINE_HEIGHT};
use super::{PaintItem, Rect, RenderedPanel};
use crate::content::Slide;
use image::Rgba;
use url::Url;

/// Visual parameters of a slide card.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Card width in CSS pixels
    pub width: u32,
    /// Card height in CSS pixels
    pub height: u32,
    pub padding: f32,
    pub background: Rgba<u8>,
    pub pattern: [Rgba<u8>; 2],
    pub accent: Rgba<u8>,
    pub heading: Rgba<u8>,
    pub body: Rgba<u8>,
    pub title_size: f32,
    pub highlight_size: f32,
    pub bullet_size: f32,
    /// Image drawn in the pattern band instead of the stripes.
    pub pattern_image: Option<Url>,
    /// Origin of the hosting document.
    pub origin: Option<Url>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            width: 720,
            height: 510,
            padding: 48.0,
            background: Rgba([253, 250, 245, 255]),
            pattern: [Rgba([237, 226, 207, 255]), Rgba([244, 236, 222, 255])],
            accent: Rgba([154, 52, 18, 255]),
            heading: Rgba([28, 25, 23, 255]),
            body: Rgba([68, 64, 60, 255]),
            title_size: 32.0,
            highlight_size: 20.0,
            bullet_size: 16.0,
            pattern_image: None,
            origin: None,
        }
    }
}

const PATTERN_HEIGHT: f32 = 96.0;
const STRIPE_WIDTH: f32 = 24.0;
const BULLET_INDENT: f32 = 20.0;

/// Lay out one slide as a card.
pub fn render_slide(slide: &Slide, theme: &Theme) -> RenderedPanel {
    let width = theme.width as f32;
    let content_width = width - theme.padding * 2.0;
    let mut items = Vec::new();

    items.push(PaintItem::Fill {
        rect: Rect::new(0.0, 0.0, width, theme.height as f32),
        color: theme.background,
    });

    let band = Rect::new(0.0, 0.0, width, PATTERN_HEIGHT);
    match &theme.pattern_image {
        Some(src) => items.push(PaintItem::Image {
            rect: band,
            src: src.clone(),
        }),
        None => {
            let mut x = 0.0;
            let mut stripe = 0;
            while x < width {
                items.push(PaintItem::Fill {
                    rect: Rect::new(x, 0.0, STRIPE_WIDTH.min(width - x), PATTERN_HEIGHT),
                    color: theme.pattern[stripe % 2],
                });
                x += STRIPE_WIDTH;
                stripe += 1;
            }
        }
    }

    let mut y = PATTERN_HEIGHT + theme.padding / 2.0;

    // Badge
    let badge = slide.badge();
    let badge_size = theme.bullet_size;
    let badge_height = badge_size * 1.75;
    let badge_width = measure(&badge, badge_size) + badge_size;
    items.push(PaintItem::Fill {
        rect: Rect::new(theme.padding, y, badge_width, badge_height),
        color: theme.accent,
    });
    items.push(PaintItem::Text {
        x: theme.padding + badge_size / 2.0,
        y: y + (badge_height - badge_size * LINE_HEIGHT) / 2.0,
        size: badge_size,
        color: Rgba([255, 255, 255, 255]),
        text: badge,
    });
    y += badge_height + theme.padding / 3.0;

    y = push_paragraph(
        &mut items,
        &slide.record.title,
        theme.padding,
        y,
        content_width,
        theme.title_size,
        theme.heading,
    );
    y += theme.padding / 4.0;

    y = push_paragraph(
        &mut items,
        &slide.record.highlight,
        theme.padding,
        y,
        content_width,
        theme.highlight_size,
        theme.accent,
    );
    y += theme.padding / 3.0;

    let dot = theme.bullet_size * 0.4;
    for bullet in &slide.record.bullets {
        let line_box = theme.bullet_size * LINE_HEIGHT;
        items.push(PaintItem::Fill {
            rect: Rect::new(theme.padding, y + (line_box - dot) / 2.0, dot, dot),
            color: theme.accent,
        });
        y = push_paragraph(
            &mut items,
            bullet,
            theme.padding + BULLET_INDENT,
            y,
            content_width - BULLET_INDENT,
            theme.bullet_size,
            theme.body,
        );
        y += theme.bullet_size / 2.0;
    }

    RenderedPanel {
        id: slide.id.clone(),
        width: theme.width,
        height: theme.height,
        origin: theme.origin.clone(),
        items,
    }
}

/// Wrap `text` into lines and return the y coordinate below the last line.
fn push_paragraph(
    items: &mut Vec<PaintItem>,
    text: &str,
    x: f32,
    mut y: f32,
    max_width: f32,
    size: f32,
    color: Rgba<u8>,
) -> f32 {
    for line in wrap(text, size, max_width) {
        items.push(PaintItem::Text {
            x,
            y,
            size,
            color,
            text: line,
        });
        y += size * LINE_HEIGHT;
    }
    y
}
