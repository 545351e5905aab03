//! Panel rendering: turns slide records into laid-out visual elements and
//! mounts them in an addressable container.
//!
//! A [`RenderedPanel`] is a display list in CSS pixels. The export pipeline
//! only ever borrows panels through the [`PanelSource`] trait.

pub(crate) mod font;
mod layout;

pub use font::{measure, wrap};
pub use layout::{render_slide, Theme};

use crate::content::Deck;
use image::Rgba;
use url::Url;

/// Axis-aligned rectangle in CSS pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// One drawing operation of a panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintItem {
    Fill {
        rect: Rect,
        color: Rgba<u8>,
    },
    /// A single line of text; `y` is the top of the line box.
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: Rgba<u8>,
        text: String,
    },
    /// An external image stretched into `rect`.
    Image {
        rect: Rect,
        src: Url,
    },
}

/// A fully laid-out slide.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPanel {
    /// Identifier of the slide this panel renders.
    pub id: String,
    /// Rendered width in CSS pixels.
    pub width: u32,
    /// Rendered height in CSS pixels.
    pub height: u32,
    /// Origin of the document hosting the panel, used for cross-origin checks.
    pub origin: Option<Url>,
    pub items: Vec<PaintItem>,
}

impl RenderedPanel {
    /// Image resources referenced by the panel, in paint order.
    pub fn image_sources(&self) -> impl Iterator<Item = &Url> {
        self.items.iter().filter_map(|item| match item {
            PaintItem::Image { src, .. } => Some(src),
            _ => None,
        })
    }
}

/// A live container of rendered panels, indexable in deck order.
///
/// A slot may be empty when the panel at that position is not mounted.
pub trait PanelSource: Send + Sync {
    fn len(&self) -> usize;

    fn panel(&self, index: usize) -> Option<&RenderedPanel>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The in-process container: one slot per slide of a mounted deck.
#[derive(Debug, Clone, Default)]
pub struct DeckView {
    panels: Vec<Option<RenderedPanel>>,
}

impl DeckView {
    /// Render every slide of `deck` with `theme`.
    pub fn mount(deck: &Deck, theme: &Theme) -> Self {
        let panels = deck
            .identified()
            .iter()
            .map(|slide| Some(render_slide(slide, theme)))
            .collect();
        Self { panels }
    }

    pub fn from_panels(panels: Vec<Option<RenderedPanel>>) -> Self {
        Self { panels }
    }

    /// Take the panel at `index` out of the container, leaving the slot empty.
    pub fn unmount(&mut self, index: usize) -> Option<RenderedPanel> {
        self.panels.get_mut(index).and_then(Option::take)
    }

    pub fn panel_mut(&mut self, index: usize) -> Option<&mut RenderedPanel> {
        self.panels.get_mut(index).and_then(Option::as_mut)
    }
}

impl PanelSource for DeckView {
    fn len(&self) -> usize {
        self.panels.len()
    }

    fn panel(&self, index: usize) -> Option<&RenderedPanel> {
        self.panels.get(index).and_then(Option::as_ref)
    }
}
