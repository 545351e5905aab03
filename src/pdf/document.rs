//! Page assembly on top of lopdf.
//!
//! Pages are created in order and never reordered; [`SlideDocument::finish`]
//! writes the page tree that links them.

use crate::error::{Error, Result};
use crate::raster::ImagePayload;
use lopdf::{xobject, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Physical page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    pub width: f32,
    pub height: f32,
}

impl PageFormat {
    /// A4 landscape, 842 x 595 pt.
    pub const A4_LANDSCAPE: PageFormat = PageFormat {
        width: 842.0,
        height: 595.0,
    };

    /// Build a format from two dimensions; the orientation decides which one
    /// becomes the width.
    pub fn new(orientation: Orientation, dimensions: [f32; 2]) -> Self {
        let long = dimensions[0].max(dimensions[1]);
        let short = dimensions[0].min(dimensions[1]);
        match orientation {
            Orientation::Landscape => Self {
                width: long,
                height: short,
            },
            Orientation::Portrait => Self {
                width: short,
                height: long,
            },
        }
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// An append-only PDF whose pages each hold raster images.
pub struct SlideDocument {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    format: PageFormat,
    title: Option<String>,
}

impl SlideDocument {
    /// Create a document with one empty page.
    pub fn new(format: PageFormat) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut document = Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            format,
            title: None,
        };
        document.add_page();
        document
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Size of the current (last) page.
    pub fn page_size(&self) -> PageFormat {
        self.format
    }

    /// Append a new empty page; it becomes the current page.
    pub fn add_page(&mut self) {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), Vec::new()));

        let mut page = Dictionary::new();
        page.set(b"Type", Object::Name(b"Page".to_vec()));
        page.set(b"Parent", Object::Reference(self.pages_id));
        page.set(
            b"MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.format.width),
                Object::Real(self.format.height),
            ]),
        );
        page.set(b"Resources", Object::Dictionary(Dictionary::new()));
        page.set(b"Contents", Object::Reference(content_id));
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
    }

    /// Draw `image` on the current page into the box at (`x`, `y`) measured
    /// from the page's top-left corner, stretched to `width` x `height`.
    pub fn place_image(
        &mut self,
        image: ImagePayload,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::Assembly(format!(
                "invalid image box {}x{}",
                width, height
            )));
        }
        let (expected_width, expected_height) = (image.width, image.height);
        let stream = xobject::image_from(image.png).map_err(|e| Error::Assembly(e.to_string()))?;
        let dimension = |key: &[u8]| stream.dict.get(key).and_then(Object::as_i64).ok();
        if (dimension(b"Width"), dimension(b"Height"))
            != (Some(expected_width as i64), Some(expected_height as i64))
        {
            return Err(Error::Assembly(format!(
                "payload is {}x{} but the encoded image is {:?}x{:?}",
                expected_width,
                expected_height,
                dimension(b"Width"),
                dimension(b"Height")
            )));
        }

        let page_id = *self
            .page_ids
            .last()
            .ok_or_else(|| Error::Assembly("document has no pages".to_string()))?;
        // PDF user space starts at the bottom-left corner
        let bottom = self.format.height - y - height;
        self.doc
            .insert_image(page_id, stream, (x, bottom), (width, height))
            .map_err(|e| Error::Assembly(e.to_string()))
    }

    /// Write the page tree, catalog and info dictionary and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let mut pages = Dictionary::new();
        pages.set(b"Type", Object::Name(b"Pages".to_vec()));
        pages.set(b"Count", Object::Integer(kids.len() as i64));
        pages.set(b"Kids", Object::Array(kids));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set(b"Type", Object::Name(b"Catalog".to_vec()));
        catalog.set(b"Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);

        let mut info = Dictionary::new();
        if let Some(title) = &self.title {
            info.set(b"Title", text_string(title));
        }
        info.set(
            b"Producer",
            Object::String(
                format!("slidedeck {}", env!("CARGO_PKG_VERSION")).into_bytes(),
                StringFormat::Literal,
            ),
        );
        let now = chrono::Utc::now();
        let date_str = format!("D:{}", now.format("%Y%m%d%H%M%S+00'00'"));
        info.set(
            b"CreationDate",
            Object::String(date_str.into_bytes(), StringFormat::Literal),
        );
        let info_id = self.doc.add_object(info);

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| Error::Assembly(e.to_string()))?;
        Ok(bytes)
    }
}

/// A PDF text string: ASCII stays literal, anything else is UTF-16BE with a
/// byte order mark.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Bitmap;
    use image::{Rgb, RgbImage};
    use lopdf::content::Content;

    fn payload(width: u32, height: u32) -> ImagePayload {
        Bitmap::from(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])))
            .to_png()
            .unwrap()
    }

    #[test]
    fn landscape_format_puts_long_side_first() {
        assert_eq!(
            PageFormat::new(Orientation::Landscape, [595.0, 842.0]),
            PageFormat::A4_LANDSCAPE
        );
        let portrait = PageFormat::new(Orientation::Portrait, [842.0, 595.0]);
        assert_eq!((portrait.width, portrait.height), (595.0, 842.0));
    }

    #[test]
    fn starts_with_one_page_and_appends() {
        let mut doc = SlideDocument::new(PageFormat::A4_LANDSCAPE);
        assert_eq!(doc.page_count(), 1);
        doc.add_page();
        doc.add_page();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.page_size(), PageFormat::A4_LANDSCAPE);
    }

    #[test]
    fn rejects_payloads_that_cannot_be_embedded() {
        let mut doc = SlideDocument::new(PageFormat::A4_LANDSCAPE);
        let garbage = ImagePayload {
            width: 1,
            height: 1,
            png: vec![0, 1, 2, 3],
        };
        let err = doc.place_image(garbage, 0.0, 0.0, 842.0, 595.0).unwrap_err();
        assert!(matches!(err, Error::Assembly(_)));

        let mut mislabeled = payload(4, 4);
        mislabeled.width = 5;
        assert!(doc.place_image(mislabeled, 0.0, 0.0, 842.0, 595.0).is_err());
    }

    #[test]
    fn finished_document_parses_back() {
        let mut doc = SlideDocument::new(PageFormat::A4_LANDSCAPE).with_title("Deck");
        doc.place_image(payload(8, 6), 0.0, 0.0, 842.0, 595.0).unwrap();
        doc.add_page();
        doc.place_image(payload(8, 6), 0.0, 0.0, 842.0, 595.0).unwrap();
        let bytes = doc.finish().unwrap();

        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 2);

        for (_, page_id) in pages {
            let page = parsed.get_dictionary(page_id).unwrap();
            let media_box: Vec<f32> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o.as_float().unwrap())
                .collect();
            assert_eq!(media_box, vec![0.0, 0.0, 842.0, 595.0]);

            let content = Content::decode(&parsed.get_page_content(page_id).unwrap()).unwrap();
            let ops: Vec<&str> = content.operations.iter().map(|o| o.operator.as_str()).collect();
            assert_eq!(ops, vec!["q", "cm", "Do", "Q"]);
        }
    }

    #[test]
    fn top_left_box_maps_to_pdf_user_space() {
        let mut doc = SlideDocument::new(PageFormat::A4_LANDSCAPE);
        doc.place_image(payload(2, 2), 10.0, 20.0, 100.0, 50.0).unwrap();
        let bytes = doc.finish().unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        let (_, page_id) = parsed.get_pages().into_iter().next().unwrap();
        let content = Content::decode(&parsed.get_page_content(page_id).unwrap()).unwrap();
        let cm: Vec<f32> = content.operations[1]
            .operands
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(cm, vec![100.0, 0.0, 0.0, 50.0, 10.0, 525.0]);
    }

    fn info_title(bytes: &[u8]) -> Vec<u8> {
        let parsed = Document::load_mem(bytes).unwrap();
        let info_id = parsed.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = parsed.get_dictionary(info_id).unwrap();
        info.get(b"Title").unwrap().as_str().unwrap().to_vec()
    }

    #[test]
    fn ascii_title_is_written_as_is() {
        let bytes = SlideDocument::new(PageFormat::A4_LANDSCAPE)
            .with_title("English Literature in Practical Life")
            .finish()
            .unwrap();
        assert_eq!(info_title(&bytes), b"English Literature in Practical Life");
    }

    #[test]
    fn non_ascii_title_reads_back_intact() {
        let title = "Café – Literatur";
        let bytes = SlideDocument::new(PageFormat::A4_LANDSCAPE)
            .with_title(title)
            .finish()
            .unwrap();
        let raw = info_title(&bytes);
        assert_eq!(&raw[..2], &[0xFE, 0xFF]);
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(String::from_utf16(&units).unwrap(), title);
    }

    #[test]
    fn untouched_first_page_stays_blank() {
        let bytes = SlideDocument::new(PageFormat::A4_LANDSCAPE).finish().unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 1);
        let (_, page_id) = pages.into_iter().next().unwrap();
        let content = Content::decode(&parsed.get_page_content(page_id).unwrap()).unwrap();
        assert!(content.operations.is_empty());
    }
}
