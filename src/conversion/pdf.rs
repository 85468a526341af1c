//! PDF assembly with `lopdf`
//!
//! [`PdfBuilder`] accumulates pages from three kinds of sources: pages copied
//! out of existing PDFs, text rendered onto A4 pages in Courier, and raster
//! images placed one per A4 page.

use crate::config::ConversionConfig;
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::path::Path;

/// A4 in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITED_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on page tree walks, guards against `Parent` cycles
const MAX_PAGE_TREE_DEPTH: usize = 64;

const TAB_WIDTH: usize = 4;

/// Incrementally built output PDF
pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
    layout: ConversionConfig,
}

impl PdfBuilder {
    pub(crate) fn new(layout: ConversionConfig) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            layout,
        }
    }

    /// Pages added so far
    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy every page of the PDF at `path`, in order
    ///
    /// Returns the number of pages imported. On error nothing is added.
    pub(crate) fn append_pdf(&mut self, path: &Path) -> Result<usize, String> {
        let mut source = Document::load(path).map_err(|e| e.to_string())?;
        if source.is_encrypted() {
            return Err("encrypted PDF".to_string());
        }

        source.renumber_objects_with(self.doc.max_id + 1);
        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err("PDF has no pages".to_string());
        }

        let mut pages = Vec::with_capacity(page_ids.len());
        for page_id in &page_ids {
            let mut page = source
                .get_object(*page_id)
                .and_then(Object::as_dict)
                .map_err(|e| e.to_string())?
                .clone();

            for key in INHERITED_KEYS {
                if !page.has(key) {
                    if let Some(value) = inherited_attribute(&source, *page_id, key) {
                        page.set(key, value);
                    }
                }
            }
            if !page.has(b"MediaBox") {
                page.set("MediaBox", a4_media_box());
            }
            page.set("Parent", self.pages_id);
            pages.push((*page_id, page));
        }

        let source_max = source
            .objects
            .keys()
            .map(|(id, _)| *id)
            .max()
            .unwrap_or(source.max_id);
        self.doc.objects.extend(source.objects);
        for (page_id, page) in pages {
            self.doc.objects.insert(page_id, Object::Dictionary(page));
            self.kids.push(page_id.into());
        }
        self.doc.max_id = self.doc.max_id.max(source_max);

        Ok(page_ids.len())
    }

    /// Render `text` onto new pages under a `--- title ---` heading
    ///
    /// Returns the number of pages added.
    pub(crate) fn append_text(&mut self, title: &str, text: &str) -> Result<usize, String> {
        let mut lines = vec![format!("--- {} ---", title), String::new()];
        lines.extend(wrap_text(text, self.layout.text_line_width));

        let font_size = i64::from(self.layout.font_size);
        let leading = font_size + 2;
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => self.font_id,
            },
        });

        let mut added = 0;
        for chunk in lines.chunks(self.layout.lines_per_page.max(1)) {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(font_size)]),
                Operation::new("TL", vec![Object::Integer(leading)]),
                Operation::new(
                    "Td",
                    vec![Object::Integer(MARGIN), Object::Integer(PAGE_HEIGHT - MARGIN)],
                ),
            ];
            for line in chunk {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(line))],
                ));
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations }.encode().map_err(|e| e.to_string())?;
            let content_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), content));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => a4_media_box(),
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            self.kids.push(page_id.into());
            added += 1;
        }

        Ok(added)
    }

    /// Add the image at `path` as a single A4 page, scaled down to fit
    ///
    /// The image is decoded and embedded as 8-bit RGB (or gray) samples.
    pub(crate) fn append_image(&mut self, path: &Path) -> Result<(), String> {
        let decoded = image::ImageReader::open(path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string())?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err("image has no pixels".to_string());
        }
        let (color_space, samples) = if decoded.color().has_color() {
            ("DeviceRGB", decoded.to_rgb8().into_raw())
        } else {
            ("DeviceGray", decoded.to_luma8().into_raw())
        };

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
            },
            samples,
        ));

        let (w, h) = fit_to_page(width, height);
        let x = (PAGE_WIDTH as f32 - w) / 2.0;
        let y = (PAGE_HEIGHT as f32 - h) / 2.0;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(w.into()),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(h.into()),
                        Object::Real(x.into()),
                        Object::Real(y.into()),
                    ],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ],
        }
        .encode()
        .map_err(|e| e.to_string())?;

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => a4_media_box(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im1" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());

        Ok(())
    }

    /// Finish the page tree and write the document to `path`
    pub(crate) fn save(mut self, path: &Path) -> Result<(), String> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => Object::Integer(count),
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc.prune_objects();
        self.doc.compress();
        self.doc.save(path).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn a4_media_box() -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(PAGE_WIDTH),
        Object::Integer(PAGE_HEIGHT),
    ]
}

/// Size in points of a `width` x `height` pixel image placed on an A4 page
///
/// One pixel is one point; larger images are scaled down to fit inside the
/// margins, keeping their aspect ratio.
pub(crate) fn fit_to_page(width: u32, height: u32) -> (f32, f32) {
    let (width, height) = (width as f32, height as f32);
    let max_width = (PAGE_WIDTH - 2 * MARGIN) as f32;
    let max_height = (PAGE_HEIGHT - 2 * MARGIN) as f32;
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

/// Look up `key` on the page or the nearest ancestor that defines it
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_object(node_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Split text into display lines no wider than `width` characters
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for raw in text.lines() {
        let expanded = raw.replace('\t', &" ".repeat(TAB_WIDTH));
        let chars: Vec<char> = expanded.trim_end().chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            lines.push(chunk.iter().collect());
        }
    }

    lines
}

/// Encode for the WinAnsi (Latin-1 compatible) font encoding
///
/// Characters outside Latin-1 and control characters become `?`.
pub(crate) fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7e | 0xa0..=0xff => u32::from(c) as u8,
            _ => b'?',
        })
        .collect()
}
