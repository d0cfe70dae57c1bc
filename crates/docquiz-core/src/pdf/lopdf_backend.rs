//! PDF backend built on lopdf: content-stream text runs and image-based page
//! rasters.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage, imageops::FilterType};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfBackend, PdfDocument, Result, TextItem};
use crate::error::PdfError;

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: (f32, f32) = (612.0, 792.0);

/// TJ adjustments more negative than this (thousandths of an em) read as a
/// word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Opens documents with lopdf.
#[derive(Debug, Clone)]
pub struct LopdfBackend {
    max_dimension: u32,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self {
            max_dimension: 4096,
        }
    }

    /// Cap either raster dimension at `max` pixels.
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max.max(1);
        self
    }
}

impl Default for LopdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl PdfBackend for LopdfBackend {
    async fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>> {
        let data = data.to_vec();
        let document = tokio::task::spawn_blocking(move || load_document(&data))
            .await
            .map_err(|e| PdfError::LibraryLoad(format!("parser task failed: {e}")))??;

        Ok(Box::new(LopdfDocument {
            doc: Arc::new(document),
            max_dimension: self.max_dimension,
        }))
    }
}

fn load_document(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| {
        let message = e.to_string();
        let lower = message.to_lowercase();
        if lower.contains("encrypt") || lower.contains("decrypt") || lower.contains("password") {
            PdfError::Encrypted
        } else {
            PdfError::Parse(message)
        }
    })?;

    // Owner-password-only files open with an empty user password.
    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    debug!("Loaded PDF with {} pages", doc.get_pages().len());
    Ok(doc)
}

/// A document opened by [`LopdfBackend`].
pub struct LopdfDocument {
    doc: Arc<Document>,
    max_dimension: u32,
}

impl LopdfDocument {
    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.doc
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }
}

#[async_trait(?Send)]
impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    async fn text_items(&self, page: u32) -> Result<Vec<TextItem>> {
        let page_id = self.page_id(page)?;
        let doc = Arc::clone(&self.doc);

        tokio::task::spawn_blocking(move || extract_runs(&doc, page_id, page))
            .await
            .map_err(|e| PdfError::TextExtraction {
                page,
                reason: e.to_string(),
            })?
    }

    async fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage> {
        let page_id = self.page_id(page)?;
        let doc = Arc::clone(&self.doc);
        let max_dimension = self.max_dimension;

        tokio::task::spawn_blocking(move || rasterize(&doc, page_id, page, scale, max_dimension))
            .await
            .map_err(|e| PdfError::Render {
                page,
                reason: e.to_string(),
            })?
    }

    fn release(&mut self) {
        trace!("Dropping lopdf document ({} pages)", self.page_count());
    }
}

/// Walk a page's content stream and collect its text-showing operations.
fn extract_runs(doc: &Document, page_id: ObjectId, page: u32) -> Result<Vec<TextItem>> {
    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::TextExtraction {
            page,
            reason: e.to_string(),
        })?;
    let content = Content::decode(&raw).map_err(|e| PdfError::TextExtraction {
        page,
        reason: e.to_string(),
    })?;

    let encodings = font_encodings(doc, page_id);
    let mut font: Option<&Encoding> = None;
    let mut runs = RunCollector::default();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => runs.move_to(0.0, 0.0),
            "Tf" => {
                font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| encodings.get(name));
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands.first()), number(operands.get(1))) {
                    runs.move_by(tx, ty);
                }
            }
            "Tm" => {
                if let (Some(e), Some(f)) = (number(operands.get(4)), number(operands.get(5))) {
                    runs.move_to(e, f);
                }
            }
            "T*" => runs.break_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    runs.push(decode_pdf_string(bytes, font));
                }
            }
            "'" => {
                runs.break_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    runs.push(decode_pdf_string(bytes, font));
                }
            }
            "\"" => {
                runs.break_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    runs.push(decode_pdf_string(bytes, font));
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = operands.first() {
                    runs.push(decode_tj_array(parts, font));
                }
            }
            _ => {}
        }
    }

    let items = runs.finish();
    trace!("Page {}: {} text runs", page, items.len());
    Ok(items)
}

/// Tracks the text line origin and marks line ends as runs arrive.
#[derive(Default)]
struct RunCollector {
    items: Vec<TextItem>,
    x: f32,
    y: f32,
}

impl RunCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn move_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    fn break_line(&mut self) {
        if let Some(last) = self.items.last_mut() {
            last.end_of_line = true;
        }
    }

    fn push(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.items.last_mut() {
            if (last.y - self.y).abs() > 1.0 {
                last.end_of_line = true;
            }
        }
        self.items.push(TextItem {
            text,
            end_of_line: false,
            x: self.x,
            y: self.y,
        });
    }

    fn finish(mut self) -> Vec<TextItem> {
        self.break_line();
        self.items
    }
}

fn number(obj: Option<&Object>) -> Option<f32> {
    match obj? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_tj_array(parts: &[Object], font: Option<&Encoding>) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes, font)),
            other => {
                if number(Some(other)).is_some_and(|n| n < TJ_SPACE_THRESHOLD) && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
        }
    }
    text
}

/// Text encodings of the fonts in a page's resources, keyed by resource name.
///
/// Fonts lopdf cannot map to Unicode (Identity-H without a ToUnicode map,
/// for one) are left out and their strings take the raw path.
fn font_encodings(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, Encoding<'_>> {
    let fonts = match doc.get_page_fonts(page_id) {
        Ok(fonts) => fonts,
        Err(e) => {
            debug!("Could not collect page fonts: {}", e);
            return BTreeMap::new();
        }
    };

    fonts
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name, encoding)),
            Err(e) => {
                debug!("Font /{} has no usable encoding: {}", String::from_utf8_lossy(&name), e);
                None
            }
        })
        .collect()
}

/// Decode a string operand through the current font's encoding.
///
/// Without a usable font encoding the bytes are read as UTF-16BE when they
/// carry a byte-order mark, otherwise one character per byte. Multi-byte CID
/// strings then come out as control characters and symbols, which the
/// normalization pass strips; that is what surfaces unreadable fonts as an
/// encoding failure rather than a scan.
fn decode_pdf_string(bytes: &[u8], font: Option<&Encoding>) -> String {
    if let Some(encoding) = font {
        match Document::decode_text(encoding, bytes) {
            Ok(text) => return text,
            Err(e) => trace!("Font decoding failed, reading raw bytes: {}", e),
        }
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Produce a raster for a page: its largest image scaled to the page size,
/// or a blank white page when it carries no decodable image.
fn rasterize(
    doc: &Document,
    page_id: ObjectId,
    page: u32,
    scale: f32,
    max_dimension: u32,
) -> Result<RgbaImage> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PdfError::Render {
            page,
            reason: format!("invalid render scale {scale}"),
        });
    }

    let (width_pt, height_pt) = media_box(doc, page_id).unwrap_or(DEFAULT_MEDIA_BOX);
    let width = ((width_pt * scale).round() as u32).clamp(1, max_dimension);
    let height = ((height_pt * scale).round() as u32).clamp(1, max_dimension);

    let largest = page_images(doc, page_id)
        .into_iter()
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

    match largest {
        Some(img) => {
            debug!(
                "Page {}: scaling {}x{} image to {}x{}",
                page,
                img.width(),
                img.height(),
                width,
                height
            );
            Ok(image::imageops::resize(&img.to_rgba8(), width, height, FilterType::Triangle))
        }
        None => {
            debug!("Page {}: no image XObjects, rendering blank {}x{}", page, width, height);
            Ok(ImageBuffer::from_pixel(width, height, Rgba([255, 255, 255, 255])))
        }
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let entry = inherited_entry(doc, page_id, b"MediaBox")?;
    let values = match entry {
        Object::Array(values) => values,
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(values) => values,
            _ => return None,
        },
        _ => return None,
    };
    if values.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = values.iter().filter_map(|v| number(Some(v))).collect();
    if coords.len() != 4 {
        return None;
    }
    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Look up a page attribute, following `/Parent` for inheritable keys.
fn inherited_entry<'a>(doc: &'a Document, node_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = node_id;
    // Page trees are shallow; the bound stops reference cycles.
    for _ in 0..32 {
        let dict = match doc.get_object(current).ok()? {
            Object::Dictionary(dict) => dict,
            _ => return None,
        };
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let resources = inherited_entry(doc, page_id, b"Resources")?;
    match doc.dereference(resources).ok()? {
        (_, Object::Dictionary(dict)) => Some(dict),
        _ => None,
    }
}

fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let mut images = Vec::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return images;
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return images;
    };
    if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
        for (_name, obj_ref) in xobj_dict.iter() {
            if let Ok((_, obj)) = doc.dereference(obj_ref) {
                if let Some(img) = decode_image_xobject(doc, obj) {
                    images.push(img);
                }
            }
        }
    }

    trace!("Found {} images on page object {:?}", images.len(), page_id);
    images
}

fn decode_image_xobject(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // The stream content is a complete JPEG file.
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let components = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| color_components(doc, cs))
        .unwrap_or(3);

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    image_from_raw(&data, width, height, components, bits)
}

/// Number of colour components of a colour space object.
fn color_components(doc: &Document, color_space: &Object) -> Option<u8> {
    let (_, resolved) = doc.dereference(color_space).ok()?;
    match resolved {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
            _ => None,
        },
        Object::Array(parts) => {
            let family = parts.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let (_, profile) = doc.dereference(parts.get(1)?).ok()?;
                    let Object::Stream(profile) = profile else {
                        return None;
                    };
                    let n = profile.dict.get(b"N").ok()?.as_i64().ok()?;
                    u8::try_from(n).ok()
                }
                b"CalGray" => Some(1),
                b"CalRGB" => Some(3),
                _ => None,
            }
        }
        _ => None,
    }
}

fn image_from_raw(data: &[u8], width: u32, height: u32, components: u8, bits: i64) -> Option<DynamicImage> {
    if width == 0 || height == 0 {
        return None;
    }
    let pixels = (width as usize).checked_mul(height as usize)?;
    let mut rgba = Vec::with_capacity(pixels.checked_mul(4)?);

    match (components, bits) {
        (3, 8) => {
            let expected = pixels.checked_mul(3)?;
            if data.len() < expected {
                return None;
            }
            for chunk in data[..expected].chunks_exact(3) {
                rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
            }
        }
        (1, 8) => {
            if data.len() < pixels {
                return None;
            }
            for &gray in &data[..pixels] {
                rgba.extend_from_slice(&[gray, gray, gray, 255]);
            }
        }
        (1, 1) => {
            // Rows are padded to whole bytes; 1 is white.
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes.checked_mul(height as usize)? {
                return None;
            }
            for row in data.chunks_exact(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    let value = if bit == 1 { 255 } else { 0 };
                    rgba.extend_from_slice(&[value, value, value, 255]);
                }
            }
        }
        _ => {
            trace!("Unsupported raw image: {} components, {} bits", components, bits);
            return None;
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// Build a PDF whose pages carry the given content streams, with a
    /// Helvetica font under `/F1`.
    pub(crate) fn make_pdf(pages: &[&str]) -> Vec<u8> {
        build_pdf(pages, |doc| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            })
        })
    }

    /// A one-page PDF showing `text` through a Type0 Identity-H font whose
    /// glyph codes only mean something through its ToUnicode map.
    pub(crate) fn identity_h_pdf(text: &str) -> Vec<u8> {
        let chars: Vec<char> = text.chars().collect();

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        cmap.push_str(&format!("{} beginbfchar\n", chars.len()));
        for (i, c) in chars.iter().enumerate() {
            cmap.push_str(&format!("<{:04X}> <{:04X}>\n", i + 1, *c as u32));
        }
        cmap.push_str(
            "endbfchar\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n",
        );

        let codes: String = (1..=chars.len()).map(|i| format!("{i:04X}")).collect();
        let content = format!("BT /F1 12 Tf 72 700 Td <{codes}> Tj ET");

        build_pdf(&[&content], |doc| {
            let to_unicode = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => "ArialMT",
                "Encoding" => "Identity-H",
                "ToUnicode" => to_unicode,
            })
        })
    }

    fn build_pdf(pages: &[&str], font: impl FnOnce(&mut Document) -> ObjectId) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = font(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let kids: Vec<Object> = pages
            .iter()
            .map(|content| {
                let content_id =
                    doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                })
                .into()
            })
            .collect();

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    async fn open(data: &[u8]) -> Box<dyn PdfDocument> {
        LopdfBackend::new().open(data).await.unwrap()
    }

    #[tokio::test]
    async fn reads_runs_with_line_breaks() {
        let data = make_pdf(&[
            "BT /F1 12 Tf 72 700 Td (Hello) Tj ( world) Tj 0 -14 Td (Next line) Tj ET",
        ]);
        let doc = open(&data).await;
        assert_eq!(doc.page_count(), 1);

        let items = doc.text_items(1).await.unwrap();
        let texts: Vec<(&str, bool)> = items
            .iter()
            .map(|i| (i.text.as_str(), i.end_of_line))
            .collect();
        assert_eq!(
            texts,
            vec![("Hello", false), (" world", true), ("Next line", true)]
        );
        assert_eq!(items[0].y, 700.0);
        assert_eq!(items[2].y, 686.0);
    }

    #[tokio::test]
    async fn tj_arrays_insert_word_gaps() {
        let data = make_pdf(&["BT /F1 12 Tf [(Quiz) -350 (time) 20 (!)] TJ T* (again) ' ET"]);
        let doc = open(&data).await;

        let items = doc.text_items(1).await.unwrap();
        assert_eq!(items[0].text, "Quiz time!");
        assert!(items[0].end_of_line);
        assert_eq!(items[1].text, "again");
    }

    #[tokio::test]
    async fn blank_page_renders_white_at_scale() {
        let data = make_pdf(&[""]);
        let doc = open(&data).await;

        assert!(doc.text_items(1).await.unwrap().is_empty());
        let raster = doc.render_page(1, 1.5).await.unwrap();
        assert_eq!(raster.dimensions(), (300, 150));
        assert!(raster.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn render_respects_dimension_cap() {
        let data = make_pdf(&[""]);
        let doc = LopdfBackend::new()
            .with_max_dimension(64)
            .open(&data)
            .await
            .unwrap();

        let raster = doc.render_page(1, 10.0).await.unwrap();
        assert_eq!(raster.dimensions(), (64, 64));
    }

    #[tokio::test]
    async fn garbage_is_invalid_format() {
        let err = LopdfBackend::new().open(b"not a pdf").await.err().unwrap();
        assert!(matches!(err, PdfError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn out_of_range_page_is_rejected() {
        let data = make_pdf(&["BT (x) Tj ET"]);
        let doc = open(&data).await;
        assert!(matches!(doc.text_items(2).await, Err(PdfError::InvalidPage(2))));
    }

    #[tokio::test]
    async fn identity_h_text_goes_through_to_unicode_map() {
        let data = identity_h_pdf("Tiếng Việt là ngôn ngữ chính thức");
        let doc = open(&data).await;

        let items = doc.text_items(1).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Tiếng Việt là ngôn ngữ chính thức");
    }

    #[tokio::test]
    async fn identity_h_without_map_reads_raw_codes() {
        let data = build_pdf(&["BT /F1 12 Tf <000100020003> Tj ET"], |doc| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => "ArialMT",
                "Encoding" => "Identity-H",
            })
        });
        let doc = open(&data).await;

        let items = doc.text_items(1).await.unwrap();
        assert!(items[0].is_meaningful());
        assert!(items[0].text.chars().all(char::is_control));
    }

    #[tokio::test]
    async fn win_ansi_keeps_typographic_characters() {
        let data = build_pdf(
            &[r"BT /F1 12 Tf 72 700 Td (\223Photosynthesis\224 \227 light to sugar \200 5) Tj ET"],
            |doc| {
                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                })
            },
        );
        let doc = open(&data).await;

        let items = doc.text_items(1).await.unwrap();
        assert_eq!(
            items[0].text,
            "\u{201C}Photosynthesis\u{201D} \u{2014} light to sugar \u{20AC} 5"
        );
    }

    #[test]
    fn raw_strings_without_font() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x1E, 0xBF];
        assert_eq!(decode_pdf_string(&bytes, None), "Hế");
        assert_eq!(decode_pdf_string(b"caf\xe9", None), "café");
    }

    #[test]
    fn unpacks_one_bit_gray() {
        // 10 px wide -> 2 bytes per row
        let data = [0b1010_0000, 0b1100_0000];
        let img = image_from_raw(&data, 10, 1, 1, 1).unwrap().to_rgba8();
        let row: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        assert_eq!(row, vec![255, 0, 255, 0, 0, 0, 0, 0, 255, 255]);
    }
}
