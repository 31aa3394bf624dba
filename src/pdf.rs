use crate::canvas::{Command, Document, Page};
use crate::error::DiecutError;
use crate::flate::zlib_compress;
use crate::font::{FontSet, RegisteredFont};
use crate::qr;
use crate::types::{Pt, Size};
use image::GrayImage;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_INFO_ID: usize = 4;

/// Raster sources are named, not stored: a `qr:<payload>` resource id is
/// rasterized (and dropped again) while its page streams out.
const QR_SCHEME: &str = "qr:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamFontKind {
    Type1,
    TrueType,
}

struct StreamFont {
    logical_name: String,
    resource: String,
    kind: StreamFontKind,
}

/// Streams a recorded document out as PDF: objects are written in
/// generation order with byte offsets tracked for the xref table. Page
/// content and image payloads go out as each page is rendered; fonts and
/// the shared resource dictionary follow at finish time.
pub(crate) struct PdfStreamWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>, // indexed by object id; 0 is the free object.
    next_id: usize,
    page_size: Size,
    fonts_available: &'a FontSet,
    title: Option<String>,

    fonts: BTreeMap<String, StreamFont>,
    next_font_resource: usize,

    image_resources: Vec<(String, usize)>,
    image_name_map: HashMap<String, String>,
    image_content_map: HashMap<u64, String>,
    next_image_index: usize,

    page_ids: Vec<usize>,
}

impl<'a, W: Write> PdfStreamWriter<'a, W> {
    pub(crate) fn new(
        writer: &'a mut W,
        page_size: Size,
        fonts_available: &'a FontSet,
        title: Option<String>,
    ) -> Result<Self, DiecutError> {
        let mut offset = 0usize;
        write_bytes(writer, b"%PDF-1.7\n", &mut offset)?;
        write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;

        Ok(Self {
            writer,
            offset,
            offsets: vec![0; PDF_INFO_ID + 1],
            next_id: PDF_INFO_ID + 1,
            page_size,
            fonts_available,
            title,
            fonts: BTreeMap::new(),
            next_font_resource: 1,
            image_resources: Vec::new(),
            image_name_map: HashMap::new(),
            image_content_map: HashMap::new(),
            next_image_index: 1,
            page_ids: Vec::new(),
        })
    }

    pub(crate) fn add_document(&mut self, document: &Document) -> Result<(), DiecutError> {
        if document.page_size != self.page_size {
            return Err(DiecutError::InvalidGeometry(
                "mixed page sizes are not supported in a single PDF stream".to_string(),
            ));
        }
        for page in &document.pages {
            self.add_page(page)?;
        }
        Ok(())
    }

    fn add_page(&mut self, page: &Page) -> Result<(), DiecutError> {
        self.embed_page_images(page)?;

        let start = self.alloc_ids(2);
        let content_id = start;
        let page_id = start + 1;

        let content = self.render_page(page);
        self.write_object(content_id, &stream_object(&content))?;

        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(self.page_size.width),
            fmt_pt(self.page_size.height),
            PDF_RESOURCES_ID,
            content_id,
        );
        self.write_object(page_id, &page_obj)?;
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Rasterizes and compresses the page's not-yet-embedded image sources
    /// in one parallel batch, then writes the objects in command order.
    /// Payloads identical to an already embedded raster reuse its object.
    fn embed_page_images(&mut self, page: &Page) -> Result<(), DiecutError> {
        let mut pending: Vec<&str> = Vec::new();
        for cmd in &page.commands {
            if let Command::DrawImage { resource_id, .. } = cmd {
                if !self.image_name_map.contains_key(resource_id)
                    && !pending.contains(&resource_id.as_str())
                {
                    pending.push(resource_id);
                }
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let embedded: Vec<(String, u64, String)> = pending
            .par_iter()
            .filter_map(|id| {
                resolve_image(id).map(|result| {
                    result.map(|raster| {
                        (id.to_string(), hash_bytes(raster.as_raw()), gray_image_object(&raster))
                    })
                })
            })
            .collect::<Result<_, DiecutError>>()?;

        for (resource_id, hash, body) in embedded {
            if let Some(name) = self.image_content_map.get(&hash) {
                let name = name.clone();
                self.image_name_map.insert(resource_id, name);
                continue;
            }
            let name = format!("Im{}", self.next_image_index);
            self.next_image_index += 1;
            let object_id = self.alloc_ids(1);
            self.write_object(object_id, &body)?;
            self.image_resources.push((name.clone(), object_id));
            self.image_name_map.insert(resource_id, name.clone());
            self.image_content_map.insert(hash, name);
        }
        Ok(())
    }

    fn render_page(&mut self, page: &Page) -> String {
        let page_height = self.page_size.height;
        let mut out = String::new();
        let mut current_font_name = "Helvetica".to_string();
        let mut current_font_size = Pt::from_f32(12.0);

        for cmd in &page.commands {
            match cmd {
                Command::SetFillColor(color) => {
                    out.push_str(&format!(
                        "{} {} {} rg\n",
                        fmt(color.r),
                        fmt(color.g),
                        fmt(color.b)
                    ));
                }
                Command::SetStrokeColor(color) => {
                    out.push_str(&format!(
                        "{} {} {} RG\n",
                        fmt(color.r),
                        fmt(color.g),
                        fmt(color.b)
                    ));
                }
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetFontName(name) => {
                    current_font_name = name.clone();
                    self.ensure_font(&current_font_name);
                }
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::FillRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let draw_y = page_height - *y - *height;
                    out.push_str(&format!(
                        "{} {} {} {} re\nf\n",
                        fmt_pt(*x),
                        fmt_pt(draw_y),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let draw_y = page_height - *y - *height;
                    out.push_str(&format!(
                        "{} {} {} {} re\nS\n",
                        fmt_pt(*x),
                        fmt_pt(draw_y),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::DrawString { x, y, text } => {
                    self.ensure_font(&current_font_name);
                    let resource = self
                        .fonts
                        .get(&current_font_name)
                        .map(|f| f.resource.clone())
                        .unwrap_or_else(|| "F1".to_string());
                    out.push_str("BT\n");
                    out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                    out.push_str(&format!("{} {} Td\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                    out.push_str(&format!("({}) Tj\n", escape_pdf_text(text)));
                    out.push_str("ET\n");
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    // Unresolvable sources were skipped by the embed pass;
                    // skipping the draw keeps the rest of the page intact.
                    let Some(name) = self.image_name_map.get(resource_id) else {
                        continue;
                    };
                    let draw_y = page_height - *y - *height;
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(draw_y)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
            }
        }
        out
    }

    fn ensure_font(&mut self, name: &str) {
        if self.fonts.contains_key(name) {
            return;
        }
        let resource = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        let kind = if self.fonts_available.registered(name).is_some() {
            StreamFontKind::TrueType
        } else {
            StreamFontKind::Type1
        };
        self.fonts.insert(
            name.to_string(),
            StreamFont {
                logical_name: name.to_string(),
                resource,
                kind,
            },
        );
    }

    pub(crate) fn finish(&mut self) -> Result<usize, DiecutError> {
        // 1) Fonts.
        let fonts = std::mem::take(&mut self.fonts);
        let mut font_refs: Vec<(String, usize)> = Vec::new();
        for (_key, font) in &fonts {
            match font.kind {
                StreamFontKind::Type1 => {
                    let id = self.alloc_ids(1);
                    self.write_object(id, &type1_font_object(&font.logical_name))?;
                    font_refs.push((font.resource.clone(), id));
                }
                StreamFontKind::TrueType => {
                    let Some(registered) = self.fonts_available.registered(&font.logical_name)
                    else {
                        let id = self.alloc_ids(1);
                        self.write_object(id, &type1_font_object(&font.logical_name))?;
                        font_refs.push((font.resource.clone(), id));
                        continue;
                    };
                    let start = self.alloc_ids(3);
                    let (dict, descriptor, file) = truetype_font_objects(registered, start);
                    self.write_object(start, &dict)?;
                    self.write_object(start + 1, &descriptor)?;
                    self.write_object(start + 2, &file)?;
                    font_refs.push((font.resource.clone(), start));
                }
            }
        }

        // 2) Shared resources.
        let mut resources = String::from("<< ");
        if !font_refs.is_empty() {
            let entries: Vec<String> = font_refs
                .iter()
                .map(|(resource, id)| format!("/{} {} 0 R", resource, id))
                .collect();
            resources.push_str(&format!("/Font << {} >> ", entries.join(" ")));
        }
        if !self.image_resources.is_empty() {
            let entries: Vec<String> = self
                .image_resources
                .iter()
                .map(|(resource, id)| format!("/{} {} 0 R", resource, id))
                .collect();
            resources.push_str(&format!("/XObject << {} >> ", entries.join(" ")));
        }
        resources.push_str(">>");
        self.write_object(PDF_RESOURCES_ID, &resources)?;

        // 3) Page tree + catalog + info.
        let kids: Vec<String> = self
            .page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect();
        let pages_obj = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            self.page_ids.len()
        );
        self.write_object(PDF_PAGES_ID, &pages_obj)?;

        let catalog = format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID);
        self.write_object(PDF_CATALOG_ID, &catalog)?;

        let mut info = String::from("<< /Producer (diecut)");
        if let Some(title) = self.title.as_deref() {
            info.push_str(&format!(" /Title ({})", escape_pdf_text(title)));
        }
        info.push_str(" >>");
        self.write_object(PDF_INFO_ID, &info)?;

        // 4) XRef + trailer.
        let total_objects = self.next_id.saturating_sub(1);
        let xref_start = self.offset;
        write_str(
            self.writer,
            &format!("xref\n0 {}\n", total_objects + 1),
            &mut self.offset,
        )?;
        write_bytes(self.writer, b"0000000000 65535 f \n", &mut self.offset)?;
        for id in 1..=total_objects {
            let obj_offset = self.offsets.get(id).copied().unwrap_or(0);
            write_str(
                self.writer,
                &format!("{:010} 00000 n \n", obj_offset),
                &mut self.offset,
            )?;
        }
        let trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            total_objects + 1,
            PDF_CATALOG_ID,
            PDF_INFO_ID,
            xref_start
        );
        write_str(self.writer, &trailer, &mut self.offset)?;
        Ok(self.offset)
    }

    fn alloc_ids(&mut self, count: usize) -> usize {
        let start = self.next_id;
        self.next_id = self.next_id.saturating_add(count);
        if self.offsets.len() < self.next_id {
            self.offsets.resize(self.next_id, 0);
        }
        start
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        self.offsets[obj_id] = self.offset;
        write_str(
            self.writer,
            &format!("{} 0 obj\n{}\nendobj\n", obj_id, body),
            &mut self.offset,
        )
    }
}

/// Writes `document` as a complete PDF and returns the bytes written.
pub(crate) fn write_document<W: Write>(
    document: &Document,
    fonts: &FontSet,
    title: Option<&str>,
    writer: &mut W,
) -> Result<usize, DiecutError> {
    let mut stream = PdfStreamWriter::new(
        writer,
        document.page_size,
        fonts,
        title.map(|t| t.to_string()),
    )?;
    stream.add_document(document)?;
    stream.finish()
}

fn resolve_image(resource_id: &str) -> Option<Result<GrayImage, DiecutError>> {
    let payload = resource_id.strip_prefix(QR_SCHEME)?;
    Some(qr::encode_badge(payload))
}

fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(bytes)?;
    *offset += bytes.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, value: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, value.as_bytes(), offset)
}

fn stream_object(content: &str) -> String {
    let length = content.as_bytes().len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn type1_font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn truetype_font_objects(font: &RegisteredFont, start_id: usize) -> (String, String, String) {
    let base = sanitize_font_name(&font.name);
    let metrics = &font.metrics;
    let descriptor_id = start_id + 1;
    let file_id = start_id + 2;

    let widths = metrics
        .widths
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let dict = format!(
        "<< /Type /Font /Subtype /TrueType /BaseFont /{} /FirstChar {} /LastChar {} /Widths [{}] /FontDescriptor {} 0 R /Encoding /WinAnsiEncoding >>",
        base, metrics.first_char, metrics.last_char, widths, descriptor_id
    );

    let mut flags = 32;
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV {} /MissingWidth {} /FontFile2 {} 0 R >>",
        base,
        flags,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.stem_v,
        metrics.missing_width,
        file_id
    );

    let stream_data = encode_stream_data(&zlib_compress(&font.data));
    let file = format!(
        "<< /Length {} /Length1 {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        stream_data.as_bytes().len(),
        font.data.len(),
        stream_data
    );

    (dict, descriptor, file)
}

fn gray_image_object(image: &GrayImage) -> String {
    let stream_data = encode_stream_data(&zlib_compress(image.as_raw()));
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>
stream
{}
endstream",
        image.width(),
        image.height(),
        stream_data.as_bytes().len(),
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2 + data.len() / 32 + 1);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{:02X}", byte);
        if index % 32 == 31 {
            hex.push('\n');
        }
    }
    hex.push('>');
    hex
}

fn hash_bytes(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        "Helvetica".to_string()
    } else {
        out
    }
}

fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ch if (ch as u32) < 32 => {
                out.push_str(&format!("\\{:03o}", ch as u32));
            }
            ch if (ch as u32) < 127 => out.push(ch),
            ch if (ch as u32) < 256 => {
                // Latin-1 subset of WinAnsi round-trips as an octal escape.
                out.push_str(&format!("\\{:03o}", ch as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value as f64 * 1000.0).round() as i64;
    format_milli(rounded)
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn format_milli(milli: i64) -> String {
    let negative = milli < 0;
    let abs = milli.unsigned_abs();
    let int_part = abs / 1000;
    let frac = abs % 1000;
    let mut out = String::new();
    if negative && (int_part > 0 || frac > 0) {
        out.push('-');
    }
    out.push_str(&int_part.to_string());
    if frac > 0 {
        let frac_str = format!("{:03}", frac);
        let trimmed = frac_str.trim_end_matches('0');
        out.push('.');
        out.push_str(trimmed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::Color;

    fn one_page_document(build: impl FnOnce(&mut Canvas)) -> Document {
        let mut canvas = Canvas::new(Size::a4());
        build(&mut canvas);
        canvas.finish()
    }

    fn to_bytes(document: &Document) -> Vec<u8> {
        let fonts = FontSet::new();
        let mut bytes = Vec::new();
        let written = write_document(document, &fonts, Some("test"), &mut bytes).unwrap();
        assert_eq!(written, bytes.len());
        bytes
    }

    #[test]
    fn format_milli_trims_trailing_zeros() {
        assert_eq!(format_milli(1000), "1");
        assert_eq!(format_milli(1500), "1.5");
        assert_eq!(format_milli(1502), "1.502");
        assert_eq!(format_milli(-250), "-0.25");
        assert_eq!(format_milli(0), "0");
    }

    #[test]
    fn escapes_pdf_string_delimiters() {
        assert_eq!(escape_pdf_text("A(B)C\\"), "A\\(B\\)C\\\\");
        assert_eq!(escape_pdf_text("ü"), "\\374");
    }

    #[test]
    fn minimal_document_parses() {
        let doc = one_page_document(|canvas| {
            canvas.set_fill_color(Color::rgb(0.5, 0.5, 0.5));
            canvas.fill_rect(
                Pt::from_f32(10.0),
                Pt::from_f32(20.0),
                Pt::from_f32(30.0),
                Pt::from_f32(40.0),
            );
        });
        let bytes = to_bytes(&doc);
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let parsed = lopdf::Document::load_mem(&bytes).expect("valid pdf");
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn rect_y_flips_to_pdf_space() {
        let doc = one_page_document(|canvas| {
            canvas.stroke_rect(
                Pt::from_f32(10.0),
                Pt::from_f32(20.0),
                Pt::from_f32(30.0),
                Pt::from_f32(40.0),
            );
        });
        let bytes = to_bytes(&doc);
        let pdf = String::from_utf8_lossy(&bytes);
        // A4 height 841.89: y' = 841.89 - 20 - 40.
        assert!(pdf.contains("10 781.89 30 40 re\nS"));
    }

    #[test]
    fn text_uses_the_baseline_directly() {
        let doc = one_page_document(|canvas| {
            canvas.set_font("Helvetica-Bold", Pt::from_f32(9.0));
            canvas.draw_string(Pt::from_f32(100.0), Pt::from_f32(50.0), "ASN00001");
        });
        let bytes = to_bytes(&doc);
        let pdf = String::from_utf8_lossy(&bytes);
        assert!(pdf.contains("/F1 9 Tf"));
        assert!(pdf.contains("100 791.89 Td"));
        assert!(pdf.contains("(ASN00001) Tj"));
        assert!(pdf.contains("/BaseFont /Helvetica-Bold"));
        assert!(pdf.contains("/Subtype /Type1"));
    }

    #[test]
    fn qr_sources_embed_once_per_payload() {
        let doc = one_page_document(|canvas| {
            canvas.draw_image(
                Pt::from_f32(0.0),
                Pt::from_f32(0.0),
                Pt::from_f32(20.0),
                Pt::from_f32(20.0),
                "qr:ASN00001",
            );
            // Same payload drawn twice, one object.
            canvas.draw_image(
                Pt::from_f32(40.0),
                Pt::from_f32(0.0),
                Pt::from_f32(20.0),
                Pt::from_f32(20.0),
                "qr:ASN00001",
            );
            canvas.draw_image(
                Pt::from_f32(80.0),
                Pt::from_f32(0.0),
                Pt::from_f32(20.0),
                Pt::from_f32(20.0),
                "qr:ASN00002",
            );
        });
        let bytes = to_bytes(&doc);
        let pdf = String::from_utf8_lossy(&bytes);
        assert_eq!(pdf.matches("/Subtype /Image").count(), 2);
        assert_eq!(pdf.matches("/Im1 Do").count(), 2);
        assert_eq!(pdf.matches("/Im2 Do").count(), 1);
    }

    #[test]
    fn embedded_rasters_survive_across_pages() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_image(
            Pt::from_f32(0.0),
            Pt::from_f32(0.0),
            Pt::from_f32(20.0),
            Pt::from_f32(20.0),
            "qr:ASN00001",
        );
        canvas.show_page();
        canvas.draw_image(
            Pt::from_f32(0.0),
            Pt::from_f32(0.0),
            Pt::from_f32(20.0),
            Pt::from_f32(20.0),
            "qr:ASN00001",
        );
        canvas.show_page();
        let doc = canvas.finish();

        let bytes = to_bytes(&doc);
        let pdf = String::from_utf8_lossy(&bytes);
        assert_eq!(pdf.matches("/Subtype /Image").count(), 1);
        assert_eq!(pdf.matches("/Im1 Do").count(), 2);
    }

    #[test]
    fn unresolvable_sources_skip_the_draw() {
        let doc = one_page_document(|canvas| {
            canvas.draw_image(
                Pt::from_f32(0.0),
                Pt::from_f32(0.0),
                Pt::from_f32(20.0),
                Pt::from_f32(20.0),
                "logo.png",
            );
        });
        let bytes = to_bytes(&doc);
        let pdf = String::from_utf8_lossy(&bytes);
        assert_eq!(pdf.matches("/Subtype /Image").count(), 0);
        assert_eq!(pdf.matches(" Do").count(), 0);
        assert!(lopdf::Document::load_mem(&bytes).is_ok());
    }

    #[test]
    fn image_streams_decode_to_the_raster() {
        let doc = one_page_document(|canvas| {
            canvas.draw_image(
                Pt::from_f32(0.0),
                Pt::from_f32(0.0),
                Pt::from_f32(20.0),
                Pt::from_f32(20.0),
                "qr:ASN00042",
            );
        });
        let bytes = to_bytes(&doc);
        let parsed = lopdf::Document::load_mem(&bytes).expect("valid pdf");
        let image_obj = parsed
            .objects
            .values()
            .find_map(|obj| {
                let stream = obj.as_stream().ok()?;
                let subtype = stream.dict.get(b"Subtype").ok()?;
                (subtype.as_name().ok()? == b"Image").then(|| stream.clone())
            })
            .expect("image xobject present");

        // Undo the hex layer, then let lopdf handle the flate layer.
        let mut zlib = Vec::new();
        let mut hi: Option<u8> = None;
        for &byte in &image_obj.content {
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'A'..=b'F' => byte - b'A' + 10,
                b'a'..=b'f' => byte - b'a' + 10,
                b'>' => break,
                _ => continue,
            };
            match hi.take() {
                Some(h) => zlib.push((h << 4) | digit),
                None => hi = Some(digit),
            }
        }
        let mut dict = lopdf::Dictionary::new();
        dict.set("Filter", "FlateDecode");
        dict.set("Length", zlib.len() as i64);
        let stream = lopdf::Stream::new(dict, zlib);
        let decoded = stream.get_plain_content().expect("decodable stream");

        let raster = crate::qr::encode_badge("ASN00042").unwrap();
        assert_eq!(decoded, *raster.as_raw());
    }

    #[test]
    fn multi_page_documents_keep_page_order() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.fill_rect(Pt::ZERO, Pt::ZERO, Pt::from_f32(1.0), Pt::from_f32(1.0));
        canvas.show_page();
        canvas.fill_rect(Pt::ZERO, Pt::ZERO, Pt::from_f32(2.0), Pt::from_f32(2.0));
        canvas.show_page();
        let doc = canvas.finish();

        let bytes = to_bytes(&doc);
        let parsed = lopdf::Document::load_mem(&bytes).expect("valid pdf");
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn rejects_mixed_page_sizes() {
        let fonts = FontSet::new();
        let mut bytes = Vec::new();
        let mut writer = PdfStreamWriter::new(&mut bytes, Size::a4(), &fonts, None).unwrap();
        let letter_doc = Canvas::new(Size::letter()).finish();
        assert!(writer.add_document(&letter_doc).is_err());
    }
}
