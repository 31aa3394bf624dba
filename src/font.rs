use crate::types::Pt;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Standard Type1 metrics for the faces every PDF viewer carries. Widths
/// are per-character advances for 32..=126, in 1000-unit em space (AFM).
#[derive(Debug)]
pub(crate) struct BuiltinMetrics {
    pub(crate) name: &'static str,
    widths: &'static [u16; 95],
    missing_width: u16,
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const COURIER_WIDTHS: [u16; 95] = [600; 95];

const BUILTIN_FONTS: [BuiltinMetrics; 4] = [
    BuiltinMetrics {
        name: "Helvetica",
        widths: &HELVETICA_WIDTHS,
        missing_width: 556,
    },
    BuiltinMetrics {
        name: "Helvetica-Bold",
        widths: &HELVETICA_BOLD_WIDTHS,
        missing_width: 556,
    },
    BuiltinMetrics {
        name: "Courier",
        widths: &COURIER_WIDTHS,
        missing_width: 600,
    },
    BuiltinMetrics {
        name: "Courier-Bold",
        widths: &COURIER_WIDTHS,
        missing_width: 600,
    },
];

impl BuiltinMetrics {
    fn advance_for_char(&self, ch: char) -> u16 {
        let code = ch as u32;
        if (32..=126).contains(&code) {
            self.widths[(code - 32) as usize]
        } else {
            self.missing_width
        }
    }

    fn measure_text_width(&self, font_size: Pt, text: &str) -> Pt {
        let mut total_units: i32 = 0;
        for ch in text.chars() {
            total_units = total_units.saturating_add(self.advance_for_char(ch) as i32);
        }
        if total_units <= 0 {
            return Pt::ZERO;
        }
        font_size.mul_ratio(total_units, 1000)
    }
}

/// A TTF/OTF face registered for label text, with the metrics the PDF
/// descriptor needs extracted up front.
#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) metrics: FaceMetrics,
}

#[derive(Debug)]
pub(crate) struct FaceMetrics {
    pub(crate) first_char: u8,
    pub(crate) last_char: u8,
    /// Advances in 1000-unit em space, indexed from `first_char`.
    pub(crate) widths: Vec<u16>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) stem_v: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

impl FaceMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let first_char = 32u8;
        let last_char = 126u8;

        let mut widths = Vec::with_capacity((last_char - first_char + 1) as usize);
        for code in first_char..=last_char {
            let advance = face
                .glyph_index(code as char)
                .and_then(|gid| face.glyph_hor_advance(gid))
                .unwrap_or(0);
            widths.push(scale_u16(advance, scale));
        }
        let missing_width = widths
            .get((b' ' - first_char) as usize)
            .copied()
            .unwrap_or(0);

        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );

        Self {
            first_char,
            last_char,
            widths,
            ascent,
            descent,
            cap_height,
            italic_angle,
            stem_v: 80,
            bbox,
            missing_width,
            is_fixed_pitch: face.is_monospaced(),
        }
    }

    fn advance_for_char(&self, ch: char) -> u16 {
        let code = ch as u32;
        let first = self.first_char as u32;
        let last = self.last_char as u32;
        if code < first || code > last {
            return self.missing_width;
        }
        self.widths
            .get((code - first) as usize)
            .copied()
            .unwrap_or(self.missing_width)
    }

    fn measure_text_width(&self, font_size: Pt, text: &str) -> Pt {
        let mut total_units: i32 = 0;
        for ch in text.chars() {
            total_units = total_units.saturating_add(self.advance_for_char(ch) as i32);
        }
        if total_units <= 0 {
            return Pt::ZERO;
        }
        font_size.mul_ratio(total_units, 1000)
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn scale_u16(value: u16, scale: f32) -> u16 {
    let scaled = (value as f32 * scale).round();
    scaled.clamp(0.0, u16::MAX as f32) as u16
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Width oracle for the text fitter and font source for the PDF writer:
/// Base-14 metrics plus any registered faces.
#[derive(Debug, Default)]
pub struct FontSet {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
}

impl FontSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                self.register_file(path);
            }
        }
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" {
            return;
        }
        let Ok(data) = fs::read(path) else {
            return;
        };
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return;
        };

        let name = face_name(&face).unwrap_or_else(|| {
            path.file_stem()
                .and_then(|v| v.to_str())
                .unwrap_or("RegisteredFont")
                .to_string()
        });
        let metrics = FaceMetrics::from_face(&face);
        let index = self.fonts.len();
        let key = normalize_name(&name);
        self.fonts.push(RegisteredFont {
            name,
            data,
            metrics,
        });
        self.lookup.entry(key).or_insert(index);
    }

    pub(crate) fn registered(&self, name: &str) -> Option<&RegisteredFont> {
        self.lookup
            .get(&normalize_name(name))
            .and_then(|index| self.fonts.get(*index))
    }

    pub(crate) fn builtin(name: &str) -> Option<&'static BuiltinMetrics> {
        let key = normalize_name(name);
        BUILTIN_FONTS
            .iter()
            .find(|font| normalize_name(font.name) == key)
    }

    /// A name the renderer may use: registered face or Base-14 builtin.
    pub fn knows(&self, name: &str) -> bool {
        self.registered(name).is_some() || Self::builtin(name).is_some()
    }

    pub fn measure_text_width(&self, name: &str, font_size: Pt, text: &str) -> Pt {
        if let Some(font) = self.registered(name) {
            return font.metrics.measure_text_width(font_size, text);
        }
        if let Some(builtin) = Self::builtin(name) {
            return builtin.measure_text_width(font_size, text);
        }
        // Unknown face: the 0.6 em estimate keeps fitting monotonic.
        let char_width = (font_size * 0.6).max(Pt::from_f32(1.0));
        char_width * (text.chars().count() as i32)
    }
}

fn face_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    use ttf_parser::name::name_id;

    let mut full = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::POST_SCRIPT_NAME => return Some(name),
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            _ => {}
        }
    }
    full
}
