use crate::types::{Margins, Pt, Size};

/// Physical description of one die-cut sheet: page, margins, grid and the
/// dead zones inside each label. The margins define a fixed sheet box that
/// never moves; rows/cols tile it into uniform cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    pub page: Size,
    pub margins: Margins,
    pub rows: u32,
    pub cols: u32,
    /// Gap between horizontally adjacent labels.
    pub gap_x: Pt,
    /// Gap between vertically adjacent labels.
    pub gap_y: Pt,
    pub deadzone_left: Pt,
    pub deadzone_right: Pt,
}

impl SheetSpec {
    /// Avery L4731REV-25: A4, 27 rows x 7 columns of 25.4 x 10 mm labels.
    pub fn avery_l4731rev_25() -> Self {
        Self {
            page: Size::a4(),
            margins: Margins::from_mm(13.6, 8.5, 13.6, 8.5),
            rows: 27,
            cols: 7,
            gap_x: Pt::from_mm(2.5),
            gap_y: Pt::ZERO,
            deadzone_left: Pt::from_mm(1.0),
            deadzone_right: Pt::ZERO,
        }
    }
}

/// Code series printed on the labels: `prefix` + zero-padded counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSpec {
    pub prefix: String,
    pub start_number: u64,
    /// 0 = no padding.
    pub leading_zeros: usize,
}

impl Default for CodeSpec {
    fn default() -> Self {
        Self {
            prefix: "ASN".to_string(),
            start_number: 1,
            leading_zeros: 5,
        }
    }
}

/// Printer drift correction: scaling anchored at the sheet box top-left
/// corner, then a translation. Positive `offset_y` moves output toward the
/// top edge of the page (printer alignment convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drift {
    pub offset_x: Pt,
    pub offset_y: Pt,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Drift {
    pub const IDENTITY: Drift = Drift {
        offset_x: Pt::ZERO,
        offset_y: Pt::ZERO,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Drift::IDENTITY
    }
}

impl Default for Drift {
    fn default() -> Self {
        Drift::IDENTITY
    }
}

/// Debug frames for verifying physical alignment. The true sheet frame is
/// always drawn at the untransformed position; the corrected frame follows
/// the drift transform. Both can be enabled at once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overlays {
    pub label_frames: bool,
    pub sheet_frame: bool,
    pub sheet_frame_corrected: bool,
}

impl Overlays {
    pub fn any(&self) -> bool {
        self.label_frames || self.sheet_frame || self.sheet_frame_corrected
    }
}

/// Everything one render run consumes. Constructed by whatever surface
/// collects the parameters (CLI, file, UI); the engine never prompts.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub sheet: SheetSpec,
    pub codes: CodeSpec,
    pub pages: usize,
    pub drift: Drift,
    pub overlays: Overlays,
    pub font_name: String,
}

impl RenderSpec {
    pub fn new(sheet: SheetSpec) -> Self {
        Self {
            sheet,
            codes: CodeSpec::default(),
            pages: 1,
            drift: Drift::IDENTITY,
            overlays: Overlays::default(),
            font_name: "Helvetica-Bold".to_string(),
        }
    }

    pub fn labels_per_page(&self) -> usize {
        self.sheet.rows as usize * self.sheet.cols as usize
    }

    pub fn total_labels(&self) -> usize {
        self.labels_per_page() * self.pages
    }
}
