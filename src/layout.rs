use crate::config::{Drift, SheetSpec};
use crate::error::DiecutError;
use crate::types::{Pt, Rect};

/// Validated sheet geometry: the fixed sheet box plus the uniform cell size.
/// Cell dimensions are derived once and reused for every cell; there is no
/// per-cell remainder distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGrid {
    sheet: Rect,
    rows: u32,
    cols: u32,
    gap_x: Pt,
    gap_y: Pt,
    cell_width: Pt,
    cell_height: Pt,
}

impl SheetGrid {
    /// Checks the configuration is physically realizable and derives the
    /// grid. Pure function of the spec; must pass before any rendering.
    pub fn new(spec: &SheetSpec) -> Result<Self, DiecutError> {
        if spec.rows < 1 || spec.cols < 1 {
            return Err(DiecutError::InvalidGeometry(
                "rows and columns must both be at least 1".to_string(),
            ));
        }
        let lengths = [
            spec.margins.top,
            spec.margins.right,
            spec.margins.bottom,
            spec.margins.left,
            spec.gap_x,
            spec.gap_y,
            spec.deadzone_left,
            spec.deadzone_right,
        ];
        if lengths.iter().any(|len| *len < Pt::ZERO) {
            return Err(DiecutError::InvalidGeometry(
                "margins, gaps and dead zones must not be negative".to_string(),
            ));
        }

        let sheet_w = spec.page.width - spec.margins.left - spec.margins.right;
        let sheet_h = spec.page.height - spec.margins.top - spec.margins.bottom;
        if sheet_w <= Pt::ZERO || sheet_h <= Pt::ZERO {
            return Err(DiecutError::InvalidGeometry(
                "margins are too large: sheet box would be <= 0".to_string(),
            ));
        }

        if spec.cols > 1 && sheet_w - spec.gap_x * (spec.cols as i32 - 1) <= Pt::ZERO {
            return Err(DiecutError::InvalidGeometry(
                "horizontal gap too large: no width left for labels".to_string(),
            ));
        }
        if spec.rows > 1 && sheet_h - spec.gap_y * (spec.rows as i32 - 1) <= Pt::ZERO {
            return Err(DiecutError::InvalidGeometry(
                "vertical gap too large: no height left for labels".to_string(),
            ));
        }

        let cell_width = (sheet_w - spec.gap_x * (spec.cols as i32 - 1)) / spec.cols as i32;
        let cell_height = (sheet_h - spec.gap_y * (spec.rows as i32 - 1)) / spec.rows as i32;
        if cell_width <= Pt::ZERO || cell_height <= Pt::ZERO {
            return Err(DiecutError::InvalidGeometry(
                "computed label size is <= 0 (check rows/cols/gaps/margins)".to_string(),
            ));
        }

        if spec.deadzone_left + spec.deadzone_right >= cell_width {
            return Err(DiecutError::InvalidGeometry(
                "dead zones too large: content width would be <= 0".to_string(),
            ));
        }

        Ok(Self {
            sheet: Rect {
                x: spec.margins.left,
                y: spec.margins.top,
                width: sheet_w,
                height: sheet_h,
            },
            rows: spec.rows,
            cols: spec.cols,
            gap_x: spec.gap_x,
            gap_y: spec.gap_y,
            cell_width,
            cell_height,
        })
    }

    /// The fixed sheet box. Never affected by drift or dead zones.
    pub fn sheet(&self) -> Rect {
        self.sheet
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn cell_width(&self) -> Pt {
        self.cell_width
    }

    pub fn cell_height(&self) -> Pt {
        self.cell_height
    }

    /// Nominal cell rectangle. Row 0 sits against the top margin.
    pub fn cell(&self, row: u32, col: u32) -> Rect {
        debug_assert!(row < self.rows && col < self.cols);
        Rect {
            x: self.sheet.x + (self.cell_width + self.gap_x) * col as i32,
            y: self.sheet.y + (self.cell_height + self.gap_y) * row as i32,
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}

impl Drift {
    /// Maps a nominal rectangle to its corrected position: scale anchored at
    /// the sheet box top-left, then offset. A rectangle whose corner
    /// coincides with the anchor is moved only by the offset.
    pub fn apply(&self, sheet: &Rect, rect: Rect) -> Rect {
        Rect {
            x: sheet.x + (rect.x - sheet.x) * self.scale_x + self.offset_x,
            y: sheet.y + (rect.y - sheet.y) * self.scale_y - self.offset_y,
            width: rect.width * self.scale_x,
            height: rect.height * self.scale_y,
        }
    }
}

/// Fixed padding constants inside a label, pre-scaled per axis so drift
/// correction tracks every internal measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPadding {
    /// Padding above and below the QR square.
    pub qr_vpad: Pt,
    /// Gap between the QR square and the text block.
    pub qr_text_gap: Pt,
    pub text_right_pad: Pt,
    /// Width the text block must keep when the QR is maximized.
    pub min_text_width: Pt,
}

impl LabelPadding {
    pub fn base() -> Self {
        Self {
            qr_vpad: Pt::from_mm(0.5),
            qr_text_gap: Pt::from_mm(0.6),
            text_right_pad: Pt::from_mm(0.6),
            min_text_width: Pt::from_mm(6.0),
        }
    }

    pub fn scaled(drift: &Drift) -> Self {
        let base = Self::base();
        Self {
            qr_vpad: base.qr_vpad * drift.scale_y,
            qr_text_gap: base.qr_text_gap * drift.scale_x,
            text_right_pad: base.text_right_pad * drift.scale_x,
            min_text_width: base.min_text_width * drift.scale_x,
        }
    }
}

/// Space partition of one corrected label: content box minus dead zones,
/// the largest QR square both constraints allow, and the text block to its
/// right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBoxes {
    pub content: Rect,
    pub qr: Rect,
    pub text: Rect,
    /// The text block collapsed below 1 pt and was clamped. Kept lenient on
    /// purpose; the renderer counts occurrences on the debug log.
    pub text_clamped: bool,
}

/// Partitions a corrected cell. Dead zones are expected pre-scaled by the
/// horizontal drift scale, like the padding set.
pub fn partition_label(
    cell: Rect,
    deadzone_left: Pt,
    deadzone_right: Pt,
    pad: &LabelPadding,
) -> Result<LabelBoxes, DiecutError> {
    let content_x = cell.x + deadzone_left;
    let content_w = cell.width - deadzone_left - deadzone_right;
    if content_w <= Pt::ZERO {
        return Err(DiecutError::ContentTooNarrow);
    }

    let qr_max_h = cell.height - pad.qr_vpad * 2;
    if qr_max_h <= Pt::ZERO {
        return Err(DiecutError::LabelTooShort);
    }

    let qr_max_w = content_w - pad.qr_text_gap - pad.min_text_width;
    if qr_max_w <= Pt::ZERO {
        return Err(DiecutError::LabelTooNarrow);
    }

    let qr_size = qr_max_h.min(qr_max_w);
    // Left-aligned, seated qr_vpad above the cell bottom.
    let qr = Rect {
        x: content_x,
        y: cell.bottom() - pad.qr_vpad - qr_size,
        width: qr_size,
        height: qr_size,
    };

    let text_x = qr.right() + pad.qr_text_gap;
    let text_right = content_x + content_w - pad.text_right_pad;
    let mut text_w = text_right - text_x;
    let text_clamped = text_w < Pt::from_f32(1.0);
    if text_clamped {
        text_w = Pt::from_f32(1.0);
    }

    Ok(LabelBoxes {
        content: Rect {
            x: content_x,
            y: cell.y,
            width: content_w,
            height: cell.height,
        },
        qr,
        text: Rect {
            x: text_x,
            y: cell.y,
            width: text_w,
            height: cell.height,
        },
        text_clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Margins, Size};

    fn spec_mm(
        page: (f32, f32),
        margins: (f32, f32, f32, f32),
        rows: u32,
        cols: u32,
        gaps: (f32, f32),
        deadzones: (f32, f32),
    ) -> SheetSpec {
        SheetSpec {
            page: Size::from_mm(page.0, page.1),
            margins: Margins::from_mm(margins.0, margins.1, margins.2, margins.3),
            rows,
            cols,
            gap_x: Pt::from_mm(gaps.0),
            gap_y: Pt::from_mm(gaps.1),
            deadzone_left: Pt::from_mm(deadzones.0),
            deadzone_right: Pt::from_mm(deadzones.1),
        }
    }

    #[test]
    fn cells_tile_the_sheet_exactly() {
        let spec = SheetSpec::avery_l4731rev_25();
        let grid = SheetGrid::new(&spec).unwrap();

        let covered_w =
            grid.cell_width() * grid.cols() as i32 + spec.gap_x * (grid.cols() as i32 - 1);
        let covered_h =
            grid.cell_height() * grid.rows() as i32 + spec.gap_y * (grid.rows() as i32 - 1);

        // Millipoint division may leave up to half a millipoint per cell.
        let eps = Pt::from_milli_i64(grid.cols() as i64);
        assert!((covered_w - grid.sheet().width).abs() <= eps);
        let eps = Pt::from_milli_i64(grid.rows() as i64);
        assert!((covered_h - grid.sheet().height).abs() <= eps);
    }

    #[test]
    fn row_zero_sits_against_the_top_margin() {
        let spec = SheetSpec::avery_l4731rev_25();
        let grid = SheetGrid::new(&spec).unwrap();
        let first = grid.cell(0, 0);
        assert_eq!(first.x, spec.margins.left);
        assert_eq!(first.y, spec.margins.top);

        let below = grid.cell(1, 0);
        assert_eq!(below.y, first.y + grid.cell_height() + spec.gap_y);
    }

    #[test]
    fn rejects_margins_larger_than_the_page() {
        let spec = spec_mm((100.0, 100.0), (60.0, 10.0, 60.0, 10.0), 2, 2, (0.0, 0.0), (0.0, 0.0));
        match SheetGrid::new(&spec) {
            Err(DiecutError::InvalidGeometry(msg)) => assert!(msg.contains("margins")),
            other => panic!("expected InvalidGeometry, got {:?}", other),
        }
    }

    #[test]
    fn rejects_horizontal_gap_that_eats_the_sheet() {
        // 10 columns, 9 gaps of 25mm on a ~190mm sheet: nothing left.
        let spec = spec_mm((210.0, 297.0), (10.0, 10.0, 10.0, 10.0), 3, 10, (25.0, 0.0), (0.0, 0.0));
        match SheetGrid::new(&spec) {
            Err(DiecutError::InvalidGeometry(msg)) => assert!(msg.contains("gap")),
            other => panic!("expected InvalidGeometry, got {:?}", other),
        }
    }

    #[test]
    fn rejects_dead_zones_wider_than_a_label() {
        let spec = spec_mm((210.0, 297.0), (10.0, 10.0, 10.0, 10.0), 10, 7, (2.0, 0.0), (20.0, 10.0));
        match SheetGrid::new(&spec) {
            Err(DiecutError::InvalidGeometry(msg)) => assert!(msg.contains("dead zones")),
            other => panic!("expected InvalidGeometry, got {:?}", other),
        }
    }

    #[test]
    fn rejects_negative_lengths() {
        let spec = spec_mm((210.0, 297.0), (10.0, 10.0, 10.0, 10.0), 3, 3, (-1.0, 0.0), (0.0, 0.0));
        match SheetGrid::new(&spec) {
            Err(DiecutError::InvalidGeometry(msg)) => assert!(msg.contains("negative")),
            other => panic!("expected InvalidGeometry, got {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_rows() {
        let spec = spec_mm((210.0, 297.0), (10.0, 10.0, 10.0, 10.0), 0, 7, (0.0, 0.0), (0.0, 0.0));
        assert!(matches!(
            SheetGrid::new(&spec),
            Err(DiecutError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn identity_drift_leaves_cells_untouched() {
        let grid = SheetGrid::new(&SheetSpec::avery_l4731rev_25()).unwrap();
        let sheet = grid.sheet();
        for (row, col) in [(0, 0), (3, 2), (26, 6)] {
            let cell = grid.cell(row, col);
            assert_eq!(Drift::IDENTITY.apply(&sheet, cell), cell);
        }
    }

    #[test]
    fn drift_scaling_anchors_at_the_sheet_top_left() {
        let grid = SheetGrid::new(&SheetSpec::avery_l4731rev_25()).unwrap();
        let sheet = grid.sheet();
        let drift = Drift {
            offset_x: Pt::from_mm(1.0),
            offset_y: Pt::from_mm(2.0),
            scale_x: 1.05,
            scale_y: 0.95,
        };

        // The corner cell keeps its position modulo the offset: scale must
        // not move it.
        let corner = grid.cell(0, 0);
        let corrected = drift.apply(&sheet, corner);
        assert_eq!(corrected.x, corner.x + drift.offset_x);
        assert_eq!(corrected.y, corner.y - drift.offset_y);

        // A far cell moves proportionally to its distance from the anchor.
        let far = grid.cell(10, 3);
        let corrected = drift.apply(&sheet, far);
        let expected_x = sheet.x + (far.x - sheet.x) * 1.05 + drift.offset_x;
        let expected_y = sheet.y + (far.y - sheet.y) * 0.95 - drift.offset_y;
        assert!((corrected.x - expected_x).abs() <= Pt::from_milli_i64(1));
        assert!((corrected.y - expected_y).abs() <= Pt::from_milli_i64(1));
        assert!((corrected.width - far.width * 1.05).abs() <= Pt::from_milli_i64(1));
    }

    #[test]
    fn qr_square_honors_both_constraints() {
        let cell = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_mm(25.4),
            height: Pt::from_mm(10.0),
        };
        let pad = LabelPadding::base();
        let boxes = partition_label(cell, Pt::from_mm(1.0), Pt::ZERO, &pad).unwrap();

        // Height-bound here: 10mm - 2*0.5mm = 9mm beats the width bound.
        let expected = (cell.height - pad.qr_vpad * 2)
            .min(cell.width - Pt::from_mm(1.0) - pad.qr_text_gap - pad.min_text_width);
        assert_eq!(boxes.qr.width, expected);
        assert_eq!(boxes.qr.width, boxes.qr.height);

        // Left-aligned in the content box, seated on the bottom padding.
        assert_eq!(boxes.qr.x, boxes.content.x);
        assert_eq!(boxes.qr.bottom(), cell.bottom() - pad.qr_vpad);

        // Text block starts after the gap and keeps the right padding.
        assert_eq!(boxes.text.x, boxes.qr.right() + pad.qr_text_gap);
        assert_eq!(
            boxes.text.right(),
            boxes.content.right() - pad.text_right_pad
        );
        assert!(!boxes.text_clamped);
    }

    #[test]
    fn short_label_fails_before_narrow_label() {
        let cell = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_mm(25.0),
            height: Pt::from_mm(0.8),
        };
        assert!(matches!(
            partition_label(cell, Pt::ZERO, Pt::ZERO, &LabelPadding::base()),
            Err(DiecutError::LabelTooShort)
        ));
    }

    #[test]
    fn narrow_label_cannot_fit_qr_and_text() {
        let cell = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_mm(6.0),
            height: Pt::from_mm(10.0),
        };
        assert!(matches!(
            partition_label(cell, Pt::ZERO, Pt::ZERO, &LabelPadding::base()),
            Err(DiecutError::LabelTooNarrow)
        ));
    }

    #[test]
    fn scaled_dead_zones_can_exhaust_the_content_box() {
        let cell = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_mm(20.0),
            height: Pt::from_mm(10.0),
        };
        assert!(matches!(
            partition_label(cell, Pt::from_mm(15.0), Pt::from_mm(5.0), &LabelPadding::base()),
            Err(DiecutError::ContentTooNarrow)
        ));
    }

    #[test]
    fn degenerate_text_width_is_clamped_not_fatal() {
        // Wide enough for the QR bound to win, but with the text squeezed to
        // under a point by a huge minimum: min(h, w-gap-min) keeps the text
        // region between min_text_width and the right pad.
        let cell = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_mm(8.0),
            height: Pt::from_mm(50.0),
        };
        let mut pad = LabelPadding::base();
        pad.min_text_width = Pt::from_mm(0.2);
        let boxes = partition_label(cell, Pt::ZERO, Pt::ZERO, &pad).unwrap();
        assert!(boxes.text_clamped);
        assert_eq!(boxes.text.width, Pt::from_f32(1.0));
    }

    #[test]
    fn padding_scales_with_drift() {
        let drift = Drift {
            offset_x: Pt::ZERO,
            offset_y: Pt::ZERO,
            scale_x: 2.0,
            scale_y: 0.5,
        };
        let scaled = LabelPadding::scaled(&drift);
        let base = LabelPadding::base();
        assert_eq!(scaled.qr_vpad, base.qr_vpad * 0.5);
        assert_eq!(scaled.qr_text_gap, base.qr_text_gap * 2.0);
        assert_eq!(scaled.min_text_width, base.min_text_width * 2.0);
    }
}
