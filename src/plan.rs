use crate::config::RenderSpec;
use crate::error::DiecutError;
use crate::layout::{LabelBoxes, LabelPadding, SheetGrid, partition_label};
use crate::sequence::CodeSequence;
use crate::types::Rect;

/// One printed label: its code, where it sits after drift correction, and
/// the QR/text partition inside it. Built once per render and consumed by
/// the drawing pass.
#[derive(Debug, Clone)]
pub struct LabelRecord {
    pub page: usize,
    pub row: u32,
    pub col: u32,
    pub full_code: String,
    pub prefix: String,
    pub digits: String,
    /// Corrected cell rectangle.
    pub cell: Rect,
    pub boxes: LabelBoxes,
}

/// Complete placement for a document, in page then row-major order.
/// Separating placement from drawing keeps sequencing and geometry
/// testable without a canvas.
#[derive(Debug, Clone)]
pub struct DocumentPlan {
    /// The fixed sheet box (true position).
    pub sheet: Rect,
    /// The sheet box under the drift transform, for the corrected overlay.
    pub sheet_corrected: Rect,
    pub labels: Vec<LabelRecord>,
    pub labels_per_page: usize,
    pub pages: usize,
    /// Labels whose text block collapsed to the 1 pt clamp.
    pub clamped_labels: usize,
}

impl DocumentPlan {
    pub fn build(spec: &RenderSpec) -> Result<Self, DiecutError> {
        let grid = SheetGrid::new(&spec.sheet)?;
        let sheet = grid.sheet();
        let drift = spec.drift;

        // Dead zones and padding track the drift scale so the corrected
        // geometry stays self-consistent.
        let pad = LabelPadding::scaled(&drift);
        let dz_left = spec.sheet.deadzone_left * drift.scale_x;
        let dz_right = spec.sheet.deadzone_right * drift.scale_x;

        let per_page = spec.labels_per_page();
        let mut labels = Vec::with_capacity(spec.total_labels());
        let mut clamped_labels = 0usize;

        // The code sequence drives the loop; position falls out of the flat
        // label index, row-major within each page.
        let codes = CodeSequence::new(&spec.codes, spec.total_labels());
        for (index, (full_code, digits)) in codes.enumerate() {
            let page = index / per_page;
            let within = index % per_page;
            let row = (within / grid.cols() as usize) as u32;
            let col = (within % grid.cols() as usize) as u32;

            let cell = drift.apply(&sheet, grid.cell(row, col));
            let boxes = partition_label(cell, dz_left, dz_right, &pad)?;
            if boxes.text_clamped {
                clamped_labels += 1;
            }
            labels.push(LabelRecord {
                page,
                row,
                col,
                full_code,
                prefix: spec.codes.prefix.clone(),
                digits,
                cell,
                boxes,
            });
        }

        Ok(Self {
            sheet,
            sheet_corrected: drift.apply(&sheet, sheet),
            labels,
            labels_per_page: spec.labels_per_page(),
            pages: spec.pages,
            clamped_labels,
        })
    }

    pub fn page_labels(&self, page: usize) -> &[LabelRecord] {
        let start = page * self.labels_per_page;
        let end = (start + self.labels_per_page).min(self.labels.len());
        &self.labels[start..end]
    }
}
