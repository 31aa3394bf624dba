use crate::font::FontSet;
use crate::types::{Pt, Rect};

/// Size ladder for label codes, in points.
pub const CODE_MAX_SIZE: f32 = 9.0;
pub const CODE_MIN_SIZE: f32 = 3.5;
pub const CODE_SIZE_STEP: f32 = 0.5;
/// The prefix line of a stacked layout caps half a step lower so the full
/// code keeps visual priority on the numeric line.
pub const PREFIX_MAX_SIZE: f32 = CODE_MAX_SIZE - CODE_SIZE_STEP;

/// Baseline drop from a line's vertical center, as a fraction of the size.
const BASELINE_DIV: f32 = 2.7;

/// Largest size in `{max, max-step, ...}` not below `min` whose measured
/// width fits. Returns `min` when nothing fits; overflow at the minimum
/// size is accepted, never an error.
pub fn shrink_to_fit(
    fonts: &FontSet,
    font_name: &str,
    text: &str,
    max_width: Pt,
    max_size: Pt,
    min_size: Pt,
    step: Pt,
) -> Pt {
    let mut size = max_size;
    while size >= min_size {
        if fonts.measure_text_width(font_name, size, text) <= max_width {
            return size;
        }
        size -= step;
    }
    min_size
}

/// Resolved text layout for one label, with draw-ready baselines (top-down
/// page coordinates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodeText {
    Single {
        size: Pt,
        baseline: Pt,
    },
    /// Prefix above, numeric part below, both at the same size, stacked
    /// around the label's vertical center.
    Stacked {
        size: Pt,
        gap: Pt,
        prefix_baseline: Pt,
        digits_baseline: Pt,
    },
}

/// Two-mode policy: a single line of the full code when it fits the text
/// block, otherwise independent fits for prefix and digits at the smaller
/// of the two sizes.
pub fn layout_code_text(
    fonts: &FontSet,
    font_name: &str,
    full_code: &str,
    prefix: &str,
    digits: &str,
    text_box: &Rect,
    cell: &Rect,
) -> CodeText {
    let max_size = Pt::from_f32(CODE_MAX_SIZE);
    let min_size = Pt::from_f32(CODE_MIN_SIZE);
    let step = Pt::from_f32(CODE_SIZE_STEP);
    let center = cell.center_y();

    let size = shrink_to_fit(
        fonts,
        font_name,
        full_code,
        text_box.width,
        max_size,
        min_size,
        step,
    );
    if fonts.measure_text_width(font_name, size, full_code) <= text_box.width {
        return CodeText::Single {
            size,
            baseline: center + size / BASELINE_DIV,
        };
    }

    let prefix_size = shrink_to_fit(
        fonts,
        font_name,
        prefix,
        text_box.width,
        Pt::from_f32(PREFIX_MAX_SIZE),
        min_size,
        step,
    );
    let digits_size = shrink_to_fit(
        fonts,
        font_name,
        digits,
        text_box.width,
        max_size,
        min_size,
        step,
    );
    let size = prefix_size.min(digits_size);
    let gap = (cell.height * 0.32).min(size * 1.2);

    CodeText::Stacked {
        size,
        gap,
        prefix_baseline: center - gap / 2 + size / BASELINE_DIV,
        digits_baseline: center + gap / 1.2 + size / BASELINE_DIV,
    }
}
