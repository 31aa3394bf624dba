use crate::canvas::{Canvas, Document};
use crate::config::RenderSpec;
use crate::debug::DebugLogger;
use crate::error::DiecutError;
use crate::font::FontSet;
use crate::metrics::PageMetrics;
use crate::perf::PerfLogger;
use crate::plan::{DocumentPlan, LabelRecord};
use crate::textfit::{CodeText, layout_code_text};
use crate::types::{Color, Pt};

const FRAME_LINE_WIDTH: f32 = 0.25;

/// Runs the full placement + drawing pass and returns the recorded
/// document. Fail-fast: the first geometry error aborts with nothing
/// recorded, so a broken configuration can never reach the writer.
pub(crate) fn render_document(
    spec: &RenderSpec,
    fonts: &FontSet,
    debug: Option<&DebugLogger>,
    perf: Option<&PerfLogger>,
) -> Result<(Document, Vec<PageMetrics>), DiecutError> {
    if !fonts.knows(&spec.font_name) {
        return Err(DiecutError::FontNotFound(spec.font_name.clone()));
    }

    let plan = DocumentPlan::build(spec)?;
    if plan.clamped_labels > 0 {
        if let Some(logger) = debug {
            logger.log_json(&format!(
                "{{\"type\":\"layout.known_loss\",\"code\":\"TEXT_WIDTH_CLAMPED\",\"labels\":{}}}",
                plan.clamped_labels
            ));
            logger.increment("layout.text_width_clamped", plan.clamped_labels as u64);
        }
    }

    let mut canvas = Canvas::new(spec.sheet.page);
    let mut pages = Vec::with_capacity(plan.pages);

    for page in 0..plan.pages {
        let t_page = std::time::Instant::now();
        let labels = plan.page_labels(page);

        draw_overlay_frames(&mut canvas, spec, &plan);
        for label in labels {
            draw_label(&mut canvas, spec, fonts, label);
        }
        canvas.show_page();

        let layout_ms = t_page.elapsed().as_secs_f64() * 1000.0;
        if let Some(logger) = perf {
            logger.log_span_ms("render.layout", Some(page), layout_ms);
        }
        if let Some(logger) = debug {
            logger.log_json(&format!(
                "{{\"type\":\"render.page\",\"page\":{},\"labels\":{}}}",
                page,
                labels.len()
            ));
        }
        pages.push(PageMetrics {
            page_number: page + 1,
            labels: labels.len(),
            layout_ms,
        });
    }

    Ok((canvas.finish(), pages))
}

fn draw_overlay_frames(canvas: &mut Canvas, spec: &RenderSpec, plan: &DocumentPlan) {
    if !spec.overlays.any() {
        return;
    }
    canvas.set_line_width(Pt::from_f32(FRAME_LINE_WIDTH));
    if spec.overlays.sheet_frame {
        // True sheet box: never moved by drift, the physical reference.
        canvas.set_stroke_color(Color::RED);
        canvas.stroke_rect(
            plan.sheet.x,
            plan.sheet.y,
            plan.sheet.width,
            plan.sheet.height,
        );
    }
    if spec.overlays.sheet_frame_corrected {
        canvas.set_stroke_color(Color::LIGHT_GRAY);
        canvas.stroke_rect(
            plan.sheet_corrected.x,
            plan.sheet_corrected.y,
            plan.sheet_corrected.width,
            plan.sheet_corrected.height,
        );
    }
}

fn draw_label(canvas: &mut Canvas, spec: &RenderSpec, fonts: &FontSet, label: &LabelRecord) {
    if spec.overlays.label_frames {
        canvas.set_stroke_color(Color::LIGHT_GRAY);
        canvas.set_line_width(Pt::from_f32(FRAME_LINE_WIDTH));
        canvas.stroke_rect(
            label.cell.x,
            label.cell.y,
            label.cell.width,
            label.cell.height,
        );
    }

    let qr_box = label.boxes.qr;
    canvas.draw_image(
        qr_box.x,
        qr_box.y,
        qr_box.width,
        qr_box.height,
        format!("qr:{}", label.full_code),
    );

    canvas.set_fill_color(Color::BLACK);
    let text = layout_code_text(
        fonts,
        &spec.font_name,
        &label.full_code,
        &label.prefix,
        &label.digits,
        &label.boxes.text,
        &label.cell,
    );
    match text {
        CodeText::Single { size, baseline } => {
            canvas.set_font(&spec.font_name, size);
            canvas.draw_string(label.boxes.text.x, baseline, &label.full_code);
        }
        CodeText::Stacked {
            size,
            prefix_baseline,
            digits_baseline,
            ..
        } => {
            canvas.set_font(&spec.font_name, size);
            canvas.draw_string(label.boxes.text.x, prefix_baseline, &label.prefix);
            canvas.draw_string(label.boxes.text.x, digits_baseline, &label.digits);
        }
    }
}
