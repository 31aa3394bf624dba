//! Deterministic layout and PDF rendering for die-cut QR label sheets.
//!
//! A [`SheetSpec`] describes the physical sheet (page, margins, grid, gaps,
//! dead zones); the engine validates it, derives per-label geometry with
//! optional printer drift correction, partitions each label into a QR
//! square and a code text block, and streams the result out as a PDF.
//!
//! ```no_run
//! use diecut::{DiecutBuilder, SheetSpec};
//!
//! let diecut = DiecutBuilder::new(SheetSpec::avery_l4731rev_25())
//!     .codes("ASN", 1, 5)
//!     .pages(2)
//!     .build()?;
//! diecut.render_to_path("asn_labels.pdf")?;
//! # Ok::<(), diecut::DiecutError>(())
//! ```

mod canvas;
mod config;
mod debug;
mod error;
mod flate;
mod font;
mod layout;
mod metrics;
mod pdf;
mod perf;
mod plan;
mod qr;
mod render;
mod sequence;
mod textfit;
mod types;

pub use canvas::{Canvas, Command, Document, Page};
pub use config::{CodeSpec, Drift, Overlays, RenderSpec, SheetSpec};
use debug::DebugLogger;
pub use error::DiecutError;
pub use font::FontSet;
pub use layout::{LabelBoxes, LabelPadding, SheetGrid, partition_label};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use plan::{DocumentPlan, LabelRecord};
use perf::PerfLogger;
pub use qr::{QR_RASTER_SAMPLES, encode_badge};
pub use sequence::{CodeSequence, format_code};
pub use textfit::{CodeText, layout_code_text, shrink_to_fit};
pub use types::{Color, Margins, Pt, Rect, Size};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configured engine instance. One render call owns its output handle and
/// sequence state exclusively; concurrent documents take independent
/// instances.
pub struct Diecut {
    spec: RenderSpec,
    fonts: FontSet,
    title: Option<String>,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
}

#[derive(Clone)]
pub struct DiecutBuilder {
    spec: RenderSpec,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    title: Option<String>,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl DiecutBuilder {
    pub fn new(sheet: SheetSpec) -> Self {
        Self {
            spec: RenderSpec::new(sheet),
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            title: None,
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn codes(mut self, prefix: impl Into<String>, start_number: u64, leading_zeros: usize) -> Self {
        self.spec.codes = CodeSpec {
            prefix: prefix.into(),
            start_number,
            leading_zeros,
        };
        self
    }

    pub fn pages(mut self, pages: usize) -> Self {
        self.spec.pages = pages;
        self
    }

    pub fn drift(mut self, drift: Drift) -> Self {
        self.spec.drift = drift;
        self
    }

    pub fn overlays(mut self, overlays: Overlays) -> Self {
        self.spec.overlays = overlays;
        self
    }

    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.spec.font_name = name.into();
        self
    }

    pub fn font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// JSON-lines diagnostics written here during rendering.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Diecut, DiecutError> {
        let mut fonts = FontSet::new();
        for dir in &self.font_dirs {
            fonts.register_dir(dir);
        }
        for file in &self.font_files {
            fonts.register_file(file);
        }
        let debug = match &self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let perf = match &self.perf_path {
            Some(path) => Some(PerfLogger::new(path)?),
            None => None,
        };
        Ok(Diecut {
            spec: self.spec,
            fonts,
            title: self.title,
            debug,
            perf,
        })
    }
}

impl Diecut {
    pub fn spec(&self) -> &RenderSpec {
        &self.spec
    }

    /// Placement records without producing a PDF: every label's code and
    /// corrected geometry, in document order.
    pub fn plan(&self) -> Result<DocumentPlan, DiecutError> {
        DocumentPlan::build(&self.spec)
    }

    pub fn render_to_writer<W: Write>(&self, writer: &mut W) -> Result<DocumentMetrics, DiecutError> {
        let t_total = std::time::Instant::now();
        let (document, pages) =
            render::render_document(&self.spec, &self.fonts, self.debug.as_ref(), self.perf.as_ref())?;

        let t_link = std::time::Instant::now();
        let bytes = pdf::write_document(&document, &self.fonts, self.title.as_deref(), writer)?;
        let link_ms = t_link.elapsed().as_secs_f64() * 1000.0;

        let total_render_ms = t_total.elapsed().as_secs_f64() * 1000.0;
        let total_labels = pages.iter().map(|p| p.labels).sum();
        if let Some(logger) = self.perf.as_ref() {
            logger.log_span_ms("pdf.link", None, link_ms);
            logger.log_counts(
                "pdf.link",
                None,
                &[
                    ("bytes", bytes as u64),
                    ("pages", pages.len() as u64),
                    ("labels", total_labels as u64),
                ],
            );
            logger.flush();
        }
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary("render");
            logger.flush();
        }

        Ok(DocumentMetrics {
            pages,
            total_labels,
            total_render_ms,
            total_bytes: bytes,
        })
    }

    /// Validates and records the whole document before the file is
    /// created; a failure while streaming leaves an unfinalized file the
    /// caller must not treat as valid.
    pub fn render_to_path(&self, path: impl AsRef<Path>) -> Result<DocumentMetrics, DiecutError> {
        let (document, pages) =
            render::render_document(&self.spec, &self.fonts, self.debug.as_ref(), self.perf.as_ref())?;

        let t_total = std::time::Instant::now();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = pdf::write_document(&document, &self.fonts, self.title.as_deref(), &mut writer)?;
        writer.flush()?;

        let total_labels = pages.iter().map(|p| p.labels).sum();
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary("render");
            logger.flush();
        }
        if let Some(logger) = self.perf.as_ref() {
            logger.flush();
        }
        Ok(DocumentMetrics {
            pages,
            total_labels,
            total_render_ms: t_total.elapsed().as_secs_f64() * 1000.0,
            total_bytes: bytes,
        })
    }
}
