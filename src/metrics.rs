#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub labels: usize,
    pub layout_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_labels: usize,
    pub total_render_ms: f64,
    pub total_bytes: usize,
}
