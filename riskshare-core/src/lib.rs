//! riskshare core library - risk-assessment tables to shareable HTML reports

#![deny(warnings)]

// Global invariants enforced in this crate:
// - No global mutable state; lookup tables are passed in explicitly
// - Report row order is the visible row order of the source table
// - Image work fans out in parallel and joins before rendering
// - A single bad row or image never aborts report generation
// - Identical input and timestamp yield byte-for-byte identical output

pub mod config;
pub mod control;
pub mod html;
pub mod imaging;
pub mod projection;
pub mod report;
pub mod risk;
pub mod table;

pub use config::ResolvedConfig;
pub use control::{Control, ControlType, EffectivenessTable};
pub use projection::{project, project_with_params, Projection, ProjectionParams};
pub use risk::{classify_label, classify_score, RiskCategory};
pub use table::{ImageNameMap, JsonTableSource, RowRecord, RowSource};

/// Extracted, image-normalized and annotated table
#[derive(Debug, Clone, Default)]
pub struct PreparedReport {
    /// Report columns (editor-only columns removed)
    pub headers: Vec<String>,
    pub records: Vec<RowRecord>,
}

impl PreparedReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Run extraction, image normalization and annotation
///
/// An empty source (no headers or no visible rows) yields an empty report.
pub fn prepare_report(
    source: &dyn RowSource,
    image_names: &ImageNameMap,
    config: &ResolvedConfig,
) -> PreparedReport {
    let headers = table::report_headers(source);
    let rows = table::visible_rows(source);
    if headers.is_empty() || rows.is_empty() {
        tracing::debug!(
            headers = headers.len(),
            rows = rows.len(),
            "nothing to report"
        );
        return PreparedReport::default();
    }
    tracing::debug!(rows = rows.len(), columns = headers.len(), "extracting table");

    let references: Vec<Option<imaging::ImageRef>> = rows.iter().map(|r| r.image.clone()).collect();
    let image_urls = imaging::normalize_all(&references, &config.images);

    let mut records = table::extract_records(source, &rows, &image_urls, image_names);
    report::annotate_records(&mut records, config);

    PreparedReport { headers, records }
}

/// Render a prepared report as HTML; empty string when there is no data
pub fn render_prepared(prepared: &PreparedReport, config: &ResolvedConfig, generated_at: i64) -> String {
    html::render_report(
        &prepared.headers,
        &prepared.records,
        &html::RenderOptions {
            title: &config.title,
            generated_at,
            include_projections: config.include_projections,
            columns: &config.columns,
            thresholds: &config.thresholds,
            palette: &config.palette,
        },
    )
}

/// Generate the complete shareable HTML report
///
/// Returns an empty string when the table has no visible rows.
pub fn generate_report(
    source: &dyn RowSource,
    image_names: &ImageNameMap,
    config: &ResolvedConfig,
    generated_at: i64,
) -> String {
    let prepared = prepare_report(source, image_names, config);
    render_prepared(&prepared, config, generated_at)
}
