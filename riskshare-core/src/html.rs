//! HTML report generation
//!
//! Generates one self-contained HTML document: table data embedded as JSON,
//! inline CSS and JavaScript, with only Tailwind and Google Charts loaded from
//! their CDNs. The same renderer serves plain and projection reports.

use crate::config::ColumnNames;
use crate::report::{category_distribution, projected_distribution};
use crate::risk::{classify_label, CategoryPalette, CategoryThresholds, RiskCategory};
use crate::table::{RowRecord, PICTURE_COLUMN};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rendering inputs that are not part of the table itself
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    pub title: &'a str,
    /// Unix timestamp shown as "Generated on"
    pub generated_at: i64,
    pub include_projections: bool,
    pub columns: &'a ColumnNames,
    pub thresholds: &'a CategoryThresholds,
    pub palette: &'a CategoryPalette,
}

/// Data handed to the inline script
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportPayload<'a> {
    table_data: &'a [RowRecord],
    display_fields: Vec<&'a str>,
    categories: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projected_categories: Option<Vec<&'static str>>,
    category_order: Vec<&'static str>,
    category_labels: BTreeMap<&'static str, &'static str>,
    colors: BTreeMap<&'static str, &'a str>,
    category_column: &'a str,
    title_column: &'a str,
}

/// Render the report; returns an empty string when there is nothing to report
pub fn render_report(headers: &[String], records: &[RowRecord], options: &RenderOptions) -> String {
    if records.is_empty() {
        return String::new();
    }

    let evolution = if options.include_projections {
        render_evolution_section(records, options)
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <script type="text/javascript" src="https://www.gstatic.com/charts/loader.js"></script>
    <style>{css}</style>
</head>
<body class="bg-slate-100 min-h-screen">
    <div class="max-w-[95%] mx-auto py-8">
        <div class="bg-white rounded-xl shadow-lg overflow-hidden">
            {header}
            {distribution}
            {evolution}
            {table}
            {footer}
        </div>
    </div>
    {modal}
    <script>window.__rsReport = {payload};</script>
    <script>{js}</script>
</body>
</html>"#,
        title = html_escape(options.title),
        css = inline_css(),
        header = render_header(options.title, options.generated_at),
        distribution = render_distribution_section(records),
        evolution = evolution,
        table = render_table(headers, records, options),
        footer = render_footer(records.len()),
        modal = render_modal(records.len()),
        payload = render_payload(headers, records, options),
        js = inline_javascript(),
    )
}

/// Serialize the script payload, escaped so it cannot close its `<script>`
fn render_payload(headers: &[String], records: &[RowRecord], options: &RenderOptions) -> String {
    let projected_categories = options.include_projections.then(|| {
        records
            .iter()
            .map(|r| {
                r.projection
                    .map(|p| p.projected_category(options.thresholds).key())
                    .unwrap_or(RiskCategory::Unknown.key())
            })
            .collect()
    });

    let all_categories = RiskCategory::ORDERED
        .into_iter()
        .chain(std::iter::once(RiskCategory::Unknown));

    let payload = ReportPayload {
        table_data: records,
        display_fields: headers
            .iter()
            .map(String::as_str)
            .filter(|h| *h != PICTURE_COLUMN)
            .collect(),
        categories: records.iter().map(|r| r.category.key()).collect(),
        projected_categories,
        category_order: RiskCategory::ORDERED.iter().map(|c| c.key()).collect(),
        category_labels: all_categories.clone().map(|c| (c.key(), c.as_str())).collect(),
        colors: all_categories
            .map(|c| (c.key(), options.palette.color(c)))
            .collect(),
        category_column: &options.columns.category,
        title_column: &options.columns.title,
    };

    serde_json::to_string(&payload)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

/// Render header with title, timestamp and print button
fn render_header(title: &str, generated_at: i64) -> String {
    format!(
        r#"<header class="bg-gradient-to-r from-indigo-600 to-indigo-800 text-white p-6">
    <div class="flex justify-between items-center">
        <div>
            <h1 class="text-2xl font-bold">{title}</h1>
            <p class="text-indigo-200 mt-1">Generated on {date}</p>
        </div>
        <button onclick="window.print()" class="bg-white text-indigo-600 px-4 py-2 rounded-lg font-semibold hover:bg-indigo-50 transition no-print">Print</button>
    </div>
</header>"#,
        title = html_escape(title),
        date = format_generated_at(generated_at),
    )
}

/// Render the category distribution chart container with a static legend
fn render_distribution_section(records: &[RowRecord]) -> String {
    let legend: String = category_distribution(records)
        .into_iter()
        .map(|(category, count)| {
            format!(
                r#"<span class="legend-item {class}">{label}: {count}</span>"#,
                class = category.css_class(),
                label = category.as_str(),
                count = count,
            )
        })
        .collect();

    format!(
        r#"<section class="p-8 border-b border-gray-200 no-print bg-gradient-to-br from-slate-50 to-blue-50" id="distribution">
    <h2 class="text-xl font-bold text-gray-800 mb-4">Risk Category Distribution</h2>
    <div class="legend mb-4">{legend}</div>
    <div id="pieChart" class="chart-box"></div>
</section>"#,
        legend = legend,
    )
}

/// Render the current-vs-projected section (projection reports only)
fn render_evolution_section(records: &[RowRecord], options: &RenderOptions) -> String {
    let projected = projected_distribution(records, options.thresholds);
    let total_current: u64 = records
        .iter()
        .filter_map(|r| r.projection.as_ref())
        .map(|p| p.current_score as u64)
        .sum();
    let total_projected: u64 = records
        .iter()
        .filter_map(|r| r.projection.as_ref())
        .map(|p| p.projected_score as u64)
        .sum();
    let overall = if total_current > 0 {
        ((100.0 * (total_current - total_projected) as f64) / total_current as f64).round() as u64
    } else {
        0
    };
    let improved = records
        .iter()
        .filter_map(|r| r.projection.as_ref())
        .filter(|p| p.projected_score < p.current_score)
        .count();
    let critical_after = projected
        .iter()
        .find(|(c, _)| *c == RiskCategory::Critical)
        .map(|(_, n)| *n)
        .unwrap_or(0);

    format!(
        r#"<section class="p-8 border-b border-gray-200 no-print" id="evolution">
    <h2 class="text-xl font-bold text-gray-800 mb-4">Projected Risk After Controls</h2>
    <div class="summary-cards">
        <div class="card"><div class="card-label">Overall reduction</div><div class="card-value">{overall}%</div></div>
        <div class="card"><div class="card-label">Tasks improved</div><div class="card-value">{improved} / {total}</div></div>
        <div class="card"><div class="card-label">Critical after controls</div><div class="card-value">{critical_after}</div></div>
    </div>
    <div id="evolutionChart" class="chart-box"></div>
</section>"#,
        overall = overall,
        improved = improved,
        total = records.len(),
        critical_after = critical_after,
    )
}

/// Render the task table
fn render_table(headers: &[String], records: &[RowRecord], options: &RenderOptions) -> String {
    let projection_headers = if options.include_projections {
        "<th>Projected Score</th><th>Reduction</th>"
    } else {
        ""
    };
    let header_cells: String = headers
        .iter()
        .map(|h| format!("<th>{}</th>", html_escape(h)))
        .collect();

    let rows: String = records
        .iter()
        .enumerate()
        .map(|(idx, record)| render_row(idx, record, headers, options))
        .collect();

    format!(
        r#"<section class="p-6 overflow-x-auto" id="tasks">
    <div class="mb-5 no-print flex items-center gap-3">
        <button onclick="__rsFilterCategory('ALL')" class="bg-gradient-to-r from-indigo-600 to-indigo-700 text-white px-6 py-2.5 rounded-lg font-semibold shadow-md">Show All Tasks</button>
        <span class="text-sm text-gray-600 italic">Click on the chart to filter by risk category</span>
    </div>
    <table id="task-table">
        <thead>
            <tr>{header_cells}{projection_headers}</tr>
        </thead>
        <tbody id="tableBody">
{rows}
        </tbody>
    </table>
</section>"#,
        header_cells = header_cells,
        projection_headers = projection_headers,
        rows = rows,
    )
}

fn render_row(idx: usize, record: &RowRecord, headers: &[String], options: &RenderOptions) -> String {
    let cells: String = headers
        .iter()
        .map(|header| {
            if header == PICTURE_COLUMN {
                return match &record.image_url {
                    Some(url) => format!(
                        r#"<td><img src="{src}" class="table-img" onclick="__rsOpenModal({idx})" alt="{alt}"></td>"#,
                        src = html_escape(url),
                        idx = idx,
                        alt = html_escape(record.image_name.as_deref().unwrap_or("Task image")),
                    ),
                    None => r#"<td class="text-center text-slate-400">—</td>"#.to_string(),
                };
            }
            let value = record.get(header).filter(|v| !v.is_empty());
            if *header == options.columns.category {
                let class = value.map(classify_label).unwrap_or(record.category).css_class();
                return format!(
                    r#"<td><span class="px-2 py-1 rounded text-xs font-semibold {class}">{value}</span></td>"#,
                    class = class,
                    value = value.map(html_escape).unwrap_or_else(|| "—".to_string()),
                );
            }
            format!(
                "<td>{}</td>",
                value.map(html_escape).unwrap_or_else(|| "—".to_string())
            )
        })
        .collect();

    let projection_cells = if options.include_projections {
        match &record.projection {
            Some(p) => format!(
                r#"<td><span class="px-2 py-1 rounded text-xs font-semibold {class}">{score}</span></td><td>{reduction}%</td>"#,
                class = p.projected_category(options.thresholds).css_class(),
                score = p.projected_score,
                reduction = p.reduction_percent,
            ),
            None => "<td>—</td><td>—</td>".to_string(),
        }
    } else {
        String::new()
    };

    format!(
        "            <tr data-index=\"{idx}\" data-category=\"{category}\">{cells}{projection_cells}</tr>\n",
        idx = idx,
        category = record.category.key(),
        cells = cells,
        projection_cells = projection_cells,
    )
}

/// Render footer
fn render_footer(total: usize) -> String {
    format!(
        r#"<footer class="p-4 bg-slate-50 border-t border-slate-200 text-center text-sm text-slate-500 no-print">
    <p>Click on any image to view task details • Total Tasks: <strong>{total}</strong></p>
</footer>"#,
        total = total,
    )
}

/// Render the task detail modal shell; the script fills it in
fn render_modal(total: usize) -> String {
    format!(
        r#"<div id="taskModal" class="modal-overlay" onclick="if (event.target === this) __rsCloseModal()">
    <div class="modal-content">
        <div class="modal-header">
            <h2 id="modalTitle" class="text-lg font-bold text-slate-800">Task Details</h2>
            <button class="close-btn" onclick="__rsCloseModal()">×</button>
        </div>
        <div class="modal-body">
            <div class="modal-image"><img id="modalImage" src="" alt="Task image"></div>
            <div class="modal-details" id="modalDetails"></div>
        </div>
        <div class="p-4 border-t border-slate-200 flex justify-between items-center">
            <button id="prevBtn" onclick="__rsNavigate(-1)" class="nav-btn bg-slate-200 text-slate-700">← Previous</button>
            <span id="taskCounter" class="text-slate-600 font-medium">1 / {total}</span>
            <button id="nextBtn" onclick="__rsNavigate(1)" class="nav-btn bg-indigo-600 text-white">Next →</button>
        </div>
    </div>
</div>"#,
        total = total,
    )
}

/// Inline CSS styles
fn inline_css() -> &'static str {
    r#"
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; }

/* Category badges */
.risk-critical { background-color: #fee2e2; color: #991b1b; font-weight: 600; }
.risk-high { background-color: #ffedd5; color: #9a3412; font-weight: 600; }
.risk-medium { background-color: #fef9c3; color: #854d0e; font-weight: 600; }
.risk-low { background-color: #dcfce7; color: #166534; font-weight: 600; }
.risk-critical, .risk-high, .risk-medium, .risk-low {
    padding: 6px 12px;
    border-radius: 6px;
    display: inline-block;
    box-shadow: 0 1px 2px 0 rgba(0, 0, 0, 0.05);
}

/* Charts */
.chart-box { width: 100%; height: 450px; border-radius: 12px; background: white; padding: 20px; box-shadow: 0 4px 6px -1px rgba(0, 0, 0, 0.1); }
.legend { display: flex; gap: 8px; flex-wrap: wrap; }
.legend-item { font-size: 12px; }
.summary-cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; margin-bottom: 1.5rem; }
.card { background: #f8fafc; border: 1px solid #e2e8f0; border-radius: 8px; padding: 1rem; }
.card-label { font-size: 11px; text-transform: uppercase; color: #64748b; font-weight: 600; letter-spacing: 0.5px; }
.card-value { font-size: 1.75rem; font-weight: 700; color: #1e293b; }

/* Table */
table { border-collapse: collapse; width: 100%; box-shadow: 0 1px 3px 0 rgba(0, 0, 0, 0.1); }
th, td { border: 1px solid #e2e8f0; padding: 10px 14px; text-align: left; font-size: 13px; }
th { background: linear-gradient(to bottom, #f8fafc, #f1f5f9); font-weight: 700; position: sticky; top: 0; z-index: 10; text-transform: uppercase; font-size: 11px; letter-spacing: 0.5px; color: #475569; border-bottom: 2px solid #cbd5e1; }
tr:hover { background: #f8fafc; }
tbody tr { transition: background-color 0.15s ease; }
.table-img { width: 60px; height: 60px; object-fit: cover; border-radius: 8px; cursor: pointer; transition: transform 0.2s; }
.table-img:hover { transform: scale(1.1); box-shadow: 0 4px 12px rgba(0,0,0,0.15); }

/* Modal */
.modal-overlay { display: none; position: fixed; inset: 0; background: rgba(0,0,0,0.8); z-index: 1000; align-items: center; justify-content: center; padding: 20px; }
.modal-overlay.active { display: flex; }
.modal-content { background: white; border-radius: 16px; max-width: 1100px; width: 100%; max-height: 90vh; overflow: hidden; display: flex; flex-direction: column; }
.modal-header { padding: 16px 20px; border-bottom: 1px solid #e2e8f0; display: flex; justify-content: space-between; align-items: center; }
.modal-body { display: flex; flex: 1; overflow: hidden; }
.modal-image { width: 50%; padding: 20px; display: flex; align-items: center; justify-content: center; background: #f8fafc; }
.modal-image img { max-width: 100%; max-height: 60vh; object-fit: contain; border-radius: 8px; }
.modal-details { width: 50%; padding: 20px; overflow-y: auto; }
.detail-row { margin-bottom: 12px; }
.detail-label { font-size: 11px; text-transform: uppercase; color: #64748b; font-weight: 600; letter-spacing: 0.5px; }
.detail-value { font-size: 14px; color: #1e293b; padding: 8px 12px; background: #f8fafc; border-radius: 6px; margin-top: 4px; }
.close-btn { width: 32px; height: 32px; border-radius: 50%; border: none; background: #f1f5f9; cursor: pointer; font-size: 18px; display: flex; align-items: center; justify-content: center; }
.close-btn:hover { background: #e2e8f0; }
.nav-btn { padding: 8px 16px; border-radius: 8px; font-weight: 600; cursor: pointer; transition: all 0.2s; border: none; }
.nav-btn:disabled { opacity: 0.5; cursor: not-allowed; }

@media print {
    .modal-overlay { display: none !important; }
    .no-print { display: none !important; }
}
"#
}

/// Inline JavaScript: charts, category filter, modal navigation
fn inline_javascript() -> &'static str {
    r#"
(function() {
    const report = window.__rsReport;
    const rows = report.tableData;
    let visible = rows.map(function(_, i) { return i; });
    let currentIndex = 0;

    function escapeHtml(value) {
        return String(value)
            .replace(/&/g, '&amp;')
            .replace(/</g, '&lt;')
            .replace(/>/g, '&gt;')
            .replace(/"/g, '&quot;')
            .replace(/'/g, '&#39;');
    }

    function countBy(keys, indices) {
        const counts = {};
        indices.forEach(function(i) { counts[keys[i]] = (counts[keys[i]] || 0) + 1; });
        return counts;
    }

    function drawDistribution() {
        const el = document.getElementById('pieChart');
        if (!el) return;
        const counts = countBy(report.categories, visible);
        const order = report.categoryOrder.concat(['UNKNOWN']);
        const chartRows = [['Risk Category', 'Count']];
        const keys = [];
        const colors = [];
        order.forEach(function(key) {
            if (counts[key]) {
                chartRows.push([report.categoryLabels[key], counts[key]]);
                keys.push(key);
                colors.push(report.colors[key]);
            }
        });

        const data = google.visualization.arrayToDataTable(chartRows);
        const chart = new google.visualization.PieChart(el);
        google.visualization.events.addListener(chart, 'select', function() {
            const selection = chart.getSelection();
            if (selection.length > 0 && selection[0].row != null) {
                window.__rsFilterCategory(keys[selection[0].row]);
            }
        });
        chart.draw(data, {
            title: 'Risk Category Distribution (Click to filter)',
            titleTextStyle: { fontSize: 16, bold: true, color: '#334155' },
            pieHole: 0.4,
            colors: colors,
            chartArea: { width: '90%', height: '85%' },
            legend: { position: 'right', textStyle: { fontSize: 14, bold: true }, alignment: 'center' },
            pieSliceText: 'value',
            pieSliceTextStyle: { fontSize: 15, bold: true, color: '#fff' },
            backgroundColor: 'transparent',
            sliceVisibilityThreshold: 0,
            animation: { startup: true, duration: 800, easing: 'out' }
        });
    }

    function drawEvolution() {
        const el = document.getElementById('evolutionChart');
        if (!el || !report.projectedCategories) return;
        const before = countBy(report.categories, visible);
        const after = countBy(report.projectedCategories, visible);
        const chartRows = [['Risk Category', 'Current', 'Projected']];
        report.categoryOrder.forEach(function(key) {
            chartRows.push([report.categoryLabels[key], before[key] || 0, after[key] || 0]);
        });
        const chart = new google.visualization.ColumnChart(el);
        chart.draw(google.visualization.arrayToDataTable(chartRows), {
            title: 'Current vs Projected Risk Categories',
            titleTextStyle: { fontSize: 16, bold: true, color: '#334155' },
            colors: ['#6366f1', '#10b981'],
            chartArea: { width: '85%', height: '75%' },
            legend: { position: 'top' },
            vAxis: { minValue: 0, format: '0' },
            backgroundColor: 'transparent'
        });
    }

    function drawCharts() {
        drawDistribution();
        drawEvolution();
    }

    window.__rsFilterCategory = function(key) {
        const trs = document.querySelectorAll('#tableBody tr');
        visible = [];
        trs.forEach(function(tr) {
            const idx = parseInt(tr.dataset.index, 10);
            const show = key === 'ALL' || tr.dataset.category === key;
            tr.style.display = show ? '' : 'none';
            if (show) visible.push(idx);
        });
        if (window.google && google.visualization) drawCharts();
    };

    function showTask(index) {
        const data = rows[index];
        if (!data) return;
        const title = data.values[report.titleColumn] || 'Untitled';
        document.getElementById('modalTitle').textContent = 'Task ' + (index + 1) + ': ' + title;

        const img = document.getElementById('modalImage');
        if (data.imageUrl) {
            img.src = data.imageUrl;
            img.style.display = 'block';
        } else {
            img.style.display = 'none';
        }

        let html = '';
        report.displayFields.forEach(function(field) {
            const value = data.values[field] || '—';
            const valueClass = field === report.categoryColumn
                ? 'risk-' + report.categories[index].toLowerCase()
                : '';
            html += '<div class="detail-row">' +
                '<div class="detail-label">' + escapeHtml(field) + '</div>' +
                '<div class="detail-value ' + valueClass + '">' + escapeHtml(value) + '</div>' +
                '</div>';
        });
        if (data.projection) {
            html += '<div class="detail-row">' +
                '<div class="detail-label">Projected Score</div>' +
                '<div class="detail-value risk-' + report.projectedCategories[index].toLowerCase() + '">' +
                data.projection.projectedScore + ' (' + data.projection.reductionPercent + '% reduction)</div>' +
                '</div>';
        }
        if (data.controls && data.controls.length) {
            const items = data.controls.map(function(c) {
                return '<li><strong>' + escapeHtml(c.controlType) + '</strong>' +
                    (c.description ? ': ' + escapeHtml(c.description) : '') + '</li>';
            }).join('');
            html += '<div class="detail-row"><div class="detail-label">Proposed Controls</div>' +
                '<ul class="detail-value">' + items + '</ul></div>';
        }

        document.getElementById('modalDetails').innerHTML = html;
        document.getElementById('taskCounter').textContent = (index + 1) + ' / ' + rows.length;
        document.getElementById('prevBtn').disabled = index === 0;
        document.getElementById('nextBtn').disabled = index === rows.length - 1;
    }

    window.__rsOpenModal = function(index) {
        currentIndex = index;
        showTask(index);
        document.getElementById('taskModal').classList.add('active');
    };

    window.__rsCloseModal = function() {
        document.getElementById('taskModal').classList.remove('active');
    };

    window.__rsNavigate = function(direction) {
        const next = currentIndex + direction;
        if (next >= 0 && next < rows.length) {
            currentIndex = next;
            showTask(currentIndex);
        }
    };

    document.addEventListener('keydown', function(e) {
        if (!document.getElementById('taskModal').classList.contains('active')) return;
        if (e.key === 'Escape') window.__rsCloseModal();
        if (e.key === 'ArrowLeft') window.__rsNavigate(-1);
        if (e.key === 'ArrowRight') window.__rsNavigate(1);
    });

    // Charts need the CDN loader; the table works without it
    if (window.google && google.charts) {
        google.charts.load('current', { packages: ['corechart'] });
        google.charts.setOnLoadCallback(drawCharts);
    }
})();
"#
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Format a Unix timestamp as "October 16, 2026, 14:05 UTC"
fn format_generated_at(timestamp: i64) -> String {
    let secs = timestamp.max(0);
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{} {}, {}, {:02}:{:02} UTC",
        MONTHS[(month - 1) as usize],
        day,
        year,
        rem / 3600,
        (rem % 3600) / 60
    )
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
