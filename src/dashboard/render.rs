//! HTML and SVG rendering of a grid report.

use crate::table::{GridReport, InfoTable, ResultsTable};
use std::fmt::Write;

const CHART_WIDTH: f64 = 760.0;
const PANEL_HEIGHT: f64 = 260.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 34.0;
const MARGIN_BOTTOM: f64 = 40.0;
const BAR_FILL: f64 = 0.6;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; color: #222; }
h1 { margin-bottom: 0.2rem; }
h2 { margin-top: 2rem; }
table { border-collapse: collapse; margin-top: 0.5rem; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
th { background: #f3f3f3; }
td.answer { max-width: 32rem; white-space: pre-wrap; }
"#;

/// Escape text for HTML bodies and attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full dashboard page.
pub fn page(report: &GridReport) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Vectorboard</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<h1>Vectorboard</h1>\n");
    let _ = writeln!(
        html,
        "<p>{} experiments, {} queries</p>",
        report.info.rows().len(),
        report.results.queries().len()
    );

    html.push_str("<h2>Experiments</h2>\n");
    html.push_str(&info_table(&report.info));

    html.push_str("<h2>Timing</h2>\n");
    html.push_str(&chart(&report.info));

    html.push_str("<h2>Queries</h2>\n");
    html.push_str(&queries_table(&report.results));

    html.push_str("<h2>Results</h2>\n");
    html.push_str(&results_table(&report.results));

    html.push_str("</body>\n</html>\n");
    html
}

fn info_table(info: &InfoTable) -> String {
    let mut html = String::from("<table>\n<tr><th></th>");
    for column in info.columns() {
        let _ = write!(html, "<th>{}</th>", escape(&column));
    }
    html.push_str("</tr>\n");

    for row in info.rows() {
        let _ = write!(html, "<tr><th>{}</th>", escape(&row.experiment));
        for value in &row.params {
            let _ = write!(html, "<td>{}</td>", escape(value));
        }
        for timing in [row.run_time, row.embedding_time] {
            let cell = timing.map(|t| format!("{t:.2}")).unwrap_or_default();
            let _ = write!(html, "<td>{cell}</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

fn queries_table(results: &ResultsTable) -> String {
    let mut html = String::from("<table>\n<tr><th>#</th><th>query</th></tr>\n");
    for (i, query) in results.queries().iter().enumerate() {
        let _ = writeln!(html, "<tr><td>{}</td><td>{}</td></tr>", i + 1, escape(query));
    }
    html.push_str("</table>\n");
    html
}

fn results_table(results: &ResultsTable) -> String {
    let mut html = String::from("<table>\n<tr><th>query</th>");
    for column in results.columns() {
        let _ = write!(html, "<th>{}</th>", escape(&column.experiment));
    }
    html.push_str("</tr>\n");

    for (row, query) in results.queries().iter().enumerate() {
        let _ = write!(html, "<tr><th>{}</th>", escape(query));
        for col in 0..results.columns().len() {
            let answer = results.cell(row, col).unwrap_or_default();
            let _ = write!(html, "<td class=\"answer\">{}</td>", escape(answer));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

/// Bar chart of run time over embedding time, one bar per experiment.
pub fn chart(info: &InfoTable) -> String {
    let labels: Vec<&str> = info.rows().iter().map(|r| r.experiment.as_str()).collect();
    let run: Vec<f64> = info.rows().iter().map(|r| r.run_time.unwrap_or(0.0)).collect();
    let embedding: Vec<f64> = info
        .rows()
        .iter()
        .map(|r| r.embedding_time.unwrap_or(0.0))
        .collect();

    let height = PANEL_HEIGHT * 2.0;
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{CHART_WIDTH}\" height=\"{height}\" \
         viewBox=\"0 0 {CHART_WIDTH} {height}\" font-family=\"sans-serif\" font-size=\"12\">"
    );
    svg.push_str(&panel("Run time", &labels, &run, 0.0, "#4c72b0"));
    svg.push_str(&panel("Embedding time", &labels, &embedding, PANEL_HEIGHT, "#dd8452"));
    svg.push_str("</svg>\n");
    svg
}

fn panel(title: &str, labels: &[&str], values: &[f64], top: f64, color: &str) -> String {
    let plot_left = MARGIN_LEFT;
    let plot_top = top + MARGIN_TOP;
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = plot_top + plot_height;

    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let scale_max = if max > 0.0 { max * 1.15 } else { 1.0 };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"14\">{}</text>",
        plot_left + plot_width / 2.0,
        top + 20.0,
        escape(title)
    );
    let _ = writeln!(
        svg,
        "<text transform=\"translate({:.1},{:.1}) rotate(-90)\" text-anchor=\"middle\">Time (s)</text>",
        18.0,
        plot_top + plot_height / 2.0
    );
    let _ = writeln!(
        svg,
        "<line x1=\"{plot_left:.1}\" y1=\"{plot_top:.1}\" x2=\"{plot_left:.1}\" y2=\"{baseline:.1}\" stroke=\"#444\"/>"
    );
    let _ = writeln!(
        svg,
        "<line x1=\"{plot_left:.1}\" y1=\"{baseline:.1}\" x2=\"{:.1}\" y2=\"{baseline:.1}\" stroke=\"#444\"/>",
        plot_left + plot_width
    );
    for (y, tick) in [(baseline, 0.0), (plot_top, scale_max)] {
        let _ = writeln!(
            svg,
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{tick:.2}</text>",
            plot_left - 6.0,
            y + 4.0
        );
    }

    if values.is_empty() {
        return svg;
    }

    let slot = plot_width / values.len() as f64;
    let bar_width = slot * BAR_FILL;
    for (i, (label, value)) in labels.iter().zip(values).enumerate() {
        let bar_height = value / scale_max * plot_height;
        let x = plot_left + slot * i as f64 + (slot - bar_width) / 2.0;
        let y = baseline - bar_height;
        let center = x + bar_width / 2.0;
        let _ = writeln!(
            svg,
            "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{bar_width:.1}\" height=\"{bar_height:.1}\" fill=\"{color}\"/>"
        );
        let _ = writeln!(
            svg,
            "<text x=\"{center:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{value:.2}</text>",
            y - 4.0
        );
        let _ = writeln!(
            svg,
            "<text x=\"{center:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>",
            baseline + 16.0,
            escape(label)
        );
    }
    svg
}
