// =============================================================================
// CHART MODULE
// =============================================================================
// Lays out a revenue line chart and renders it as SVG.
//
// GEOMETRY:
// - Fixed logical canvas (WIDTH x HEIGHT) with PADDING on every side
// - x: points evenly spaced by index between the left and right padding
// - y: 0 sits on the bottom padding line, 1.2 x max value on the top one
//
// Layout is a pure function of the series; hover is a separate
// single-selection state applied at render time.
// =============================================================================

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::ChartPoint;
use crate::sample_data::SampleDataProvider;

pub const WIDTH: f64 = 800.0;
pub const HEIGHT: f64 = 300.0;
pub const PADDING: f64 = 40.0;

/// Scale top as a multiple of the largest value
pub const HEADROOM: f64 = 1.2;

/// Radius of the invisible hover target around each point
pub const HIT_RADIUS: f64 = 15.0;
pub const MARKER_RADIUS: f64 = 4.0;
pub const HOVERED_MARKER_RADIUS: f64 = 6.0;

/// Shorter series are replaced by sample data
pub const MIN_POINTS: usize = 3;

/// Fractions of the plot height that get a horizontal gridline
const GRID_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

// =============================================================================
// LAYOUT TYPES
// =============================================================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlottedPoint {
    pub label: String,
    pub value: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub points: Vec<PlottedPoint>,

    /// Value mapped to the top padding line
    pub max_scale: f64,

    /// Closed polygon: baseline, up through every point, back to baseline
    pub area_path: String,

    /// Stroke through every point
    pub line_path: String,

    /// y of each horizontal gridline, baseline first
    pub horizontal_grid: Vec<f64>,

    /// x of each vertical gridline, one per point
    pub vertical_grid: Vec<f64>,

    /// Top (max scale) and bottom (zero) labels on the y axis
    pub y_labels: Vec<AxisLabel>,
}

impl ChartLayout {
    fn baseline(&self) -> f64 {
        self.height - PADDING
    }
}

// =============================================================================
// SERIES PREPARATION
// =============================================================================
/// Use `series` when it has enough points, otherwise sample data
pub fn series_or_sample(
    series: Vec<ChartPoint>,
    samples: &dyn SampleDataProvider,
    today: NaiveDate,
) -> Vec<ChartPoint> {
    if series.len() < MIN_POINTS {
        samples.series(today)
    } else {
        series
    }
}

// =============================================================================
// LAYOUT
// =============================================================================
pub fn layout(series: &[ChartPoint]) -> ChartLayout {
    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let baseline = HEIGHT - PADDING;

    let values: Vec<f64> = series
        .iter()
        .map(|p| if p.value.is_finite() { p.value } else { 0.0 })
        .collect();
    let max_value = values.iter().copied().fold(0.0_f64, f64::max);
    let max_scale = if max_value > 0.0 {
        max_value * HEADROOM
    } else {
        1.0
    };

    let step = if series.len() > 1 {
        plot_width / (series.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<PlottedPoint> = series
        .iter()
        .zip(&values)
        .enumerate()
        .map(|(i, (point, &value))| PlottedPoint {
            label: point.label.clone(),
            value: point.value,
            x: if series.len() > 1 {
                PADDING + i as f64 * step
            } else {
                WIDTH / 2.0
            },
            y: baseline - value / max_scale * plot_height,
        })
        .collect();

    let line_path = points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} {:.2} {:.2}", if i == 0 { "M" } else { "L" }, p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ");

    let area_path = match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            let mut path = format!("M {:.2} {:.2}", first.x, baseline);
            for p in &points {
                let _ = write!(path, " L {:.2} {:.2}", p.x, p.y);
            }
            let _ = write!(path, " L {:.2} {:.2} Z", last.x, baseline);
            path
        }
        _ => String::new(),
    };

    let horizontal_grid = GRID_FRACTIONS
        .iter()
        .map(|f| baseline - f * plot_height)
        .collect();
    let vertical_grid = points.iter().map(|p| p.x).collect();

    let y_labels = vec![
        AxisLabel {
            text: format_value(max_scale),
            x: PADDING - 8.0,
            y: PADDING,
        },
        AxisLabel {
            text: "0".to_string(),
            x: PADDING - 8.0,
            y: baseline,
        },
    ];

    ChartLayout {
        width: WIDTH,
        height: HEIGHT,
        points,
        max_scale,
        area_path,
        line_path,
        horizontal_grid,
        vertical_grid,
        y_labels,
    }
}

fn format_value(value: f64) -> String {
    format!("{:.0}", value)
}

// =============================================================================
// HOVER
// =============================================================================
/// At most one point is hovered at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    hovered: Option<usize>,
}

/// Tooltip for the hovered point, positioned in percent of the canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub label: String,
    pub value: f64,
    pub left_pct: f64,
    pub top_pct: f64,
}

impl HoverState {
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Pointer entered point `index`; replaces any previous selection.
    /// Indices outside the layout are ignored.
    pub fn enter(&mut self, layout: &ChartLayout, index: usize) {
        if index < layout.points.len() {
            self.hovered = Some(index);
        }
    }

    /// Pointer left point `index`; clears only if it is the selected one
    pub fn leave(&mut self, index: usize) {
        if self.hovered == Some(index) {
            self.hovered = None;
        }
    }

    pub fn tooltip(&self, layout: &ChartLayout) -> Option<Tooltip> {
        let point = layout.points.get(self.hovered?)?;
        Some(Tooltip {
            label: point.label.clone(),
            value: point.value,
            left_pct: point.x / layout.width * 100.0,
            top_pct: point.y / layout.height * 100.0,
        })
    }
}

// =============================================================================
// SVG
// =============================================================================
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the layout as a standalone SVG document
pub fn render_svg(layout: &ChartLayout, hover: &HoverState) -> String {
    let baseline = layout.baseline();
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" class="revenue-chart">"#,
        w = layout.width,
        h = layout.height
    );

    // Gridlines
    svg.push_str(r##"<g class="grid" stroke="#e5e7eb" stroke-width="1">"##);
    svg.push('\n');
    for y in &layout.horizontal_grid {
        let _ = writeln!(
            svg,
            r#"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}"/>"#,
            PADDING,
            layout.width - PADDING
        );
    }
    for x in &layout.vertical_grid {
        let _ = writeln!(
            svg,
            r#"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke-dasharray="4 4"/>"#,
            PADDING, baseline
        );
    }
    svg.push_str("</g>\n");

    // Area and line
    let _ = writeln!(
        svg,
        r##"<path class="area" d="{}" fill="#6366f1" fill-opacity="0.15" stroke="none"/>"##,
        layout.area_path
    );
    let _ = writeln!(
        svg,
        r##"<path class="line" d="{}" fill="none" stroke="#6366f1" stroke-width="2"/>"##,
        layout.line_path
    );

    // Axis labels
    for label in &layout.y_labels {
        let _ = writeln!(
            svg,
            r#"<text class="y-label" x="{:.2}" y="{:.2}" text-anchor="end" font-size="11">{}</text>"#,
            label.x,
            label.y,
            escape(&label.text)
        );
    }
    for point in &layout.points {
        let _ = writeln!(
            svg,
            r#"<text class="x-label" x="{:.2}" y="{:.2}" text-anchor="middle" font-size="11">{}</text>"#,
            point.x,
            baseline + 20.0,
            escape(&point.label)
        );
    }

    // Markers with their hover targets
    for (i, point) in layout.points.iter().enumerate() {
        let radius = if hover.hovered() == Some(i) {
            HOVERED_MARKER_RADIUS
        } else {
            MARKER_RADIUS
        };
        let _ = writeln!(
            svg,
            r##"<g class="point" data-index="{i}"><circle class="hit-target" cx="{x:.2}" cy="{y:.2}" r="{HIT_RADIUS}" fill="transparent"/><circle class="marker" cx="{x:.2}" cy="{y:.2}" r="{radius}" fill="#6366f1"/></g>"##,
            x = point.x,
            y = point.y
        );
    }

    // Tooltip above the hovered point
    if let Some(point) = hover.hovered().and_then(|i| layout.points.get(i)) {
        let _ = writeln!(
            svg,
            r##"<g class="tooltip" transform="translate({:.2} {:.2})"><rect x="-45" y="-42" width="90" height="34" rx="4" fill="#111827"/><text x="0" y="-28" text-anchor="middle" font-size="11" fill="#ffffff">{}</text><text x="0" y="-14" text-anchor="middle" font-size="10" fill="#9ca3af">{}</text></g>"##,
            point.x,
            point.y,
            point.value,
            escape(&point.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}
