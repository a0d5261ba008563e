//! Bar chart descriptions for model-supplied series.

use serde::Serialize;

use crate::constants::{CHART_TITLE, CHART_XAXIS_TITLE, CHART_YAXIS_TITLE};

/// Declarative bar chart, independent of whatever draws it.
///
/// Serializes as `{type: "bar", x, y, title, xaxis_title, yaxis_title}`; the
/// browser page hands this to Plotly and the terminal uses [`ChartSpec::render_text`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub title: &'static str,
    pub xaxis_title: &'static str,
    pub yaxis_title: &'static str,
}

/// One bar per label, height taken from the matching value.
///
/// Callers pass equal-length series (the reply validator rejects mismatches);
/// anything past the shorter series is dropped.
pub fn build_chart(data: &[f64], labels: &[String]) -> ChartSpec {
    let (x, y) = labels
        .iter()
        .zip(data)
        .map(|(label, value)| (label.clone(), *value))
        .unzip();

    ChartSpec {
        chart_type: "bar",
        x,
        y,
        title: CHART_TITLE,
        xaxis_title: CHART_XAXIS_TITLE,
        yaxis_title: CHART_YAXIS_TITLE,
    }
}

impl ChartSpec {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Horizontal bars drawn with `#`, scaled so the largest magnitude spans `width` cells.
    pub fn render_text(&self, width: usize) -> String {
        let mut out = format!("{}\n", self.title);
        if self.is_empty() {
            out.push_str("(no data)\n");
            return out;
        }

        let label_width = self.x.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let max = self.y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        for (label, value) in self.x.iter().zip(&self.y) {
            let cells = if max > 0.0 && value.is_finite() {
                ((value.abs() / max) * width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:<label_width$} | {} {}\n",
                label,
                "#".repeat(cells),
                value
            ));
        }
        out.push_str(&format!("{} vs {}\n", self.xaxis_title, self.yaxis_title));
        out
    }
}
