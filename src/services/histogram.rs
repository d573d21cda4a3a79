use plotters::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Every histogram in a report uses the same number of bins.
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("failed to render histogram: {0}")]
    Render(String),
}

/// Equal-width bins over `[min, max]`; the last bin includes `max`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn bin_centers(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|edges| (edges[0] + edges[1]) / 2.0)
            .collect()
    }
}

/// Bins the finite values of `values`. When all values are equal the bins
/// span one unit above that value so every value lands in the first bin.
pub fn compute_histogram(values: &[f64]) -> Histogram {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Histogram {
            bin_edges: vec![0.0; HISTOGRAM_BINS + 1],
            counts: vec![0; HISTOGRAM_BINS],
        };
    }

    let min_value = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max_value = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;
    let bin_width = if range > f64::EPSILON * max_value.abs().max(1.0) {
        range / HISTOGRAM_BINS as f64
    } else {
        1.0 / HISTOGRAM_BINS as f64
    };

    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for value in &finite {
        let bucket = ((value - min_value) / bin_width).floor() as usize;
        counts[bucket.min(HISTOGRAM_BINS - 1)] += 1;
    }

    let bin_edges = (0..=HISTOGRAM_BINS)
        .map(|idx| min_value + bin_width * idx as f64)
        .collect();

    Histogram { bin_edges, counts }
}

pub fn write_histogram_png(
    output_path: &str,
    histogram: &Histogram,
    x_desc: &str,
) -> Result<(), HistogramError> {
    render_histogram_png(output_path, histogram, x_desc)
}

fn render_histogram_png(
    output_path: &str,
    histogram: &Histogram,
    x_desc: &str,
) -> Result<(), HistogramError> {
    if histogram.total() == 0 {
        return Ok(());
    }

    let max_count = histogram.counts.iter().copied().max().unwrap_or(1);
    let bin_edges = histogram.bin_edges.clone();

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Annual Energy Production", ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(0..histogram.counts.len() as i32, 0..(max_count + 1))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc("Frequency")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_label_formatter(&|value| {
            let edge = bin_edges.get(*value as usize).copied().unwrap_or_default();
            format!("{edge:.0}")
        })
        .draw()
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let bar_color = RGBColor(30, 122, 204);
    let bar_style = ShapeStyle::from(&bar_color).filled();
    chart
        .draw_series(histogram.counts.iter().enumerate().map(|(idx, count)| {
            Rectangle::new([(idx as i32, 0), (idx as i32 + 1, *count)], bar_style)
        }))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    root.present()
        .map_err(|e| HistogramError::Render(e.to_string()))?;
    Ok(())
}
