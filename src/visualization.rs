//! Text-based scatter plot of aggregated OFI against forward returns.
//!
//! The chart is drawn on a character grid for terminal output:
//!
//! - `*` one observation in the cell, `#` two or more
//! - `.` the fitted regression line
//!
//! Non-finite points are skipped. An empty sample renders a "no data" chart.

use crate::book::BookTable;
use crate::error::Result;
use crate::regression::{regression_pairs, OlsFit};
use std::fmt;

/// Default chart width in characters.
pub const DEFAULT_WIDTH: usize = 72;

/// Default chart height in characters.
pub const DEFAULT_HEIGHT: usize = 20;

const Y_LABEL_WIDTH: usize = 11;

/// Scatter plot with an optional fitted line.
#[derive(Debug, Clone)]
pub struct ScatterPlot {
    title: String,
    x_label: String,
    y_label: String,
    width: usize,
    height: usize,
    points: Vec<(f64, f64)>,
    fit: Option<OlsFit>,
}

impl ScatterPlot {
    /// Create a plot from `(x, y)` pairs. Non-finite pairs are dropped.
    pub fn new(title: impl Into<String>, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            title: title.into(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            points: points
                .into_iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .collect(),
            fit: None,
        }
    }

    /// Set the axis labels.
    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Set the grid size. Values below 10x5 are raised to that minimum.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width.max(10);
        self.height = height.max(5);
        self
    }

    /// Overlay a fitted line.
    pub fn with_fit(mut self, fit: OlsFit) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Number of plotted points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there is nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Chart title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Render the chart to a string.
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn grid(&self, x_range: (f64, f64), y_range: (f64, f64)) -> Vec<Vec<char>> {
        let (w, h) = (self.width, self.height);
        let mut counts = vec![vec![0u32; w]; h];
        let mut grid = vec![vec![' '; w]; h];

        let col_of = |x: f64| scale(x, x_range, w);
        let row_of = |y: f64| h - 1 - scale(y, y_range, h);

        if let Some(fit) = &self.fit {
            for (col, cell_x) in cell_centers(x_range, w).enumerate() {
                let y = fit.predict(cell_x);
                if y.is_finite() && y >= y_range.0 && y <= y_range.1 {
                    grid[row_of(y)][col] = '.';
                }
            }
        }

        for &(x, y) in &self.points {
            counts[row_of(y)][col_of(x)] += 1;
        }
        for (row, cells) in counts.iter().enumerate() {
            for (col, &count) in cells.iter().enumerate() {
                match count {
                    0 => {}
                    1 => grid[row][col] = '*',
                    _ => grid[row][col] = '#',
                }
            }
        }

        grid
    }
}

impl fmt::Display for ScatterPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;

        if self.points.is_empty() {
            return writeln!(f, "(no data)");
        }

        let x_range = padded_range(self.points.iter().map(|p| p.0));
        let y_range = padded_range(self.points.iter().map(|p| p.1));
        let grid = self.grid(x_range, y_range);

        for (row, cells) in grid.iter().enumerate() {
            let label = if row == 0 {
                format!("{:>w$.4e}", y_range.1, w = Y_LABEL_WIDTH)
            } else if row == self.height - 1 {
                format!("{:>w$.4e}", y_range.0, w = Y_LABEL_WIDTH)
            } else {
                " ".repeat(Y_LABEL_WIDTH)
            };
            let line: String = cells.iter().collect();
            writeln!(f, "{label} |{line}")?;
        }

        writeln!(f, "{} +{}", " ".repeat(Y_LABEL_WIDTH), "-".repeat(self.width))?;

        let left = format!("{:.4e}", x_range.0);
        let right = format!("{:.4e}", x_range.1);
        let gap = self.width.saturating_sub(left.len() + right.len()).max(1);
        writeln!(
            f,
            "{}  {}{}{}",
            " ".repeat(Y_LABEL_WIDTH),
            left,
            " ".repeat(gap),
            right
        )?;

        writeln!(f, "x: {}", self.x_label)?;
        writeln!(f, "y: {}", self.y_label)?;
        if let Some(fit) = &self.fit {
            writeln!(
                f,
                "fit: y = {:.6e} + {:.6e} x  (R^2 = {:.6})",
                fit.intercept, fit.slope, fit.r_squared
            )?;
        }
        Ok(())
    }
}

/// Min/max of the values, widened when all values are equal.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi - lo > 0.0 {
        (lo, hi)
    } else {
        let pad = if lo.abs() > 0.0 { lo.abs() * 0.01 } else { 0.5 };
        (lo - pad, hi + pad)
    }
}

/// Index of the cell containing `v` in a range split into `cells` buckets.
fn scale(v: f64, (lo, hi): (f64, f64), cells: usize) -> usize {
    let t = (v - lo) / (hi - lo);
    ((t * cells as f64) as usize).min(cells - 1)
}

fn cell_centers((lo, hi): (f64, f64), cells: usize) -> impl Iterator<Item = f64> {
    let step = (hi - lo) / cells as f64;
    (0..cells).map(move |i| lo + (i as f64 + 0.5) * step)
}

/// Build the OFI vs forward-return chart for a table.
///
/// # Errors
///
/// `DataFormat` if `OFI_aggregated` or `future_ret_<horizon>` is missing.
pub fn ofi_vs_returns_plot(
    table: &BookTable,
    horizon: usize,
    fit: Option<&OlsFit>,
) -> Result<ScatterPlot> {
    let (x, y, _) = regression_pairs(table, horizon)?;

    let plot = ScatterPlot::new(
        format!("Future Returns (horizon={horizon}) vs. Aggregated OFI"),
        x.into_iter().zip(y),
    )
    .with_labels(
        "OFI_aggregated",
        format!("Future Return (horizon={horizon})"),
    );

    Ok(match fit {
        Some(fit) => plot.with_fit(*fit),
        None => plot,
    })
}

/// Print the OFI vs forward-return chart to stdout.
pub fn visualize_ofi_vs_returns(
    table: &BookTable,
    horizon: usize,
    fit: Option<&OlsFit>,
) -> Result<()> {
    let plot = ofi_vs_returns_plot(table, horizon, fit)?;
    println!("\n{plot}");
    Ok(())
}
