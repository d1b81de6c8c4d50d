//! Text rendering of the plot data for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - scatter points: cluster id digit (`0`–`9`, `*` beyond)
//! - observed points on fit plots: `o`
//! - fitted curve: `-` line
//! - confidence envelope: `.` shading

use crate::domain::CorrelationMatrix;
use crate::plot::data::{FitSeries, ScatterPoint};

/// Something that can turn plot data into a printable artifact.
pub trait Renderer {
    /// Scatter of observations coloured by cluster.
    fn scatter(&self, title: &str, points: &[ScatterPoint]) -> String;
    /// Observations with a fitted curve and its shaded envelope.
    fn fit(&self, title: &str, points: &[ScatterPoint], series: &FitSeries) -> String;
    /// Correlation heat map.
    fn heatmap(&self, corr: &CorrelationMatrix) -> String;
}

/// Fixed-grid character renderer.
#[derive(Debug, Clone, Copy)]
pub struct AsciiRenderer {
    pub width: usize,
    pub height: usize,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self { width: 80, height: 20 }
    }
}

impl Renderer for AsciiRenderer {
    fn scatter(&self, title: &str, points: &[ScatterPoint]) -> String {
        let width = self.width.max(10);
        let height = self.height.max(5);

        let (x_min, x_max) = range(points.iter().map(|p| p.x)).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = range(points.iter().map(|p| p.y)).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

        let mut grid = vec![vec![' '; width]; height];
        for p in points {
            let gx = map_x(p.x, x_min, x_max, width);
            let gy = map_y(p.y, y_min, y_max, height);
            grid[gy][gx] = cluster_char(p.label);
        }

        finish(title, x_min, x_max, y_min, y_max, grid)
    }

    fn fit(&self, title: &str, points: &[ScatterPoint], series: &FitSeries) -> String {
        let width = self.width.max(10);
        let height = self.height.max(5);

        let xs = points.iter().map(|p| p.x).chain(series.x.iter().copied());
        let (x_min, x_max) = range(xs).unwrap_or((0.0, 1.0));
        let ys = points
            .iter()
            .map(|p| p.y)
            .chain(series.y.iter().copied())
            .chain(series.lower.iter().copied())
            .chain(series.upper.iter().copied());
        let (y_min, y_max) = range(ys).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

        let mut grid = vec![vec![' '; width]; height];

        // Envelope first, then curve, then points, so later layers overlay.
        for ((&x, &lo), &hi) in series.x.iter().zip(&series.lower).zip(&series.upper) {
            if !(x.is_finite() && lo.is_finite() && hi.is_finite()) {
                continue;
            }
            let gx = map_x(x, x_min, x_max, width);
            let top = map_y(hi, y_min, y_max, height);
            let bottom = map_y(lo, y_min, y_max, height);
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                row[gx] = '.';
            }
        }

        let curve: Vec<(f64, f64)> = series
            .x
            .iter()
            .zip(&series.y)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| (x, y))
            .collect();
        draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

        for p in points {
            let gx = map_x(p.x, x_min, x_max, width);
            let gy = map_y(p.y, y_min, y_max, height);
            grid[gy][gx] = 'o';
        }

        finish(title, x_min, x_max, y_min, y_max, grid)
    }

    fn heatmap(&self, corr: &CorrelationMatrix) -> String {
        const SHADES: [char; 5] = [' ', '.', ':', '+', '#'];

        let label_w = corr.names.iter().map(|n| n.len()).max().unwrap_or(0).max(4);
        let mut out = String::new();

        out.push_str(&format!("{:<label_w$}", ""));
        for name in &corr.names {
            out.push_str(&format!(" {:>label_w$}", name));
        }
        out.push('\n');

        for (i, name) in corr.names.iter().enumerate() {
            out.push_str(&format!("{name:<label_w$}"));
            for j in 0..corr.names.len() {
                let r = corr.values[(i, j)];
                let cell = if r.is_finite() {
                    let shade = SHADES[((r.abs() * 4.0).round() as usize).min(4)];
                    format!("{shade}{r:+.3}")
                } else {
                    "   n/a".to_string()
                };
                out.push_str(&format!(" {cell:>label_w$}"));
            }
            out.push('\n');
        }

        out
    }
}

fn finish(title: &str, x_min: f64, x_max: f64, y_min: f64, y_max: f64, grid: Vec<Vec<char>>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{title}: x=[{x_min:.2}, {x_max:.2}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn cluster_char(label: usize) -> char {
    char::from_digit(label as u32, 10).filter(|_| label < 10).unwrap_or('*')
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, gx, gy, '-');
        } else {
            grid[gy][gx] = '-';
        }
        prev = Some((gx, gy));
    }
}

/// Integer line drawing (Bresenham-ish). Overwrites blanks and envelope shading.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            let cell = &mut grid[y0 as usize][x0 as usize];
            if *cell == ' ' || *cell == '.' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
