//! Plain-text rendering for the dashboard.

use std::fmt::Write as _;

use crate::reading::{Measurement, Reading};

const AXIS_HORIZONTAL: char = '-';
const AXIS_VERTICAL: char = '|';
const ORIGIN: char = '+';
const OVERFLOW_MARKER: char = '*';

/// Draw measurements on a polar canvas.
///
/// Angle is the rotation in degrees (0 to the right, counter-clockwise) and
/// distance the radius, scaled so the farthest point touches the edge.
/// Points are numbered in the order given and are not joined. A numbered
/// legend follows the canvas.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn polar_plot(points: &[Measurement], width: usize, height: usize) -> String {
    let width = width.max(3);
    let height = height.max(3);
    let cx = (width - 1) / 2;
    let cy = (height - 1) / 2;

    let mut canvas = vec![vec![' '; width]; height];
    for cell in &mut canvas[cy] {
        *cell = AXIS_HORIZONTAL;
    }
    for row in &mut canvas {
        row[cx] = AXIS_VERTICAL;
    }
    canvas[cy][cx] = ORIGIN;

    let max_r = points
        .iter()
        .map(|p| p.distance_m)
        .fold(0.0_f64, f64::max);
    let max_r = if max_r > 0.0 { max_r } else { 1.0 };

    for (i, point) in points.iter().enumerate() {
        let scale = point.distance_m.max(0.0) / max_r;
        let theta = (point.angle as f64).to_radians();
        let x = cx as f64 + scale * theta.cos() * cx as f64;
        let y = cy as f64 - scale * theta.sin() * cy as f64;
        let col = (x.round().max(0.0) as usize).min(width - 1);
        let row = (y.round().max(0.0) as usize).min(height - 1);
        canvas[row][col] = marker(i);
    }

    let mut out = String::new();
    for row in canvas {
        let line: String = row.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    for (i, point) in points.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}  angle {:>4} deg  distance {:.2} m",
            marker(i),
            point.angle,
            point.distance_m
        );
    }
    out
}

fn marker(index: usize) -> char {
    u32::try_from(index + 1)
        .ok()
        .and_then(|n| char::from_digit(n, 10))
        .unwrap_or(OVERFLOW_MARKER)
}

/// Render readings as a fixed-width table, in the order given.
#[must_use]
pub fn readings_table(readings: &[Reading]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8}  {:<19}  {:>6}  {:>10}",
        "id", "timestamp", "angle", "distance_m"
    );
    let _ = writeln!(out, "{}", "-".repeat(8 + 2 + 19 + 2 + 6 + 2 + 10));
    for r in readings {
        let _ = writeln!(
            out,
            "{:>8}  {:<19}  {:>6}  {:>10}",
            r.id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.angle,
            r.distance_m
        );
    }
    out
}
