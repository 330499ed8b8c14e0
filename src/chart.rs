/*
 *  chart.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Dual-axis trend plot - raw series plus a moving-difference overlay
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use core::fmt::Write;

use arrayvec::ArrayString;
use embedded_graphics::{
    mono_font::{ascii::FONT_5X8, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Polyline, Rectangle},
    text::{Baseline, Text},
};

use crate::constants::{DEFAULT_SMOOTHING_WINDOW, PLOT_HEIGHT, PLOT_WIDTH};
use crate::display::palette::{PLOT_AXIS, PLOT_BG, PLOT_LABEL, PLOT_OVERLAY, PLOT_RAW};
use crate::vframebuf::Raster;

// room for a 5 char label either side
const GUTTER: i32 = 26;
const LABEL_H: i32 = 8;

/// Rate of change: mean of each window minus the mean of the window before it.
///
/// The window shrinks to half the series on short input, so anything with
/// two or more samples produces at least one point. Output has
/// `len - 2w + 1` points; the last one compares the newest `w` samples
/// against the `w` before them.
pub fn moving_difference(samples: &[f32], window: usize) -> Vec<f32> {
    if samples.len() < 2 {
        return Vec::new();
    }
    let w = window.min(samples.len() / 2).max(1);
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0f64);
    for v in samples {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + *v as f64);
    }
    let mean = |from: usize| (prefix[from + w] - prefix[from]) / w as f64;

    (0..=samples.len() - 2 * w)
        .map(|i| (mean(i + w) - mean(i)) as f32)
        .collect()
}

/// Finite min/max, widened when flat so the line sits mid-plot.
fn bounds(values: &[f32]) -> Option<(f32, f32)> {
    let mut it = values.iter().copied().filter(|v| v.is_finite());
    let first = it.next()?;
    let (lo, hi) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo < f32::EPSILON {
        Some((lo - 1.0, hi + 1.0))
    } else {
        Some((lo, hi))
    }
}

fn label(v: f32) -> ArrayString<8> {
    let mut s = ArrayString::new();
    let _ = if v.abs() < 10.0 { write!(s, "{v:.1}") } else { write!(s, "{v:.0}") };
    s
}

/// Renders a history into a fixed-size plot bitmap.
#[derive(Debug, Clone)]
pub struct TrendChart {
    width: u32,
    height: u32,
    window: usize,
}

impl Default for TrendChart {
    fn default() -> Self {
        Self::new(PLOT_WIDTH, PLOT_HEIGHT, DEFAULT_SMOOTHING_WINDOW)
    }
}

impl TrendChart {
    pub fn new(width: u32, height: u32, window: usize) -> Self {
        Self { width, height, window: window.max(1) }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn render(&self, samples: &[f32]) -> Raster {
        let mut raster = Raster::new(self.width, self.height, PLOT_BG);
        let _ = self.draw(&mut raster, samples);
        raster
    }

    fn area(&self) -> Rectangle {
        let w = (self.width as i32 - 2 * GUTTER).max(2) as u32;
        let h = (self.height as i32 - 2).max(2) as u32;
        Rectangle::new(Point::new(GUTTER, 1), Size::new(w, h))
    }

    fn draw(&self, raster: &mut Raster, samples: &[f32]) -> Result<(), Infallible> {
        let area = self.area();
        let axis = PrimitiveStyle::with_stroke(PLOT_AXIS, 1);
        let bottom_right = area.bottom_right().unwrap_or(area.top_left);

        // primary axis left, secondary axis right, shared baseline
        Line::new(area.top_left, Point::new(area.top_left.x, bottom_right.y))
            .into_styled(axis)
            .draw(raster)?;
        Line::new(Point::new(bottom_right.x, area.top_left.y), bottom_right)
            .into_styled(axis)
            .draw(raster)?;
        Line::new(Point::new(area.top_left.x, bottom_right.y), bottom_right)
            .into_styled(axis)
            .draw(raster)?;

        let Some((lo, hi)) = bounds(samples) else {
            return Ok(());
        };
        self.draw_labels(raster, lo, hi, 0, PLOT_LABEL)?;

        let raw = self.trace(&area, samples, 0, samples.len(), lo, hi);
        if raw.len() == 1 {
            Pixel(raw[0], PLOT_RAW).draw(raster)?;
        } else {
            Polyline::new(&raw)
                .into_styled(PrimitiveStyle::with_stroke(PLOT_RAW, 1))
                .draw(raster)?;
        }

        let overlay = moving_difference(samples, self.window);
        let Some((dlo, dhi)) = bounds(&overlay) else {
            return Ok(());
        };
        // overlay point i lines up with the end of its second window
        let w = (samples.len() - overlay.len() + 1) / 2;
        let offset = 2 * w - 1;
        if dlo < 0.0 && dhi > 0.0 {
            let y = Self::scale_y(&area, 0.0, dlo, dhi);
            Line::new(Point::new(area.top_left.x, y), Point::new(bottom_right.x, y))
                .into_styled(axis)
                .draw(raster)?;
        }
        let trend = self.trace(&area, &overlay, offset, samples.len(), dlo, dhi);
        if trend.len() == 1 {
            Pixel(trend[0], PLOT_OVERLAY).draw(raster)?;
        } else {
            Polyline::new(&trend)
                .into_styled(PrimitiveStyle::with_stroke(PLOT_OVERLAY, 1))
                .draw(raster)?;
        }
        self.draw_labels(raster, dlo, dhi, self.width as i32 - GUTTER + 1, PLOT_OVERLAY)
    }

    fn draw_labels(&self, raster: &mut Raster, lo: f32, hi: f32, x: i32, color: Rgb565) -> Result<(), Infallible> {
        let style = MonoTextStyle::new(&FONT_5X8, color);
        Text::with_baseline(&label(hi), Point::new(x, 1), style, Baseline::Top).draw(raster)?;
        Text::with_baseline(
            &label(lo),
            Point::new(x, self.height as i32 - LABEL_H - 1),
            style,
            Baseline::Top,
        )
        .draw(raster)?;
        Ok(())
    }

    /// Map `values`, starting at sample index `offset` of a `total` long
    /// series, into plot coordinates.
    fn trace(&self, area: &Rectangle, values: &[f32], offset: usize, total: usize, lo: f32, hi: f32) -> Vec<Point> {
        let span = (total.max(2) - 1) as f32;
        let width = (area.size.width - 1) as f32;
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| {
                let x = area.top_left.x + (((i + offset) as f32 / span) * width).round() as i32;
                Point::new(x, Self::scale_y(area, *v, lo, hi))
            })
            .collect()
    }

    fn scale_y(area: &Rectangle, v: f32, lo: f32, hi: f32) -> i32 {
        let h = (area.size.height - 1) as f32;
        let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
        area.top_left.y + (h - t * h).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(raster: &Raster, color: Rgb565) -> usize {
        raster.as_slice().iter().filter(|c| **c == color).count()
    }

    #[test]
    fn test_moving_difference_window() {
        assert_eq!(moving_difference(&[1.0, 2.0, 3.0, 4.0], 1), vec![1.0, 1.0, 1.0]);
        // window clamps to len/2
        assert_eq!(moving_difference(&[1.0, 2.0, 3.0, 4.0], 10), vec![2.0]);
        let flat = moving_difference(&[5.0; 30], 10);
        assert_eq!(flat.len(), 11);
        assert!(flat.iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_moving_difference_short_input() {
        assert!(moving_difference(&[], 10).is_empty());
        assert!(moving_difference(&[3.0], 10).is_empty());
        assert_eq!(moving_difference(&[3.0, 5.0], 10), vec![2.0]);
    }

    #[test]
    fn test_render_tolerates_empty_and_single() {
        let chart = TrendChart::default();
        let empty = chart.render(&[]);
        assert_eq!((empty.width(), empty.height()), (PLOT_WIDTH as usize, PLOT_HEIGHT as usize));
        assert_eq!(count(&empty, PLOT_RAW), 0);

        let one = chart.render(&[800.0]);
        assert!(count(&one, PLOT_RAW) >= 1);
        assert_eq!(count(&one, PLOT_OVERLAY), 0);
    }

    #[test]
    fn test_render_draws_both_traces() {
        let chart = TrendChart::default();
        let samples: Vec<f32> = (0..200).map(|i| 600.0 + (i as f32 / 10.0).sin() * 300.0).collect();
        let raster = chart.render(&samples);
        assert!(count(&raster, PLOT_RAW) > 100);
        assert!(count(&raster, PLOT_OVERLAY) > 50);
    }
}
