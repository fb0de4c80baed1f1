//! Spatial heatmap of observed centroids.
//!
//! Each centroid adds a Gaussian bump (sigma [`SIGMA_PX`], peak
//! [`AMPLITUDE`]) to a float field the size of the frame. Values never decay;
//! the field only grows until the session resets it. The kernel is evaluated
//! in a window of [`WINDOW_SIGMAS`] sigmas around the centroid; outside that
//! window the contribution is below 1e-7 of the peak.

use image::{Rgb, RgbImage};

use crate::geometry::Point;

/// Kernel standard deviation in pixels.
pub const SIGMA_PX: f32 = 30.0;

/// Kernel peak value.
pub const AMPLITUDE: f32 = 10.0;

/// Kernel half-width in multiples of sigma.
pub const WINDOW_SIGMAS: f32 = 6.0;

/// Weight of the original frame in the rendered overlay.
pub const FRAME_WEIGHT: f32 = 0.7;

/// Weight of the colorized heat in the rendered overlay.
pub const HEAT_WEIGHT: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
struct HeatField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl HeatField {
    fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    fn add_gaussian(&mut self, center: Point) {
        let radius = SIGMA_PX * WINDOW_SIGMAS;
        let two_sigma_sq = 2.0 * SIGMA_PX * SIGMA_PX;
        let (cx, cy) = (center.x as f32, center.y as f32);

        let x_min = (cx - radius).floor().max(0.0) as u32;
        let y_min = (cy - radius).floor().max(0.0) as u32;
        let x_max = ((cx + radius).ceil().max(0.0) as u32).min(self.width);
        let y_max = ((cy + radius).ceil().max(0.0) as u32).min(self.height);

        for y in y_min..y_max {
            let dy = y as f32 - cy;
            let row = y as usize * self.width as usize;
            for x in x_min..x_max {
                let dx = x as f32 - cx;
                let weight = (-(dx * dx + dy * dy) / two_sigma_sq).exp() * AMPLITUDE;
                self.values[row + x as usize] += weight;
            }
        }
    }
}

/// Per-session heat accumulator. Allocated lazily on first use.
#[derive(Debug, Clone, Default)]
pub struct HeatmapAccumulator {
    field: Option<HeatField>,
}

impl HeatmapAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `centers` into the field for a `width` x `height` frame.
    ///
    /// A frame with different dimensions than the current field replaces it
    /// with a fresh zero field first.
    pub fn accumulate(&mut self, width: u32, height: u32, centers: &[Point]) {
        let same_size = matches!(&self.field, Some(f) if f.width == width && f.height == height);
        if !same_size {
            if self.field.is_some() {
                tracing::debug!(width, height, "Frame size changed, reallocating heatmap");
            }
            self.field = Some(HeatField::zeros(width, height));
        }
        let Some(field) = self.field.as_mut() else {
            return;
        };

        for center in centers {
            field.add_gaussian(*center);
        }
    }

    /// `true` once a field has been allocated.
    pub fn is_allocated(&self) -> bool {
        self.field.is_some()
    }

    /// Raw accumulated values, row-major.
    pub fn values(&self) -> Option<&[f32]> {
        self.field.as_ref().map(|f| f.values.as_slice())
    }

    /// Discard the field.
    pub fn reset(&mut self) {
        self.field = None;
    }

    /// Colorize the field and blend it over `base`.
    ///
    /// Returns `None` when no field exists or `base` has other dimensions.
    pub fn render(&self, base: &RgbImage) -> Option<RgbImage> {
        let field = self.field.as_ref()?;
        if base.width() != field.width || base.height() != field.height {
            return None;
        }

        let levels = normalize_to_u8(&field.values);
        let mut out = RgbImage::new(field.width, field.height);
        for (i, (x, y, pixel)) in out.enumerate_pixels_mut().enumerate() {
            let heat = jet(levels[i]);
            let frame = base.get_pixel(x, y);
            *pixel = Rgb([
                blend(frame[0], heat[0]),
                blend(frame[1], heat[1]),
                blend(frame[2], heat[2]),
            ]);
        }
        Some(out)
    }
}

/// Min-max normalize to 0..=255, truncating. A flat field maps to all zeros.
fn normalize_to_u8(values: &[f32]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min;
    if range <= f32::EPSILON {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|v| ((v - min) / range * 255.0).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Jet false-color map: blue at 0, through cyan, yellow, to red at 255.
fn jet(level: u8) -> [u8; 3] {
    let t = f32::from(level) / 255.0;
    let channel = |offset: f32| {
        ((1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0) * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

fn blend(frame: u8, heat: u8) -> u8 {
    (f32::from(frame) * FRAME_WEIGHT + f32::from(heat) * HEAT_WEIGHT)
        .round()
        .clamp(0.0, 255.0) as u8
}
