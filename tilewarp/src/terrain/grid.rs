//! Height grids and color ramps.

use image::Rgb;

/// Regular raster of elevation samples, row-major, north row first.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    data: Vec<f32>,
    width: u32,
    height: u32,
    min: f32,
    max: f32,
}

impl HeightGrid {
    /// Creates a grid from samples. Returns `None` if `data` does not hold
    /// exactly `width × height` samples.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        let mut grid = Self {
            data,
            width,
            height,
            min: 0.0,
            max: 0.0,
        };
        grid.update_range();
        Some(grid)
    }

    /// A grid filled with one value.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            data: vec![value; width as usize * height as usize],
            width,
            height,
            min: value,
            max: value,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Replaces non-finite samples with zero and recomputes min/max.
    ///
    /// Every grid passes through here before it is color-encoded.
    pub fn normalize(&mut self) {
        for value in &mut self.data {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        self.update_range();
    }

    fn update_range(&mut self) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &value in self.data.iter().filter(|v| v.is_finite()) {
            min = min.min(value);
            max = max.max(value);
        }
        if min > max {
            (min, max) = (0.0, 0.0);
        }
        self.min = min;
        self.max = max;
    }
}

/// Height thresholds mapped to colors.
///
/// A height takes the color of the highest threshold at or below it; heights
/// under every threshold take the lowest stop's color.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorRamp {
    stops: Vec<(f32, Rgb<u8>)>,
}

impl ColorRamp {
    pub fn new(stops: impl IntoIterator<Item = (f32, Rgb<u8>)>) -> Self {
        let mut stops: Vec<_> = stops.into_iter().filter(|(t, _)| t.is_finite()).collect();
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn color(&self, height: f32) -> Option<Rgb<u8>> {
        let first = self.stops.first()?;
        let idx = self.stops.partition_point(|(t, _)| *t <= height);
        Some(if idx == 0 { first.1 } else { self.stops[idx - 1].1 })
    }
}
