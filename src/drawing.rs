//! Drawing surfaces the renderer draws annotations onto.
//!
//! The tool only knows the [`DrawingSurface`] trait. Surfaces are created
//! through an injected [`SurfaceFactory`] instead of a process wide canvas
//! creator. [`ImageSurface`] rasterizes into an RGB image, e.g. for offscreen
//! rendering or snapshots.

use crate::annotation::AnnotationId;
use crate::geometry::Point2;
use crate::volume::ImageVolume;

use image::{Rgb, RgbImage};

#[derive(Debug, Clone, PartialEq)]
pub struct RectStyle {
    pub color: [u8; 3],
    pub line_width: f64,
    /// Dash length in canvas pixels, solid when unset
    pub line_dash: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandleStyle {
    pub color: [u8; 3],
    pub handle_radius: f64,
}

pub trait DrawingSurface {
    /// Draw the axis aligned rectangle spanned by two canvas corners
    fn draw_rect(
        &mut self,
        annotation_uid: &AnnotationId,
        rect_uid: &str,
        start: Point2,
        end: Point2,
        style: &RectStyle,
    );

    fn draw_handles(
        &mut self,
        annotation_uid: &AnnotationId,
        handle_group_uid: &str,
        handles: &[Point2],
        style: &HandleStyle,
    );
}

pub trait SurfaceFactory {
    type Surface: DrawingSurface;

    fn create_surface(&self, width: u32, height: u32) -> Self::Surface;
}

/// Creates blank [`ImageSurface`]s
#[derive(Debug, Clone, Copy)]
pub struct RasterSurfaceFactory {
    pub background: [u8; 3],
}

impl RasterSurfaceFactory {
    pub const DEFAULT_WIDTH: u32 = 512;
    pub const DEFAULT_HEIGHT: u32 = 512;

    pub fn create_default_surface(&self) -> ImageSurface {
        self.create_surface(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

impl Default for RasterSurfaceFactory {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
        }
    }
}

impl SurfaceFactory for RasterSurfaceFactory {
    type Surface = ImageSurface;

    fn create_surface(&self, width: u32, height: u32) -> ImageSurface {
        ImageSurface {
            canvas: RgbImage::from_pixel(width, height, Rgb(self.background)),
        }
    }
}

pub struct ImageSurface {
    canvas: RgbImage,
}

impl ImageSurface {
    /// Surface showing slice `k` of `volume`, one canvas pixel per voxel
    pub fn from_volume_slice(volume: &ImageVolume, k: usize) -> Option<Self> {
        let slice = volume.slice_to_image(k)?;
        let canvas = RgbImage::from_fn(slice.width(), slice.height(), |x, y| {
            let value = slice.get_pixel(x, y).0[0];
            Rgb([value, value, value])
        });
        Some(Self { canvas })
    }

    pub fn image(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbImage {
        self.canvas
    }

    fn plot(&mut self, x: f64, y: f64, half_width: f64, color: [u8; 3]) {
        let (width, height) = self.canvas.dimensions();
        let x_range = (x - half_width).round() as i64..=(x + half_width).round() as i64;

        for px in x_range {
            for py in (y - half_width).round() as i64..=(y + half_width).round() as i64 {
                if px >= 0 && py >= 0 && (px as u64) < u64::from(width) && (py as u64) < u64::from(height) {
                    self.canvas.put_pixel(px as u32, py as u32, Rgb(color));
                }
            }
        }
    }

    fn draw_line(&mut self, start: Point2, end: Point2, style: &RectStyle) {
        let length = (end[0] - start[0]).hypot(end[1] - start[1]);
        let steps = length.ceil().max(1.0) as usize;
        let half_width = ((style.line_width - 1.0) / 2.0).max(0.0);

        for step in 0..=steps {
            let travelled = length * step as f64 / steps as f64;
            if let Some(dash) = style.line_dash.filter(|dash| *dash > 0.0) {
                if (travelled / dash).floor() as u64 % 2 == 1 {
                    continue;
                }
            }
            let t = step as f64 / steps as f64;
            let x = t.mul_add(end[0] - start[0], start[0]);
            let y = t.mul_add(end[1] - start[1], start[1]);
            self.plot(x, y, half_width, style.color);
        }
    }
}

impl DrawingSurface for ImageSurface {
    fn draw_rect(
        &mut self,
        _annotation_uid: &AnnotationId,
        _rect_uid: &str,
        start: Point2,
        end: Point2,
        style: &RectStyle,
    ) {
        let corners = [start, [end[0], start[1]], end, [start[0], end[1]]];
        for edge in 0..4 {
            self.draw_line(corners[edge], corners[(edge + 1) % 4], style);
        }
    }

    fn draw_handles(
        &mut self,
        _annotation_uid: &AnnotationId,
        _handle_group_uid: &str,
        handles: &[Point2],
        style: &HandleStyle,
    ) {
        let radius = style.handle_radius.max(0.0);
        let reach = radius.ceil() as i64;

        for handle in handles {
            for dx in -reach..=reach {
                for dy in -reach..=reach {
                    let (dx, dy) = (dx as f64, dy as f64);
                    if dx.hypot(dy) <= radius {
                        self.plot(handle[0] + dx, handle[1] + dy, 0.0, style.color);
                    }
                }
            }
        }
    }
}
