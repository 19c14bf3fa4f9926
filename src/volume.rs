use crate::geometry::{self, Point3};

use image::{ImageBuffer, Luma};
use ndarray::{Array3, ArrayView2, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Volume has {slices} slices but {images} image ids")]
    ImageCountMismatch { slices: usize, images: usize },

    #[error("Spacing must be positive on every axis, got {0:?}")]
    InvalidSpacing([f64; 3]),
}

/// Position and orientation of a volume in patient space.
///
/// `direction` holds the unit axis vectors for i (columns), j (rows) and
/// k (slices). They are assumed to be orthonormal, which holds for volumes
/// built from a single acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    pub origin: Point3,
    pub spacing: [f64; 3],
    pub direction: [Point3; 3],
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            spacing: [1.0, 1.0, 1.0],
            direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

/// Plane metadata of a single acquired image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlane {
    pub image_id: String,
    pub image_position_patient: Point3,
}

/// A voxel enumerated from a bounding box of the volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelPoint {
    /// (i, j, k)
    pub index: [usize; 3],
    pub world: Point3,
    pub value: u16,
}

#[derive(Debug)]
pub struct ImageVolume {
    pub volume_id: String,
    /// Voxel data laid out as (depth, height, width), i.e. (k, j, i)
    pub data: Array3<u16>,
    pub geometry: VolumeGeometry,
    image_planes: Vec<ImagePlane>,
}

impl ImageVolume {
    /// Create a volume whose image planes are derived from its geometry.
    ///
    /// `image_ids[k]` names the acquired image stored at slice `k`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of image ids does not match the depth
    /// of `data` or if any spacing is not positive.
    pub fn new(
        volume_id: impl Into<String>,
        data: Array3<u16>,
        geometry: VolumeGeometry,
        image_ids: Vec<String>,
    ) -> Result<Self, VolumeError> {
        let mut volume = Self::with_image_planes(volume_id, data, geometry, Vec::new())?;
        volume.check_image_count(image_ids.len())?;

        volume.image_planes = image_ids
            .into_iter()
            .enumerate()
            .map(|(k, image_id)| ImagePlane {
                image_id,
                image_position_patient: volume.index_to_world([0.0, 0.0, k as f64]),
            })
            .collect();

        Ok(volume)
    }

    /// Create a volume from image planes read from the acquired images.
    pub fn with_image_planes(
        volume_id: impl Into<String>,
        data: Array3<u16>,
        geometry: VolumeGeometry,
        image_planes: Vec<ImagePlane>,
    ) -> Result<Self, VolumeError> {
        if geometry.spacing.iter().any(|&s| s.is_nan() || s <= 0.0) {
            return Err(VolumeError::InvalidSpacing(geometry.spacing));
        }

        let volume = Self {
            volume_id: volume_id.into(),
            data,
            geometry,
            image_planes,
        };
        if !volume.image_planes.is_empty() {
            volume.check_image_count(volume.image_planes.len())?;
        }
        Ok(volume)
    }

    fn check_image_count(&self, images: usize) -> Result<(), VolumeError> {
        let slices = self.dim().0;
        if images != slices {
            return Err(VolumeError::ImageCountMismatch { slices, images });
        }
        Ok(())
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get the dimensions in index order (i, j, k)
    pub fn dimensions(&self) -> [usize; 3] {
        let (depth, height, width) = self.dim();
        [width, height, depth]
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    pub fn image_planes(&self) -> &[ImagePlane] {
        &self.image_planes
    }

    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.image_planes.iter().map(|plane| plane.image_id.as_str())
    }

    /// Look up the plane metadata of an image by its id
    pub fn image_plane(&self, image_id: &str) -> Option<&ImagePlane> {
        self.image_planes
            .iter()
            .find(|plane| plane.image_id == image_id)
    }

    pub fn index_to_world(&self, ijk: [f64; 3]) -> Point3 {
        let VolumeGeometry {
            origin,
            spacing,
            direction,
        } = self.geometry;

        (0..3).fold(origin, |world, axis| {
            geometry::scale_and_add(world, direction[axis], ijk[axis] * spacing[axis])
        })
    }

    /// Continuous (unrounded) index of a world position
    pub fn world_to_index(&self, world: Point3) -> [f64; 3] {
        let VolumeGeometry {
            origin,
            spacing,
            direction,
        } = self.geometry;
        let offset = geometry::sub(world, origin);

        [
            geometry::dot(offset, direction[0]) / spacing[0],
            geometry::dot(offset, direction[1]) / spacing[1],
            geometry::dot(offset, direction[2]) / spacing[2],
        ]
    }

    /// Voxel index of a world position, rounded to the nearest voxel
    pub fn transform_world_to_index(&self, world: Point3) -> [i64; 3] {
        self.world_to_index(world).map(|v| v.round() as i64)
    }

    pub fn index_within_dimensions(&self, ijk: [i64; 3]) -> bool {
        let dimensions = self.dimensions();
        ijk.iter()
            .zip(dimensions)
            .all(|(&index, dim)| index >= 0 && (index as u64) < dim as u64)
    }

    /// Spacing between consecutive planes perpendicular to `normal`
    pub fn spacing_in_normal_direction(&self, normal: Point3) -> f64 {
        let VolumeGeometry {
            spacing, direction, ..
        } = self.geometry;

        let projected = [
            geometry::dot(direction[0], normal) * spacing[0],
            geometry::dot(direction[1], normal) * spacing[1],
            geometry::dot(direction[2], normal) * spacing[2],
        ];
        geometry::length(projected)
    }

    /// Enumerate every voxel in the inclusive `[min, max]` bounds per axis.
    ///
    /// Bounds are given in (i, j, k) order and clamped to the volume.
    pub fn points_in_bounds(&self, bounds: [[usize; 2]; 3]) -> Vec<VoxelPoint> {
        let dimensions = self.dimensions();
        if dimensions.contains(&0) {
            return Vec::new();
        }

        let [[i_min, i_max], [j_min, j_max], [k_min, k_max]] = bounds;
        let i_max = i_max.min(dimensions[0] - 1);
        let j_max = j_max.min(dimensions[1] - 1);
        let k_max = k_max.min(dimensions[2] - 1);
        if i_min > i_max || j_min > j_max || k_min > k_max {
            return Vec::new();
        }

        (k_min..=k_max)
            .into_par_iter()
            .flat_map_iter(|k| (j_min..=j_max).map(move |j| (k, j)))
            .flat_map_iter(|(k, j)| {
                (i_min..=i_max).map(move |i| VoxelPoint {
                    index: [i, j, k],
                    world: self.index_to_world([i as f64, j as f64, k as f64]),
                    value: self.data[[k, j, i]],
                })
            })
            .collect()
    }

    /// Acquired slice `k` as a (height, width) view
    pub fn get_slice(&self, k: usize) -> Option<ArrayView2<'_, u16>> {
        if k >= self.dim().0 {
            return None;
        }
        Some(self.data.slice(s![k, .., ..]))
    }

    /// Render slice `k` as an 8 bit grayscale image, windowed to the slice's
    /// own value range
    pub fn slice_to_image(&self, k: usize) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let slice = self.get_slice(k)?;
        let (height, width) = slice.dim();

        let (min, max) = slice
            .iter()
            .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = f32::from(max.saturating_sub(min)).max(1.0);

        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v.saturating_sub(min), range))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    #[inline]
    fn normalize_to_u8(value: u16, range: f32) -> u8 {
        ((f32::from(value) / range) * 255.0).clamp(0.0, 255.0) as u8
    }
}
