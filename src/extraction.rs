//! Voxels enclosed by the projected rectangles.
//!
//! For every projected slice the rectangle's diagonal corners are turned into
//! a voxel bounding box on that slice and all voxels in the box are
//! enumerated. Cost is the number of slices times the rectangle area, so this
//! only runs when the tool is configured for it.

use crate::annotation::Annotation;
use crate::volume::{ImageVolume, VoxelPoint};

#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// One point set per projected slice that lies inside the volume
    pub points_in_volume: Vec<Vec<VoxelPoint>>,
    /// Set when at least one projected slice fell outside the volume
    pub outside_image: bool,
}

/// Inclusive voxel bounds (i, j, k) of the annotation rectangle on the slice
/// `projected_point` lies on, or `None` if a corner is outside the volume.
///
/// Corners snap to the nearest voxel, so projected positions that drift
/// slightly below a slice still land on it.
pub fn slice_bounds(
    annotation: &Annotation,
    volume: &ImageVolume,
    projected_point: [f64; 3],
) -> Option<[[usize; 2]; 3]> {
    let points = &annotation.data.handles.points;
    let [_, _, k] = volume.transform_world_to_index(projected_point);

    let corner = |world| {
        let [i, j, _] = volume.transform_world_to_index(world);
        [i, j, k]
    };
    let first = corner(points[0]);
    let second = corner(points[3]);

    if !volume.index_within_dimensions(first) || !volume.index_within_dimensions(second) {
        return None;
    }

    // Both corners are inside, so every component is non-negative
    Some(std::array::from_fn(|axis| {
        let (a, b) = (first[axis] as usize, second[axis] as usize);
        [a.min(b), a.max(b)]
    }))
}

/// Whether any handle of `annotation` lies outside `volume`
pub fn handles_outside_volume(annotation: &Annotation, volume: &ImageVolume) -> bool {
    annotation
        .data
        .handles
        .points
        .iter()
        .any(|&point| !volume.index_within_dimensions(volume.transform_world_to_index(point)))
}

/// Enumerate the voxels inside every projected rectangle of `annotation`.
///
/// A missing volume (e.g. evicted from the cache) yields nothing and is not
/// an error, neither are slices outside the volume.
pub fn points_inside_volume(
    annotation: &Annotation,
    volume: Option<&ImageVolume>,
) -> ExtractionOutcome {
    let mut outcome = ExtractionOutcome::default();
    let Some(volume) = volume else {
        log::debug!(
            "Volume {} not available, skipping point extraction",
            annotation.metadata.volume_id
        );
        return outcome;
    };

    for rectangle in annotation.data.cached_stats.projection_points() {
        match slice_bounds(annotation, volume, rectangle[0]) {
            Some(bounds) => outcome
                .points_in_volume
                .push(volume.points_in_bounds(bounds)),
            None => {
                log::trace!("Projected rectangle outside volume, skipping slice");
                outcome.outside_image = true;
            }
        }
    }

    outcome
}

/// Store the enclosed point sets on the annotation.
///
/// Returns whether any projected slice was outside the image.
pub fn compute_points_inside_volume(
    annotation: &mut Annotation,
    volume: Option<&ImageVolume>,
) -> bool {
    let ExtractionOutcome {
        points_in_volume,
        outside_image,
    } = points_inside_volume(annotation, volume);
    annotation.data.cached_stats.points_in_volume = points_in_volume;
    outside_image
}
