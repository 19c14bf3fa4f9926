//! Projection of a start slice rectangle through the slice range.
//!
//! A rectangle drawn on the start slice is translated along the view plane
//! normal in steps of one slice spacing until it reaches the end slice. Each
//! translated rectangle is then matched to the acquired image it lies on.

use crate::annotation::Annotation;
use crate::error::ToolError;
use crate::geometry::{self, Point3};
use crate::volume::ImageVolume;

/// Tolerance for the view plane normal to count as the acquisition normal
const ACQUISITION_PLANE_EPSILON: f64 = 1e-4;

/// Index of the image whose plane lies within half a slice spacing of
/// `world_pos` along `normal`.
///
/// Images are scanned in stored order and the last qualifying one is
/// returned, so with overlapping tolerances the later image wins.
pub fn closest_image_index(
    volume: &ImageVolume,
    world_pos: Point3,
    normal: Point3,
    spacing_in_normal: f64,
) -> Option<usize> {
    let half_spacing = spacing_in_normal / 2.0;

    volume
        .image_planes()
        .iter()
        .enumerate()
        .filter(|(_, plane)| {
            let dir = geometry::sub(world_pos, plane.image_position_patient);
            geometry::dot(dir, normal).abs() < half_spacing
        })
        .map(|(index, _)| index)
        .last()
}

/// Id of the image `world_pos` lies on when viewed along `normal`.
///
/// Returns `None` if `normal` is not the acquisition direction of the
/// volume (an oblique or orthogonal reslice) or if no image is close enough.
pub fn closest_image_id<'a>(
    volume: &'a ImageVolume,
    world_pos: Point3,
    normal: Point3,
) -> Option<&'a str> {
    let k_axis = volume.geometry.direction[2];
    if geometry::dot(k_axis, normal).abs() < 1.0 - ACQUISITION_PLANE_EPSILON {
        return None;
    }

    let spacing_in_normal = volume.spacing_in_normal_direction(normal);
    let index = closest_image_index(volume, world_pos, normal, spacing_in_normal)?;
    Some(volume.image_planes()[index].image_id.as_str())
}

/// Index of the slice `num_slices_to_propagate` slices away from
/// `world_pos` in the direction of `view_plane_normal`.
///
/// Works in world space so it follows the view direction whichever way the
/// images are stored. Returns `None` when the target lies beyond the volume.
pub fn compute_end_slice_index(
    volume: &ImageVolume,
    world_pos: Point3,
    spacing_in_normal: f64,
    view_plane_normal: Point3,
    num_slices_to_propagate: u32,
) -> Option<usize> {
    let end_pos = geometry::scale_and_add(
        world_pos,
        view_plane_normal,
        f64::from(num_slices_to_propagate) * spacing_in_normal,
    );

    closest_image_index(volume, end_pos, view_plane_normal, spacing_in_normal)
}

/// Rectangles translated along the normal, one per slice step.
///
/// Produced lazily; the value can be iterated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSteps {
    points: [Point3; 4],
    normal: Point3,
    spacing: f64,
    count: usize,
}

impl ProjectionSteps {
    /// Steps at offsets `0, spacing, 2 * spacing, ...` strictly below
    /// `distance`, always including offset zero
    pub fn new(points: [Point3; 4], normal: Point3, spacing: f64, distance: f64) -> Self {
        let count = if spacing > 0.0 && distance > 0.0 {
            ((distance / spacing).ceil() as usize).max(1)
        } else {
            1
        };

        Self {
            points,
            normal,
            spacing,
            count,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = [Point3; 4]> + '_ {
        (0..self.count).map(move |step| {
            let offset = step as f64 * self.spacing;
            self.points
                .map(|point| geometry::scale_and_add(point, self.normal, offset))
        })
    }
}

/// Build the projection steps of an annotation within `volume`.
///
/// # Errors
///
/// Returns [`ToolError::GeometryMismatch`] if the first corner no longer lies
/// on the annotation's start slice.
pub fn projection_steps(
    annotation: &Annotation,
    volume: &ImageVolume,
) -> Result<ProjectionSteps, ToolError> {
    let points = annotation.data.handles.points;
    let start_slice = annotation.data.start_slice;

    let start_ijk = volume.transform_world_to_index(points[0]);
    if usize::try_from(start_ijk[2]).ok() != Some(start_slice) {
        return Err(ToolError::GeometryMismatch {
            expected: start_slice,
            actual: start_ijk[2],
        });
    }

    let start_index = start_ijk.map(|v| v as f64);
    let end_index = [
        start_index[0],
        start_index[1],
        annotation.data.end_slice as f64,
    ];
    let distance = geometry::distance(
        volume.index_to_world(start_index),
        volume.index_to_world(end_index),
    );

    Ok(ProjectionSteps::new(
        points,
        annotation.metadata.view_plane_normal,
        annotation.metadata.spacing_in_normal,
        distance,
    ))
}

/// Recompute the projected rectangles and their image ids.
///
/// Only the projection part of the cached stats is written.
pub fn compute_projection_points(
    annotation: &mut Annotation,
    volume: &ImageVolume,
) -> Result<(), ToolError> {
    let steps = projection_steps(annotation, volume)?;
    let normal = annotation.metadata.view_plane_normal;

    let projection = steps
        .iter()
        .map(|rectangle| {
            let image_id = closest_image_id(volume, rectangle[0], normal).map(str::to_owned);
            (rectangle, image_id)
        })
        .collect();

    annotation.data.cached_stats.set_projection(projection);
    log::trace!(
        "Projected annotation {} onto {} slices",
        annotation.annotation_uid,
        steps.len()
    );
    Ok(())
}
