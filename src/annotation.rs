//! Slice range rectangle annotation and its derived statistics.

use std::ops::RangeInclusive;

use crate::enums::SliceRole;
use crate::geometry::Point3;
use crate::volume::VoxelPoint;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of an annotation, assigned at creation.
pub type AnnotationId = Uuid;

pub const TOOL_NAME: &str = "RectangleROIStartEndThreshold";

/// Snapshot of the viewing state the annotation was drawn in. Never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    pub view_plane_normal: Point3,
    pub view_up: Point3,
    pub frame_of_reference_uid: String,
    pub referenced_image_id: String,
    pub tool_name: String,
    pub volume_id: String,
    /// Distance between two slices along `view_plane_normal`
    pub spacing_in_normal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handles {
    /// Rectangle corners on the start slice. `points[0]` and `points[3]`
    /// are diagonal, as are `points[1]` and `points[2]`.
    pub points: [Point3; 4],
    pub active_handle_index: Option<usize>,
}

/// Derived data, recomputed from the handles whenever they change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedStats {
    projection_points: Vec<[Point3; 4]>,
    projection_points_image_ids: Vec<Option<String>>,
    pub points_in_volume: Vec<Vec<VoxelPoint>>,
}

impl CachedStats {
    /// One rectangle per sampled offset along the normal, starting on the
    /// start slice
    pub fn projection_points(&self) -> &[[Point3; 4]] {
        &self.projection_points
    }

    /// Image nearest to each entry of [`Self::projection_points`]
    pub fn projection_points_image_ids(&self) -> &[Option<String>] {
        &self.projection_points_image_ids
    }

    /// Replace the projection, keeping rectangles and image ids paired
    pub fn set_projection(&mut self, projection: Vec<([Point3; 4], Option<String>)>) {
        (self.projection_points, self.projection_points_image_ids) = projection.into_iter().unzip();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationData {
    pub label: String,
    pub start_slice: usize,
    pub end_slice: usize,
    pub handles: Handles,
    pub cached_stats: CachedStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub annotation_uid: AnnotationId,
    pub highlighted: bool,
    /// Set by every geometry change, cleared once the cached stats have
    /// been recomputed
    pub invalidated: bool,
    pub metadata: AnnotationMetadata,
    pub data: AnnotationData,
}

impl Annotation {
    /// A new, highlighted annotation with all four corners at `world_pos`
    pub fn new(
        metadata: AnnotationMetadata,
        world_pos: Point3,
        start_slice: usize,
        end_slice: usize,
    ) -> Self {
        Self {
            annotation_uid: Uuid::new_v4(),
            highlighted: true,
            invalidated: true,
            metadata,
            data: AnnotationData {
                label: String::new(),
                start_slice,
                end_slice,
                handles: Handles {
                    points: [world_pos; 4],
                    active_handle_index: None,
                },
                cached_stats: CachedStats::default(),
            },
        }
    }

    /// Slices the annotation is visible on, regardless of start/end order
    pub fn slice_range(&self) -> RangeInclusive<usize> {
        let AnnotationData {
            start_slice,
            end_slice,
            ..
        } = self.data;
        start_slice.min(end_slice)..=start_slice.max(end_slice)
    }

    pub fn slice_role(&self, slice_index: usize) -> Option<SliceRole> {
        if !self.slice_range().contains(&slice_index) {
            return None;
        }
        if slice_index == self.data.start_slice || slice_index == self.data.end_slice {
            Some(SliceRole::Boundary)
        } else {
            Some(SliceRole::Interior)
        }
    }

    /// All corners still at the same point, i.e. never dragged open
    pub fn is_degenerate(&self) -> bool {
        let [first, rest @ ..] = &self.data.handles.points;
        rest.iter().all(|point| point == first)
    }

    pub fn set_end_slice(&mut self, end_slice: usize) {
        if self.data.end_slice != end_slice {
            self.data.end_slice = end_slice;
            self.invalidated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_metadata;

    #[test]
    fn test_new_annotation_is_degenerate() {
        let annotation = Annotation::new(test_metadata(), [1.0, 2.0, 4.0], 2, 12);
        assert!(annotation.is_degenerate());
        assert!(annotation.invalidated);
        assert!(annotation.highlighted);
        assert_eq!(annotation.data.handles.active_handle_index, None);
        assert!(annotation.data.cached_stats.projection_points().is_empty());
    }

    #[test]
    fn test_slice_roles_in_either_order() {
        for (start, end) in [(2, 6), (6, 2)] {
            let annotation = Annotation::new(test_metadata(), [0.0; 3], start, end);
            assert_eq!(annotation.slice_range(), 2..=6);
            assert_eq!(annotation.slice_role(1), None);
            assert_eq!(annotation.slice_role(2), Some(SliceRole::Boundary));
            assert_eq!(annotation.slice_role(4), Some(SliceRole::Interior));
            assert_eq!(annotation.slice_role(6), Some(SliceRole::Boundary));
            assert_eq!(annotation.slice_role(7), None);
        }
    }

    #[test]
    fn test_set_projection_keeps_lengths_paired() {
        let mut stats = CachedStats::default();
        stats.set_projection(vec![
            ([[0.0; 3]; 4], Some("a".to_string())),
            ([[1.0; 3]; 4], None),
        ]);
        assert_eq!(stats.projection_points().len(), 2);
        assert_eq!(
            stats.projection_points_image_ids(),
            &[Some("a".to_string()), None]
        );
    }

    #[test]
    fn test_set_end_slice_invalidates_on_change() {
        let mut annotation = Annotation::new(test_metadata(), [0.0; 3], 2, 12);
        annotation.invalidated = false;
        annotation.set_end_slice(12);
        assert!(!annotation.invalidated);
        annotation.set_end_slice(8);
        assert!(annotation.invalidated);
        assert_eq!(annotation.data.end_slice, 8);
    }

    #[test]
    fn test_serde_roundtrip() {
        let annotation = Annotation::new(test_metadata(), [1.0, 2.0, 4.0], 2, 12);
        let json = serde_json::to_string(&annotation).unwrap();
        let restored: Annotation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, annotation);
    }
}
