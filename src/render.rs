//! Slice aware drawing of the annotations.
//!
//! What an annotation looks like on a slice is decided by [`plan_annotation`]
//! without touching any surface; the tool then draws the plans.

use crate::annotation::{Annotation, AnnotationId, TOOL_NAME};
use crate::drawing::{DrawingSurface, HandleStyle, RectStyle};
use crate::enums::{SliceRole, StrokeStyle};
use crate::geometry::{self, Point3};
use crate::tool::{RectangleRoiStartEndTool, ToolContext};

/// Normals closer than this to parallel count as the same view
const SAME_VIEW_EPSILON: f64 = 1e-3;

/// How one annotation is drawn on one slice
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPlan {
    pub role: SliceRole,
    pub stroke: StrokeStyle,
    /// Diagonal corners of the rectangle, `points[0]` and `points[3]`
    pub corners: [Point3; 2],
    pub active_handle: Option<Point3>,
}

/// Decide how `annotation` appears on `slice_index`.
///
/// Returns `None` outside the annotation's slice range. A handle is only
/// shown on boundary slices, for unlocked annotations and while no edit is
/// in progress.
pub fn plan_annotation(
    annotation: &Annotation,
    slice_index: usize,
    editing: bool,
    locked: bool,
) -> Option<DrawPlan> {
    let role = annotation.slice_role(slice_index)?;
    let points = &annotation.data.handles.points;

    let (stroke, active_handle) = match role {
        SliceRole::Boundary => {
            let active_handle = annotation
                .data
                .handles
                .active_handle_index
                .filter(|_| !locked && !editing)
                .and_then(|index| points.get(index).copied());
            (StrokeStyle::Solid, active_handle)
        }
        SliceRole::Interior => (StrokeStyle::Dashed, None),
    };

    Some(DrawPlan {
        role,
        stroke,
        corners: [points[0], points[3]],
        active_handle,
    })
}

impl RectangleRoiStartEndTool {
    /// Draw every annotation of this tool that is visible on the viewport's
    /// current slice.
    ///
    /// Invalidated annotations schedule a recompute of their stats and are
    /// drawn with their current geometry in the meantime. Returns whether
    /// anything was drawn.
    pub fn render_annotations(
        &mut self,
        ctx: &mut ToolContext<'_>,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        let slice_index = ctx.viewport.current_image_id_index();
        let view_plane_normal = ctx.viewport.camera().view_plane_normal;
        let annotation_ids = ctx
            .store
            .annotation_ids(TOOL_NAME, ctx.viewport.frame_of_reference_uid());

        let mut render_status = false;

        for annotation_uid in annotation_ids {
            let Some(annotation) = ctx.store.annotation(&annotation_uid) else {
                continue;
            };
            let same_view = geometry::dot(annotation.metadata.view_plane_normal, view_plane_normal)
                .abs()
                >= 1.0 - SAME_VIEW_EPSILON;
            if !same_view || !annotation.slice_range().contains(&slice_index) {
                continue;
            }

            if annotation.invalidated {
                self.throttled_stats.request(annotation_uid);
                if let Err(err) = self.poll_throttled(ctx) {
                    log::debug!("Could not recompute stats of annotation {annotation_uid}: {err}");
                }
            }

            if !ctx.viewport.has_rendering_engine() {
                log::warn!("Rendering engine has been destroyed, aborting frame");
                return render_status;
            }

            if !ctx.store.is_visible(&annotation_uid) {
                continue;
            }

            let editing = self.edit_data().is_some();
            let locked = ctx.store.is_locked(&annotation_uid);
            // The recompute above may have removed it
            let Some(plan) = ctx
                .store
                .annotation(&annotation_uid)
                .and_then(|annotation| plan_annotation(annotation, slice_index, editing, locked))
            else {
                continue;
            };

            self.draw_plan(ctx, surface, &annotation_uid, &plan);
            render_status = true;
        }

        render_status
    }

    fn draw_plan(
        &self,
        ctx: &ToolContext<'_>,
        surface: &mut dyn DrawingSurface,
        annotation_uid: &AnnotationId,
        plan: &DrawPlan,
    ) {
        let style = &self.configuration().style;
        let line_dash = match plan.stroke {
            StrokeStyle::Solid => style.line_dash,
            StrokeStyle::Dashed => Some(style.interior_line_dash),
        };
        let rect_style = RectStyle {
            color: style.color,
            line_width: style.line_width,
            line_dash,
        };

        let [first, last] = plan.corners.map(|corner| ctx.viewport.world_to_canvas(corner));
        surface.draw_rect(annotation_uid, "0", first, last, &rect_style);

        if let Some(handle) = plan.active_handle {
            let handle_style = HandleStyle {
                color: style.color,
                handle_radius: style.handle_radius,
            };
            let canvas = ctx.viewport.world_to_canvas(handle);
            surface.draw_handles(annotation_uid, "0", &[canvas], &handle_style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AnnotationStore;
    use crate::test_support::{Harness, RecordingSurface, test_annotation};
    use std::time::Duration;

    fn stored_annotation(harness: &mut Harness) -> AnnotationId {
        let mut annotation = test_annotation([2.0, 3.0, 4.0], [6.0, 7.0, 4.0], 2, 6);
        annotation.invalidated = false;
        harness.store.add_annotation(annotation)
    }

    #[test]
    fn test_plan_per_slice_role() {
        let mut annotation = test_annotation([2.0, 3.0, 4.0], [6.0, 7.0, 4.0], 6, 2);
        annotation.data.handles.active_handle_index = Some(3);

        assert_eq!(plan_annotation(&annotation, 1, false, false), None);
        assert_eq!(plan_annotation(&annotation, 7, false, false), None);

        let boundary = plan_annotation(&annotation, 2, false, false).unwrap();
        assert_eq!(boundary.stroke, StrokeStyle::Solid);
        assert_eq!(boundary.active_handle, Some([6.0, 7.0, 4.0]));
        assert_eq!(boundary.corners, [[2.0, 3.0, 4.0], [6.0, 7.0, 4.0]]);

        let interior = plan_annotation(&annotation, 4, false, false).unwrap();
        assert_eq!(interior.role, SliceRole::Interior);
        assert_eq!(interior.stroke, StrokeStyle::Dashed);
        assert_eq!(interior.active_handle, None);
    }

    #[test]
    fn test_plan_hides_handle_when_locked_or_editing() {
        let mut annotation = test_annotation([2.0, 3.0, 4.0], [6.0, 7.0, 4.0], 2, 6);
        annotation.data.handles.active_handle_index = Some(0);
        assert!(plan_annotation(&annotation, 6, false, false).unwrap().active_handle.is_some());
        assert!(plan_annotation(&annotation, 6, true, false).unwrap().active_handle.is_none());
        assert!(plan_annotation(&annotation, 6, false, true).unwrap().active_handle.is_none());
    }

    #[test]
    fn test_boundary_and_interior_strokes() {
        let mut harness = Harness::new();
        let id = stored_annotation(&mut harness);
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(tool.render_annotations(&mut harness.ctx(), &mut surface));
        assert_eq!(surface.rects.len(), 1);
        let rect = &surface.rects[0];
        assert_eq!(rect.annotation_uid, id);
        assert_eq!(rect.start, [20.0, 30.0]);
        assert_eq!(rect.end, [60.0, 70.0]);
        assert_eq!(rect.style.line_dash, None);

        harness.viewport.current_index = 4;
        let mut surface = RecordingSurface::default();
        assert!(tool.render_annotations(&mut harness.ctx(), &mut surface));
        assert_eq!(surface.rects[0].style.line_dash, Some(2.0));
        assert!(surface.handles.is_empty());
    }

    #[test]
    fn test_nothing_outside_range() {
        let mut harness = Harness::new();
        stored_annotation(&mut harness);
        harness.viewport.current_index = 7;
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(!tool.render_annotations(&mut harness.ctx(), &mut surface));
        assert!(surface.rects.is_empty());
    }

    #[test]
    fn test_hidden_annotation_is_skipped() {
        let mut harness = Harness::new();
        let id = stored_annotation(&mut harness);
        harness.store.set_visible(id, false);
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(!tool.render_annotations(&mut harness.ctx(), &mut surface));
    }

    #[test]
    fn test_torn_down_viewport_aborts_frame() {
        let mut harness = Harness::new();
        stored_annotation(&mut harness);
        harness.viewport.alive = false;
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(!tool.render_annotations(&mut harness.ctx(), &mut surface));
        assert!(surface.rects.is_empty());
    }

    #[test]
    fn test_invalidated_annotation_schedules_recompute() {
        let mut harness = Harness::new();
        let id = stored_annotation(&mut harness);
        harness.store.annotation_mut(&id).unwrap().invalidated = true;
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(tool.render_annotations(&mut harness.ctx(), &mut surface));
        let annotation = harness.store.annotation(&id).unwrap();
        assert!(!annotation.invalidated);
        assert_eq!(annotation.data.cached_stats.projection_points().len(), 4);

        // A second invalidation within the interval waits for the throttle
        harness.store.annotation_mut(&id).unwrap().invalidated = true;
        harness.now += Duration::from_millis(10);
        assert!(tool.render_annotations(&mut harness.ctx(), &mut surface));
        assert!(harness.store.annotation(&id).unwrap().invalidated);
        assert_eq!(surface.rects.len(), 2);
    }

    #[test]
    fn test_handle_drawn_on_boundary_only_when_idle() {
        let mut harness = Harness::new();
        let id = stored_annotation(&mut harness);
        harness
            .store
            .annotation_mut(&id)
            .unwrap()
            .data
            .handles
            .active_handle_index = Some(3);
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        tool.render_annotations(&mut harness.ctx(), &mut surface);
        assert_eq!(surface.handles, vec![vec![[60.0, 70.0]]]);

        harness.store.set_locked(id, true);
        let mut surface = RecordingSurface::default();
        tool.render_annotations(&mut harness.ctx(), &mut surface);
        assert!(surface.handles.is_empty());
    }

    #[test]
    fn test_other_view_direction_is_not_drawn() {
        let mut harness = Harness::new();
        stored_annotation(&mut harness);
        harness.viewport.normal = [1.0, 0.0, 0.0];
        let mut tool = RectangleRoiStartEndTool::default();

        let mut surface = RecordingSurface::default();
        assert!(!tool.render_annotations(&mut harness.ctx(), &mut surface));
    }
}
