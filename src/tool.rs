//! Lifecycle of slice range rectangle annotations.
//!
//! An annotation is created by a click on the acquisition plane, drawn open
//! by dragging its last handle, and can afterwards be grabbed again by a
//! handle or as a whole:
//!
//! ```text
//! Idle -> Drawing -> Completed | Discarded
//!         Completed <-> Editing
//! ```
//!
//! Geometry changes only mark the annotation invalidated. The cached stats
//! are recomputed later through a throttle, triggered by the renderer, so
//! continuous dragging stays cheap.

use crate::annotation::{Annotation, AnnotationId, AnnotationMetadata, TOOL_NAME};
use crate::config::ToolConfiguration;
use crate::enums::ViewportKind;
use crate::error::ToolError;
use crate::events::{AnnotationEvent, AnnotationEventSink};
use crate::extraction;
use crate::geometry::{Point2, Point3};
use crate::projection;
use crate::rectangle::RectangleRoiTool;
use crate::state::{AnnotationStore, VolumeCache};
use crate::throttle::Throttle;
use crate::viewport::{Camera, ElementCursor, Viewport};

use web_time::Instant;

/// Everything a tool operation reads from or writes to outside the tool.
pub struct ToolContext<'a> {
    pub viewport: &'a dyn Viewport,
    pub store: &'a mut dyn AnnotationStore,
    pub volumes: &'a VolumeCache,
    pub events: &'a mut dyn AnnotationEventSink,
    pub cursor: &'a mut dyn ElementCursor,
    /// Time of the interaction, used by the stats throttle
    pub now: Instant,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        viewport: &'a dyn Viewport,
        store: &'a mut dyn AnnotationStore,
        volumes: &'a VolumeCache,
        events: &'a mut dyn AnnotationEventSink,
        cursor: &'a mut dyn ElementCursor,
    ) -> Self {
        Self {
            viewport,
            store,
            volumes,
            events,
            cursor,
            now: Instant::now(),
        }
    }

    /// Same context at an explicit point in time
    pub fn at(mut self, now: Instant) -> Self {
        self.now = now;
        self
    }
}

/// State of the annotation currently being drawn or edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditData {
    pub annotation_uid: AnnotationId,
    /// Grabbed handle, `None` when the whole annotation is being moved
    pub handle_index: Option<usize>,
    pub new_annotation: bool,
    pub has_moved: bool,
}

/// Rectangle tool that spans a range of slices from a start to an end slice.
///
/// Only works on the acquisition plane of a volume. The rectangle is drawn
/// solid with handles on the start and end slice and dashed in between.
#[derive(Debug)]
pub struct RectangleRoiStartEndTool {
    rectangle: RectangleRoiTool,
    configuration: ToolConfiguration,
    edit_data: Option<EditData>,
    is_drawing: bool,
    pub(crate) throttled_stats: Throttle<AnnotationId>,
}

impl Default for RectangleRoiStartEndTool {
    fn default() -> Self {
        Self::new(ToolConfiguration::default())
    }
}

impl RectangleRoiStartEndTool {
    pub fn new(configuration: ToolConfiguration) -> Self {
        Self {
            rectangle: RectangleRoiTool::new(configuration.handle_proximity),
            throttled_stats: Throttle::new(configuration.throttle_interval()),
            configuration,
            edit_data: None,
            is_drawing: false,
        }
    }

    pub fn tool_name(&self) -> &'static str {
        TOOL_NAME
    }

    pub fn configuration(&self) -> &ToolConfiguration {
        &self.configuration
    }

    pub fn edit_data(&self) -> Option<&EditData> {
        self.edit_data.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.is_drawing
    }

    /// Create an annotation at `world_pos` on the slice the viewport shows
    /// and start drawing it open with its last handle.
    ///
    /// # Errors
    ///
    /// Fails on stack viewports, when the camera does not look along the
    /// acquisition direction, when the viewport's volume is not cached, or
    /// when the viewport's slice does not match `world_pos`.
    pub fn add_new_annotation(
        &mut self,
        ctx: &mut ToolContext<'_>,
        world_pos: Point3,
    ) -> Result<AnnotationId, ToolError> {
        let volume_id = match ctx.viewport.kind() {
            ViewportKind::Stack => return Err(ToolError::NotSupportedOnStackViewport),
            ViewportKind::Volume { volume_id } => volume_id,
        };
        let volume = ctx
            .volumes
            .get_volume(&volume_id)
            .ok_or_else(|| ToolError::VolumeNotLoaded(volume_id.clone()))?;

        let Camera {
            view_plane_normal,
            view_up,
        } = ctx.viewport.camera();

        let referenced_image_id = projection::closest_image_id(volume, world_pos, view_plane_normal)
            .ok_or(ToolError::NoAcquisitionPlane(view_plane_normal))?
            .to_owned();

        let start_slice = ctx.viewport.current_image_id_index();
        let spacing_in_normal = volume.spacing_in_normal_direction(view_plane_normal);

        // Searched in world space: image order may run against the view
        // direction and the range must not leave the volume.
        let end_slice = projection::compute_end_slice_index(
            volume,
            world_pos,
            spacing_in_normal,
            view_plane_normal,
            self.configuration.num_slices_to_propagate,
        )
        .unwrap_or_else(|| {
            log::warn!(
                "No slice {} slices from {start_slice}, annotation covers its start slice only",
                self.configuration.num_slices_to_propagate
            );
            start_slice
        });

        let metadata = AnnotationMetadata {
            view_plane_normal,
            view_up,
            frame_of_reference_uid: ctx.viewport.frame_of_reference_uid().to_owned(),
            referenced_image_id,
            tool_name: TOOL_NAME.to_owned(),
            volume_id,
            spacing_in_normal,
        };

        let mut annotation = Annotation::new(metadata, world_pos, start_slice, end_slice);
        annotation.data.handles.points = RectangleRoiTool::initial_points(world_pos);
        projection::compute_projection_points(&mut annotation, volume)?;

        let annotation_uid = ctx.store.add_annotation(annotation);
        log::debug!("Created annotation {annotation_uid} on slices {start_slice}..={end_slice}");

        self.edit_data = Some(EditData {
            annotation_uid,
            handle_index: Some(3),
            new_annotation: true,
            has_moved: false,
        });
        self.is_drawing = true;
        ctx.cursor.hide();

        Ok(annotation_uid)
    }

    /// Grab one handle of an existing annotation
    pub fn handle_selected(
        &mut self,
        ctx: &mut ToolContext<'_>,
        annotation_uid: AnnotationId,
        handle_index: usize,
    ) -> Result<(), ToolError> {
        let annotation = ctx
            .store
            .annotation_mut(&annotation_uid)
            .ok_or(ToolError::AnnotationNotFound(annotation_uid))?;
        annotation.highlighted = true;
        annotation.data.handles.active_handle_index = Some(handle_index);

        self.start_edit(ctx, annotation_uid, Some(handle_index));
        Ok(())
    }

    /// Grab a whole annotation to move it
    pub fn tool_selected(
        &mut self,
        ctx: &mut ToolContext<'_>,
        annotation_uid: AnnotationId,
    ) -> Result<(), ToolError> {
        let annotation = ctx
            .store
            .annotation_mut(&annotation_uid)
            .ok_or(ToolError::AnnotationNotFound(annotation_uid))?;
        annotation.highlighted = true;

        self.start_edit(ctx, annotation_uid, None);
        Ok(())
    }

    fn start_edit(
        &mut self,
        ctx: &mut ToolContext<'_>,
        annotation_uid: AnnotationId,
        handle_index: Option<usize>,
    ) {
        self.edit_data = Some(EditData {
            annotation_uid,
            handle_index,
            new_annotation: false,
            has_moved: false,
        });
        ctx.cursor.hide();
    }

    /// Handle of annotation `annotation_uid` under `canvas_point`
    pub fn handle_near_point(
        &self,
        ctx: &ToolContext<'_>,
        annotation_uid: &AnnotationId,
        canvas_point: Point2,
    ) -> Option<usize> {
        let annotation = ctx.store.annotation(annotation_uid)?;
        self.rectangle
            .handle_near_point(&annotation.data.handles.points, ctx.viewport, canvas_point)
    }

    pub fn is_point_near_tool(
        &self,
        ctx: &ToolContext<'_>,
        annotation_uid: &AnnotationId,
        canvas_point: Point2,
    ) -> bool {
        ctx.store.annotation(annotation_uid).is_some_and(|annotation| {
            self.rectangle
                .is_point_near(&annotation.data.handles.points, ctx.viewport, canvas_point)
        })
    }

    /// Pointer moved while a handle or the whole annotation is grabbed.
    ///
    /// `world_pos` is the pointer position, `world_delta` its movement since
    /// the previous drag event.
    pub fn drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        world_pos: Point3,
        world_delta: Point3,
    ) -> Result<(), ToolError> {
        let Some(edit_data) = self.edit_data.as_mut() else {
            return Ok(());
        };
        let annotation_uid = edit_data.annotation_uid;
        let annotation = ctx
            .store
            .annotation_mut(&annotation_uid)
            .ok_or(ToolError::AnnotationNotFound(annotation_uid))?;
        let points = &mut annotation.data.handles.points;

        let moved = match edit_data.handle_index {
            Some(handle_index) => {
                self.rectangle
                    .move_handle(points, handle_index, world_pos, ctx.viewport)
            }
            None => {
                RectangleRoiTool::translate(points, world_delta);
                true
            }
        };

        if moved {
            annotation.invalidated = true;
            edit_data.has_moved = true;
            self.throttled_stats.request(annotation_uid);
        }
        Ok(())
    }

    /// Pointer released: finish drawing or editing.
    ///
    /// A new annotation that was never dragged open is discarded without
    /// notification. New annotations that were drawn emit `Completed`.
    pub fn end_interaction(&mut self, ctx: &mut ToolContext<'_>) -> Result<(), ToolError> {
        let Some(edit_data) = self.edit_data.take() else {
            return Ok(());
        };
        let annotation_uid = edit_data.annotation_uid;
        self.is_drawing = false;
        ctx.cursor.reset();

        if edit_data.new_annotation && !edit_data.has_moved {
            self.discard(ctx, annotation_uid);
            return Ok(());
        }

        let Some(annotation) = ctx.store.annotation_mut(&annotation_uid) else {
            log::debug!("Annotation {annotation_uid} removed while being edited");
            return Ok(());
        };
        annotation.data.handles.active_handle_index = None;
        annotation.highlighted = false;

        // Judged on the handles as released, the cached stats may still be
        // waiting for the throttle
        let handle_outside_image = ctx
            .volumes
            .get_volume(&annotation.metadata.volume_id)
            .is_some_and(|volume| extraction::handles_outside_volume(annotation, volume));

        if handle_outside_image && self.configuration.prevent_handle_outside_image {
            log::debug!("Removing annotation {annotation_uid}, handle outside image");
            ctx.store.remove_annotation(&annotation_uid);
            ctx.events.emit(AnnotationEvent::Removed { annotation_uid });
            return Ok(());
        }

        if self.configuration.calculate_points_inside_volume {
            self.compute_points_inside_volume(ctx, annotation_uid)?;
        }

        if edit_data.new_annotation {
            ctx.events.emit(AnnotationEvent::Completed { annotation_uid });
        }
        Ok(())
    }

    /// Abort the current interaction. An annotation still being drawn is
    /// removed, an edited one keeps its current geometry.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) -> Option<AnnotationId> {
        let edit_data = self.edit_data.take()?;
        let annotation_uid = edit_data.annotation_uid;
        self.is_drawing = false;
        ctx.cursor.reset();

        if edit_data.new_annotation {
            self.discard(ctx, annotation_uid);
        } else if let Some(annotation) = ctx.store.annotation_mut(&annotation_uid) {
            annotation.data.handles.active_handle_index = None;
            annotation.highlighted = false;
        }
        Some(annotation_uid)
    }

    fn discard(&mut self, ctx: &mut ToolContext<'_>, annotation_uid: AnnotationId) {
        log::debug!("Discarding annotation {annotation_uid}, it was never drawn open");
        ctx.store.remove_annotation(&annotation_uid);
        self.throttled_stats.cancel();
    }

    fn compute_points_inside_volume(
        &mut self,
        ctx: &mut ToolContext<'_>,
        annotation_uid: AnnotationId,
    ) -> Result<(), ToolError> {
        let stale = ctx
            .store
            .annotation(&annotation_uid)
            .is_some_and(|annotation| annotation.invalidated);
        if stale {
            // Extraction reads the projection, which has to match the
            // final geometry
            self.calculate_cached_stats(ctx, annotation_uid)?;
        }

        let Some(annotation) = ctx.store.annotation_mut(&annotation_uid) else {
            return Ok(());
        };
        let volume = ctx.volumes.get_volume(&annotation.metadata.volume_id);
        if extraction::compute_points_inside_volume(annotation, volume) {
            log::debug!("Annotation {annotation_uid} reaches beyond the volume, outside slices skipped");
        }
        Ok(())
    }

    /// Recompute the projection of an annotation and clear its invalidated
    /// flag.
    ///
    /// Returns `Ok(false)` without doing anything when the annotation has been
    /// removed or its volume is no longer cached.
    pub fn calculate_cached_stats(
        &mut self,
        ctx: &mut ToolContext<'_>,
        annotation_uid: AnnotationId,
    ) -> Result<bool, ToolError> {
        let Some(annotation) = ctx.store.annotation_mut(&annotation_uid) else {
            log::debug!("Skipping stats of removed annotation {annotation_uid}");
            return Ok(false);
        };
        let Some(volume) = ctx.volumes.get_volume(&annotation.metadata.volume_id) else {
            log::debug!(
                "Skipping stats of annotation {annotation_uid}, volume {} is not cached",
                annotation.metadata.volume_id
            );
            return Ok(false);
        };

        projection::compute_projection_points(annotation, volume)?;

        annotation.invalidated = false;
        ctx.events.emit(AnnotationEvent::Modified {
            annotation_uid,
            viewport_id: ctx.viewport.id().to_owned(),
        });
        Ok(true)
    }

    /// Run the pending stats recomputation if the throttle interval allows.
    /// Hosts call this on every turn of their loop.
    pub fn poll_throttled(&mut self, ctx: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        match self.throttled_stats.poll(ctx.now) {
            Some(annotation_uid) => self.calculate_cached_stats(ctx, annotation_uid),
            None => Ok(false),
        }
    }

    /// Change how many slices new annotations span and re-derive the end
    /// slice of the existing ones in the viewport's frame of reference.
    pub fn set_num_slices_to_propagate(&mut self, ctx: &mut ToolContext<'_>, num_slices: u32) {
        self.configuration.num_slices_to_propagate = num_slices;

        let frame_of_reference_uid = ctx.viewport.frame_of_reference_uid();
        for annotation_uid in ctx.store.annotation_ids(TOOL_NAME, frame_of_reference_uid) {
            let Some(annotation) = ctx.store.annotation_mut(&annotation_uid) else {
                continue;
            };
            let Some(volume) = ctx.volumes.get_volume(&annotation.metadata.volume_id) else {
                continue;
            };

            let metadata = &annotation.metadata;
            let end_slice = projection::compute_end_slice_index(
                volume,
                annotation.data.handles.points[0],
                metadata.spacing_in_normal,
                metadata.view_plane_normal,
                num_slices,
            )
            .unwrap_or(annotation.data.start_slice);
            annotation.set_end_slice(end_slice);
        }
    }
}
