//! Interfaces of the rendering engine the tool is hosted in.
//!
//! The camera model, coordinate transforms and cursor handling belong to the
//! host; the tool only reads them through these traits.

use crate::enums::ViewportKind;
use crate::geometry::{Point2, Point3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Unit vector pointing out of the viewing plane
    pub view_plane_normal: Point3,
    pub view_up: Point3,
}

pub trait Viewport {
    fn id(&self) -> &str;

    fn kind(&self) -> ViewportKind;

    fn camera(&self) -> Camera;

    /// Index of the image currently shown, within the volume's image ids
    fn current_image_id_index(&self) -> usize;

    fn frame_of_reference_uid(&self) -> &str;

    fn world_to_canvas(&self, world: Point3) -> Point2;

    fn canvas_to_world(&self, canvas: Point2) -> Point3;

    /// False once the rendering engine owning this viewport has been
    /// destroyed. Drawing into a torn down viewport is skipped.
    fn has_rendering_engine(&self) -> bool {
        true
    }
}

/// Cursor of the element a viewport is attached to
pub trait ElementCursor {
    fn hide(&mut self);

    fn reset(&mut self);
}

/// Cursor for hosts without one, e.g. offscreen rendering
#[derive(Debug, Default)]
pub struct NoCursor;

impl ElementCursor for NoCursor {
    fn hide(&mut self) {}

    fn reset(&mut self) {}
}
