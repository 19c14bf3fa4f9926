//! Editing of a four corner rectangle in canvas space.
//!
//! Shared by every rectangle based tool. Corners are stored in world space;
//! keeping the rectangle axis aligned is done in canvas space so it follows
//! the viewport's orientation.

use crate::geometry::{self, Point2, Point3};
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleRoiTool {
    /// Canvas distance within which a handle or edge is hit
    pub handle_proximity: f64,
}

impl RectangleRoiTool {
    pub fn new(handle_proximity: f64) -> Self {
        Self { handle_proximity }
    }

    /// Corners of a rectangle that has not been opened yet
    pub fn initial_points(world_pos: Point3) -> [Point3; 4] {
        [world_pos; 4]
    }

    /// Move one corner to `world_pos` and re-derive the two neighbouring
    /// corners so the rectangle stays axis aligned on the canvas.
    ///
    /// Returns false for an unknown handle index.
    pub fn move_handle(
        &self,
        points: &mut [Point3; 4],
        handle_index: usize,
        world_pos: Point3,
        viewport: &dyn Viewport,
    ) -> bool {
        let Some(handle) = points.get_mut(handle_index) else {
            log::warn!("Ignoring drag of unknown handle {handle_index}");
            return false;
        };
        *handle = world_pos;

        match handle_index {
            0 | 3 => {
                let first = viewport.world_to_canvas(points[0]);
                let last = viewport.world_to_canvas(points[3]);
                points[1] = viewport.canvas_to_world([last[0], first[1]]);
                points[2] = viewport.canvas_to_world([first[0], last[1]]);
            }
            _ => {
                let second = viewport.world_to_canvas(points[1]);
                let third = viewport.world_to_canvas(points[2]);
                points[0] = viewport.canvas_to_world([third[0], second[1]]);
                points[3] = viewport.canvas_to_world([second[0], third[1]]);
            }
        }
        true
    }

    /// Move the whole rectangle by a world space delta
    pub fn translate(points: &mut [Point3; 4], delta: Point3) {
        for point in points.iter_mut() {
            *point = geometry::add(*point, delta);
        }
    }

    pub fn canvas_corners(points: &[Point3; 4], viewport: &dyn Viewport) -> [Point2; 4] {
        points.map(|point| viewport.world_to_canvas(point))
    }

    /// Index of the handle within reach of `canvas_point`
    pub fn handle_near_point(
        &self,
        points: &[Point3; 4],
        viewport: &dyn Viewport,
        canvas_point: Point2,
    ) -> Option<usize> {
        Self::canvas_corners(points, viewport)
            .iter()
            .position(|corner| {
                (corner[0] - canvas_point[0]).hypot(corner[1] - canvas_point[1])
                    < self.handle_proximity
            })
    }

    /// Whether `canvas_point` is within reach of one of the rectangle's edges
    pub fn is_point_near(
        &self,
        points: &[Point3; 4],
        viewport: &dyn Viewport,
        canvas_point: Point2,
    ) -> bool {
        let first = viewport.world_to_canvas(points[0]);
        let last = viewport.world_to_canvas(points[3]);
        let corners = [
            first,
            [last[0], first[1]],
            last,
            [first[0], last[1]],
        ];

        (0..4).any(|edge| {
            let distance =
                geometry::distance_to_segment(corners[edge], corners[(edge + 1) % 4], canvas_point);
            distance < self.handle_proximity
        })
    }
}
