//! Fixtures shared by the unit tests.

use crate::annotation::{Annotation, AnnotationId, AnnotationMetadata, TOOL_NAME};
use crate::drawing::{DrawingSurface, HandleStyle, RectStyle};
use crate::enums::ViewportKind;
use crate::events::AnnotationEvent;
use crate::geometry::{Point2, Point3};
use crate::state::{InMemoryAnnotationStore, VolumeCache};
use crate::tool::ToolContext;
use crate::viewport::{Camera, ElementCursor, Viewport};
use crate::volume::{ImageVolume, VolumeGeometry};

use ndarray::Array3;
use web_time::Instant;

/// 10 x 8 x 20 voxels (i, j, k) with a slice spacing of 2, so image `k`
/// lies at z = 2k. Voxel values are `i + 10 j + 100 k`.
pub fn test_volume() -> ImageVolume {
    let data = Array3::from_shape_fn((20, 8, 10), |(k, j, i)| (i + 10 * j + 100 * k) as u16);
    let geometry = VolumeGeometry {
        spacing: [1.0, 1.0, 2.0],
        ..VolumeGeometry::default()
    };
    let image_ids = (0..20).map(|k| format!("image-{k}")).collect();

    ImageVolume::new("test-volume", data, geometry, image_ids).expect("valid test volume")
}

pub fn test_metadata() -> AnnotationMetadata {
    AnnotationMetadata {
        view_plane_normal: [0.0, 0.0, 1.0],
        view_up: [0.0, -1.0, 0.0],
        frame_of_reference_uid: "for-1".to_string(),
        referenced_image_id: "image-2".to_string(),
        tool_name: TOOL_NAME.to_string(),
        volume_id: "test-volume".to_string(),
        spacing_in_normal: 2.0,
    }
}

/// Annotation with diagonal corners `first` and `last` on one slice
pub fn test_annotation(first: Point3, last: Point3, start: usize, end: usize) -> Annotation {
    let mut annotation = Annotation::new(test_metadata(), first, start, end);
    annotation.data.handles.points = [
        first,
        [last[0], first[1], first[2]],
        [first[0], last[1], first[2]],
        last,
    ];
    annotation
}

/// 10 x 8 x 60 voxels with an origin and spacing that are not exactly
/// representable, so slice positions accumulate rounding error
pub fn offset_volume() -> ImageVolume {
    let data = Array3::from_shape_fn((60, 8, 10), |(k, j, i)| (i + 10 * j + 100 * k) as u16);
    let geometry = VolumeGeometry {
        origin: [-3.25, -2.5, -112.35],
        spacing: [0.5, 0.5, 0.7],
        ..VolumeGeometry::default()
    };
    let image_ids = (0..60).map(|k| format!("image-{k}")).collect();

    ImageVolume::new("offset-volume", data, geometry, image_ids).expect("valid offset volume")
}

/// Annotation on [`offset_volume`] with diagonal corners given as (i, j)
/// voxel indices on slice `start`
pub fn offset_annotation(first: [f64; 2], last: [f64; 2], start: usize, end: usize) -> Annotation {
    let volume = offset_volume();
    let k = start as f64;
    let first = volume.index_to_world([first[0], first[1], k]);
    let last = volume.index_to_world([last[0], last[1], k]);

    let mut annotation = test_annotation(first, last, start, end);
    annotation.metadata.volume_id = volume.volume_id.clone();
    annotation.metadata.referenced_image_id = format!("image-{start}");
    annotation.metadata.spacing_in_normal = 0.7;
    annotation
}

/// Axial viewport onto [`test_volume`], ten canvas pixels per world unit
pub struct FakeViewport {
    pub kind: ViewportKind,
    pub normal: Point3,
    pub current_index: usize,
    pub alive: bool,
}

impl FakeViewport {
    pub fn volume(current_index: usize) -> Self {
        Self {
            kind: ViewportKind::Volume {
                volume_id: "test-volume".to_string(),
            },
            normal: [0.0, 0.0, 1.0],
            current_index,
            alive: true,
        }
    }
}

impl Viewport for FakeViewport {
    fn id(&self) -> &str {
        "viewport-1"
    }

    fn kind(&self) -> ViewportKind {
        self.kind.clone()
    }

    fn camera(&self) -> Camera {
        Camera {
            view_plane_normal: self.normal,
            view_up: [0.0, -1.0, 0.0],
        }
    }

    fn current_image_id_index(&self) -> usize {
        self.current_index
    }

    fn frame_of_reference_uid(&self) -> &str {
        "for-1"
    }

    fn world_to_canvas(&self, world: Point3) -> Point2 {
        [world[0] * 10.0, world[1] * 10.0]
    }

    fn canvas_to_world(&self, canvas: Point2) -> Point3 {
        [canvas[0] / 10.0, canvas[1] / 10.0, self.current_index as f64 * 2.0]
    }

    fn has_rendering_engine(&self) -> bool {
        self.alive
    }
}

#[derive(Debug, Default)]
pub struct FakeCursor {
    pub hidden: bool,
}

impl ElementCursor for FakeCursor {
    fn hide(&mut self) {
        self.hidden = true;
    }

    fn reset(&mut self) {
        self.hidden = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnRect {
    pub annotation_uid: AnnotationId,
    pub start: Point2,
    pub end: Point2,
    pub style: RectStyle,
}

/// Surface remembering what was drawn on it
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub rects: Vec<DrawnRect>,
    pub handles: Vec<Vec<Point2>>,
}

impl DrawingSurface for RecordingSurface {
    fn draw_rect(
        &mut self,
        annotation_uid: &AnnotationId,
        _rect_uid: &str,
        start: Point2,
        end: Point2,
        style: &RectStyle,
    ) {
        self.rects.push(DrawnRect {
            annotation_uid: *annotation_uid,
            start,
            end,
            style: style.clone(),
        });
    }

    fn draw_handles(
        &mut self,
        _annotation_uid: &AnnotationId,
        _handle_group_uid: &str,
        handles: &[Point2],
        _style: &HandleStyle,
    ) {
        self.handles.push(handles.to_vec());
    }
}

/// Host state a tool operates on: one viewport on slice 2 of
/// [`test_volume`] and an empty store
pub struct Harness {
    pub viewport: FakeViewport,
    pub store: InMemoryAnnotationStore,
    pub volumes: VolumeCache,
    pub events: Vec<AnnotationEvent>,
    pub cursor: FakeCursor,
    pub now: Instant,
}

impl Harness {
    pub fn new() -> Self {
        let mut volumes = VolumeCache::new();
        volumes.put_volume(test_volume());

        Self {
            viewport: FakeViewport::volume(2),
            store: InMemoryAnnotationStore::new(),
            volumes,
            events: Vec::new(),
            cursor: FakeCursor::default(),
            now: Instant::now(),
        }
    }

    pub fn ctx(&mut self) -> ToolContext<'_> {
        ToolContext::new(
            &self.viewport,
            &mut self.store,
            &self.volumes,
            &mut self.events,
            &mut self.cursor,
        )
        .at(self.now)
    }
}
