//! # DICOM-roi library
//!
//! This crate provides a rectangle region of interest annotation that spans
//! a range of slices of a DICOM volume.

//!
//! A rectangle is drawn on one slice of a volume (the start slice) and is
//! projected along the viewing direction through a configurable number of
//! slices (the end slice). For every slice in between, the tool knows which
//! acquired image the rectangle lies on and can enumerate the voxels it
//! encloses. Volumes can be loaded from multiple
//! [`FileDicomObject<InMemDicomObject>`] or from a folder of ".dcm" files,
//! decoding the images in parallel using rayon.
//!
//! The tool is hosted by a rendering engine that owns the viewport, the
//! annotation store and the drawing layer. They are passed in through a
//! [`ToolContext`] on every call:
//!  - [`Viewport`] for the camera and world/canvas transforms
//!  - [`AnnotationStore`] for the annotations themselves
//!  - [`DrawingSurface`] for rendering the rectangles
//!  - [`AnnotationEventSink`] for `Modified`, `Completed` and `Removed`
//!    notifications
//!
//!  The tool only works on the acquisition plane of a volume viewport. DICOM
//!  files are assumed to have the following attributes:
//!   - No multiframe (always the first frame is used)
//!   - Images from the same series (Series Instance UID) and acquisition
//!     (Acquisition Number)
//!   - Image Position (Patient), Image Orientation (Patient) and Pixel
//!     Spacing present
//!
//! # Examples
//!
//! ## Drawing an annotation and rendering it
//!
//! Load all DICOM files from the dicom/ directory sorted along the slice
//! normal, draw a rectangle from a host loop and render the current slice
//! into an image.
//!
//! ```no_run
//! # use dicom_roi::{
//! #     AnnotationEvent, ImageSurface, InMemoryAnnotationStore, NoCursor, RectangleRoiStartEndTool, SortBy,
//! #     ToolConfiguration, ToolContext, Viewport, VolumeCache, VolumeLoader,
//! # };
//! # fn viewport() -> Box<dyn Viewport> { unimplemented!() }
//! let volume = VolumeLoader::load_from_directory("ct", "dicom", SortBy::ImagePositionPatient)
//!     .expect("should have loaded files from directory");
//! let mut volumes = VolumeCache::new();
//! volumes.put_volume(volume);
//!
//! let viewport = viewport();
//! let mut store = InMemoryAnnotationStore::new();
//! let mut events: Vec<AnnotationEvent> = Vec::new();
//! let mut cursor = NoCursor;
//! let mut tool = RectangleRoiStartEndTool::new(ToolConfiguration::default());
//!
//! let mut ctx = ToolContext::new(&*viewport, &mut store, &volumes, &mut events, &mut cursor);
//! tool.add_new_annotation(&mut ctx, [10.0, 10.0, 0.0])
//!     .expect("should have created annotation");
//! tool.drag(&mut ctx, [40.0, 30.0, 0.0], [30.0, 20.0, 0.0])
//!     .expect("should have moved handle");
//! tool.end_interaction(&mut ctx)
//!     .expect("should have completed annotation");
//!
//! let volume = volumes.get_volume("ct").expect("volume is cached");
//! let mut surface = ImageSurface::from_volume_slice(volume, viewport.current_image_id_index())
//!     .expect("slice exists");
//! let mut ctx = ToolContext::new(&*viewport, &mut store, &volumes, &mut events, &mut cursor);
//! tool.render_annotations(&mut ctx, &mut surface);
//! surface
//!     .into_image()
//!     .save("result.png")
//!     .expect("should have written image");
//! ```
//!
//! [`FileDicomObject<InMemDicomObject>`]: https://docs.rs/dicom-object/latest/dicom_object/struct.FileDicomObject.html

pub mod annotation;
pub mod config;
pub mod drawing;
pub mod enums;
pub mod error;
pub mod events;
pub mod extraction;
pub mod geometry;
pub mod projection;
pub mod rectangle;
pub mod render;
pub mod state;
pub mod throttle;
pub mod tool;
pub mod viewport;
pub mod volume;
pub mod volume_loader;

#[cfg(test)]
mod test_support;

pub use annotation::{Annotation, AnnotationId};
pub use config::{AnnotationStyle, ConfigError, ToolConfiguration};
pub use drawing::{DrawingSurface, ImageSurface, RasterSurfaceFactory, SurfaceFactory};
pub use enums::{SliceRole, SortBy, ViewportKind};
pub use error::ToolError;
pub use events::{AnnotationEvent, AnnotationEventSink};
pub use state::{AnnotationStore, InMemoryAnnotationStore, VolumeCache};
pub use tool::{RectangleRoiStartEndTool, ToolContext};
pub use viewport::{Camera, ElementCursor, NoCursor, Viewport};
pub use volume::ImageVolume;
pub use volume_loader::VolumeLoader;
