//! Annotation storage and the volume cache the tool reads from.

use std::collections::{HashMap, HashSet};

use crate::annotation::{Annotation, AnnotationId};
use crate::volume::ImageVolume;

/// Owner of annotation identity. The tool only keeps ids and looks
/// annotations up again on every operation, so removals by other parties are
/// always observed.
pub trait AnnotationStore {
    fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId;

    fn annotation(&self, annotation_uid: &AnnotationId) -> Option<&Annotation>;

    fn annotation_mut(&mut self, annotation_uid: &AnnotationId) -> Option<&mut Annotation>;

    fn remove_annotation(&mut self, annotation_uid: &AnnotationId) -> Option<Annotation>;

    /// Ids of the annotations of a tool within a frame of reference, in
    /// insertion order. Returned as an owned list so callers can mutate the
    /// store while walking it.
    fn annotation_ids(&self, tool_name: &str, frame_of_reference_uid: &str) -> Vec<AnnotationId>;

    fn is_locked(&self, annotation_uid: &AnnotationId) -> bool;

    fn is_visible(&self, annotation_uid: &AnnotationId) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryAnnotationStore {
    annotations: Vec<Annotation>,
    locked: HashSet<AnnotationId>,
    hidden: HashSet<AnnotationId>,
}

impl InMemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn set_locked(&mut self, annotation_uid: AnnotationId, locked: bool) {
        if locked {
            self.locked.insert(annotation_uid);
        } else {
            self.locked.remove(&annotation_uid);
        }
    }

    pub fn set_visible(&mut self, annotation_uid: AnnotationId, visible: bool) {
        if visible {
            self.hidden.remove(&annotation_uid);
        } else {
            self.hidden.insert(annotation_uid);
        }
    }

    /// Serialize all annotations to JSON
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.annotations)
    }

    /// Add annotations previously written by [`Self::export_json`]
    pub fn import_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let annotations: Vec<Annotation> = serde_json::from_str(json)?;
        let count = annotations.len();
        for annotation in annotations {
            self.add_annotation(annotation);
        }
        Ok(count)
    }
}

impl AnnotationStore for InMemoryAnnotationStore {
    fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId {
        let annotation_uid = annotation.annotation_uid;
        self.remove_annotation(&annotation_uid);
        self.annotations.push(annotation);
        annotation_uid
    }

    fn annotation(&self, annotation_uid: &AnnotationId) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.annotation_uid == *annotation_uid)
    }

    fn annotation_mut(&mut self, annotation_uid: &AnnotationId) -> Option<&mut Annotation> {
        self.annotations
            .iter_mut()
            .find(|annotation| annotation.annotation_uid == *annotation_uid)
    }

    fn remove_annotation(&mut self, annotation_uid: &AnnotationId) -> Option<Annotation> {
        let position = self
            .annotations
            .iter()
            .position(|annotation| annotation.annotation_uid == *annotation_uid)?;
        self.locked.remove(annotation_uid);
        self.hidden.remove(annotation_uid);
        Some(self.annotations.remove(position))
    }

    fn annotation_ids(&self, tool_name: &str, frame_of_reference_uid: &str) -> Vec<AnnotationId> {
        self.annotations
            .iter()
            .filter(|annotation| {
                annotation.metadata.tool_name == tool_name
                    && annotation.metadata.frame_of_reference_uid == frame_of_reference_uid
            })
            .map(|annotation| annotation.annotation_uid)
            .collect()
    }

    fn is_locked(&self, annotation_uid: &AnnotationId) -> bool {
        self.locked.contains(annotation_uid)
    }

    fn is_visible(&self, annotation_uid: &AnnotationId) -> bool {
        !self.hidden.contains(annotation_uid)
    }
}

/// Volumes available to the tool, keyed by volume id. Volumes may be evicted
/// at any time; the tool treats a missing volume as nothing to compute.
#[derive(Debug, Default)]
pub struct VolumeCache {
    volumes: HashMap<String, ImageVolume>,
}

impl VolumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_volume(&mut self, volume: ImageVolume) {
        log::debug!("Caching volume {}", volume.volume_id);
        self.volumes.insert(volume.volume_id.clone(), volume);
    }

    pub fn get_volume(&self, volume_id: &str) -> Option<&ImageVolume> {
        self.volumes.get(volume_id)
    }

    pub fn remove_volume(&mut self, volume_id: &str) -> Option<ImageVolume> {
        self.volumes.remove(volume_id)
    }
}
