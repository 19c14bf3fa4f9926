use crate::annotation::AnnotationId;

use futures::channel::mpsc::UnboundedSender;

/// Notifications sent to listeners outside the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationEvent {
    /// Cached stats were recomputed
    Modified {
        annotation_uid: AnnotationId,
        viewport_id: String,
    },
    /// A newly drawn annotation was finished
    Completed { annotation_uid: AnnotationId },
    /// The tool removed an annotation from the store
    Removed { annotation_uid: AnnotationId },
}

pub trait AnnotationEventSink {
    fn emit(&mut self, event: AnnotationEvent);
}

impl AnnotationEventSink for Vec<AnnotationEvent> {
    fn emit(&mut self, event: AnnotationEvent) {
        self.push(event);
    }
}

impl AnnotationEventSink for UnboundedSender<AnnotationEvent> {
    fn emit(&mut self, event: AnnotationEvent) {
        if let Err(err) = self.unbounded_send(event) {
            log::debug!("Dropping annotation event, listener is gone: {err}");
        }
    }
}
