/// What a viewport is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportKind {
    /// A plain stack of 2D images without volume geometry
    Stack,
    /// A cached volume, identified by its volume id
    Volume { volume_id: String },
}

/// How a slice relates to an annotation's slice range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceRole {
    /// First or last slice of the range
    Boundary,
    /// Any slice strictly between the first and last
    Interior,
}

/// Line style of an annotation outline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
}

#[derive(Default)]
pub enum SortBy {
    /// Position along the slice normal derived from the image orientation
    #[default]
    ImagePositionPatient,
    InstanceNumber,
    None,
}
