/// Display mapping system: projects logical document lines onto wrapped view
/// lines and converts coordinates between the two spaces.
///
/// The layers, leaf to root:
/// - **LineBreakData**: per-line break table, offset ↔ output-position maps
/// - **LineBreaksComputer**: batched (re)computation of break tables
/// - **WrappedLinesCollection**: per-document cache with prefix-sum lookup
///   and hidden-area (folding) projection
/// - **CoordinatesConverter**: model ↔ view position/range translation
///
/// The view model facade in [`crate::view_model`] composes these with
/// viewport state and decoration retrieval.
mod breaks_computer;
mod coordinates;
mod line_breaks;
mod lines_collection;

pub use self::breaks_computer::LineBreaksComputer;
pub use self::coordinates::{
    CoordinatesConverter, IdentityCoordinatesConverter, ViewCoordinatesConverter,
};
pub use self::line_breaks::{LineBreakData, apply_injected_text};
pub use self::lines_collection::WrappedLinesCollection;

/// A position inside the wrapped projection of a single logical line.
///
/// - `line_index`: 0-based index of the wrapped sub-line
/// - `offset`: 0-based char offset within that sub-line's text, never
///   including the wrapped indentation
///
/// Computed on demand, never persisted beyond a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputPosition {
    pub line_index: usize,
    pub offset: usize,
}

impl OutputPosition {
    pub fn new(line_index: usize, offset: usize) -> Self {
        Self { line_index, offset }
    }
}

impl From<(usize, usize)> for OutputPosition {
    fn from(value: (usize, usize)) -> Self {
        Self {
            line_index: value.0,
            offset: value.1,
        }
    }
}

/// Virtual text spliced into the rendering of a line at a given input offset,
/// e.g. an inline hint. Never part of the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedText {
    /// Char offset in the line the content is anchored at.
    pub offset: usize,
    /// The literal text to render.
    pub content: String,
    /// Optional class for styling the injected range.
    pub class_name: Option<String>,
    content_len: usize,
}

impl InjectedText {
    pub fn new(offset: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        let content_len = content.chars().count();
        Self {
            offset,
            content,
            class_name: None,
            content_len,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Char length of the injected content.
    #[inline]
    pub fn content_len(&self) -> usize {
        self.content_len
    }
}
