//! Document-to-view projection core for editors.
//!
//! Maps a logical document (lines of text, possibly with injected virtual
//! text) onto a wrapped, renderable view, and translates positions and ranges
//! between the two spaces:
//!
//! - [`display_map`]: line-break tables, batched computation, the
//!   per-document cache and the [`CoordinatesConverter`] service
//! - [`ViewModel`]: the facade combining projection state with viewport
//!   hints, decorations and cursor pass-through
//! - [`TextModel`] / [`DecorationProvider`]: the interfaces the document and
//!   decoration layers plug in through, with a rope-backed implementation
//!
//! Everything here is single-threaded and synchronous; document storage,
//! scrolling, cursor logic and painting are external collaborators.

pub mod decoration;
pub mod display_map;
pub mod options;
pub mod position;
pub mod rope_ext;
pub mod text_model;
pub mod tokens;
pub mod view_line;
pub mod view_model;
pub mod viewport;

pub use decoration::{
    DecorationOptions, InlineDecoration, InlineDecorationType, ModelDecoration,
    SingleLineInlineDecoration, ViewModelDecoration,
};
pub use display_map::{
    CoordinatesConverter, IdentityCoordinatesConverter, InjectedText, LineBreakData,
    LineBreaksComputer, OutputPosition, ViewCoordinatesConverter, WrappedLinesCollection,
};
pub use options::{WrapOptions, WrappingIndent};
pub use position::{Position, TextRange};
pub use rope_ext::RopeExt;
pub use text_model::{DecorationProvider, RopeTextModel, TextModel};
pub use tokens::{LineTokens, TokenSpan};
pub use view_line::{MinimapLinesRenderingData, ViewLineData, ViewLineRenderingData};
pub use view_model::{
    CursorHost, SingleCursor, ViewModel, ViewModelEvent, ViewportDecorations,
};
pub use viewport::Viewport;
