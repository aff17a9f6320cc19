use std::sync::Arc;

use crate::position::{Position, TextRange};

/// How an inline decoration participates in text layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineDecorationType {
    #[default]
    Regular,
    /// Rendered before the first character of the range.
    Before,
    /// Rendered after the last character of the range.
    After,
    /// Like `Regular`, but the class changes letter spacing, so the renderer
    /// must not merge adjacent runs.
    RegularAffectingLetterSpacing,
}

/// A styled char range inside the view, attached to rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDecoration {
    pub range: TextRange,
    pub inline_class_name: String,
    pub kind: InlineDecorationType,
}

impl InlineDecoration {
    pub fn new(range: TextRange, inline_class_name: impl Into<String>, kind: InlineDecorationType) -> Self {
        Self {
            range,
            inline_class_name: inline_class_name.into(),
            kind,
        }
    }
}

/// The single-line form of an inline decoration: char offsets within one view
/// line, convertible to the range-qualified form once the line is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleLineInlineDecoration {
    pub start_offset: usize,
    pub end_offset: usize,
    pub inline_class_name: String,
}

impl SingleLineInlineDecoration {
    pub fn new(start_offset: usize, end_offset: usize, inline_class_name: impl Into<String>) -> Self {
        Self {
            start_offset,
            end_offset,
            inline_class_name: inline_class_name.into(),
        }
    }

    /// Qualify with a view line number. Columns are char offset + 1.
    pub fn to_inline_decoration(&self, line_number: usize) -> InlineDecoration {
        InlineDecoration::new(
            TextRange::new(
                Position::new(line_number, self.start_offset + 1),
                Position::new(line_number, self.end_offset + 1),
            ),
            self.inline_class_name.clone(),
            InlineDecorationType::Regular,
        )
    }
}

/// Display options of a model decoration.
///
/// `class_name` styles whole view lines the range touches, `inline_class_name`
/// styles the covered text itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecorationOptions {
    pub class_name: Option<String>,
    pub inline_class_name: Option<String>,
    pub kind: InlineDecorationType,
}

impl DecorationOptions {
    pub fn inline(inline_class_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inline_class_name: Some(inline_class_name.into()),
            ..Default::default()
        })
    }
}

/// A decoration in model space, as supplied by the document layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDecoration {
    pub range: TextRange,
    pub options: Arc<DecorationOptions>,
}

/// A model decoration projected into view space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModelDecoration {
    pub range: TextRange,
    pub options: Arc<DecorationOptions>,
}
