use serde::{Deserialize, Serialize};

/// Indentation style applied to continuation lines of a soft-wrapped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrappingIndent {
    /// Continuation lines start at column 0.
    #[serde(rename = "none")]
    None,
    /// Continuation lines repeat the indentation of the first line.
    #[default]
    #[serde(rename = "same")]
    Same,
    /// Continuation lines get the first line's indentation plus one tab stop.
    #[serde(rename = "indent")]
    Indent,
    /// Continuation lines get the first line's indentation plus two tab stops.
    #[serde(rename = "deep_indent")]
    DeepIndent,
}

/// Layout options used to compute line breaks.
///
/// All widths are in visible columns, not pixels; this core is monospace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapOptions {
    /// Column the text is wrapped at. `None` disables soft wrapping.
    pub wrapping_column: Option<usize>,
    /// Number of columns a tab stop occupies.
    pub tab_size: usize,
    /// How continuation lines are indented.
    pub wrapping_indent: WrappingIndent,
    /// Columns occupied by an East Asian full-width character.
    pub columns_for_full_width_char: usize,
}

impl Default for WrapOptions {
    fn default() -> Self {
        Self {
            wrapping_column: None,
            tab_size: 4,
            wrapping_indent: WrappingIndent::default(),
            columns_for_full_width_char: 2,
        }
    }
}

impl WrapOptions {
    pub fn new(wrapping_column: usize, tab_size: usize) -> Self {
        Self {
            wrapping_column: Some(wrapping_column),
            tab_size: tab_size.max(1),
            ..Default::default()
        }
    }

    pub fn with_indent(mut self, wrapping_indent: WrappingIndent) -> Self {
        self.wrapping_indent = wrapping_indent;
        self
    }

    /// Width of a tab starting at `visible_column`.
    #[inline]
    pub(crate) fn tab_width(&self, visible_column: usize) -> usize {
        self.tab_size - (visible_column % self.tab_size)
    }
}
