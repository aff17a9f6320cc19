use once_cell::sync::Lazy;
use regex::Regex;

use crate::decoration::{InlineDecoration, SingleLineInlineDecoration};
use crate::tokens::LineTokens;

/// Matches any char of a right-to-left script (Hebrew, Arabic and their
/// presentation forms).
static RTL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{0591}-\u{08FF}\u{FB1D}-\u{FDFD}\u{FE70}-\u{FEFC}]").expect("valid rtl pattern")
});

/// The renderable content of one view line, as assembled by the lines
/// collection. Immutable snapshot, never shared mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLineData {
    /// The text of the view line, injected text spliced in and wrapped
    /// indentation prepended on continuation lines.
    pub content: String,
    /// True when the next view line continues the same model line.
    pub continues_with_wrapped_line: bool,
    /// First interesting column (after the wrapped indentation), 1-based.
    pub min_column: usize,
    /// Column after the last char of `content`, 1-based.
    pub max_column: usize,
    /// Absolute visible column this view line starts at within its model line.
    pub start_visible_column: usize,
    /// Style runs covering `content`.
    pub tokens: LineTokens,
    /// Inline decorations contributed by injected text, if any.
    pub inline_decorations: Option<Vec<SingleLineInlineDecoration>>,
}

/// [`ViewLineData`] plus everything the renderer needs, with the ASCII/RTL
/// flags resolved once at construction so painting never rescans the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLineRenderingData {
    pub content: String,
    pub continues_with_wrapped_line: bool,
    pub min_column: usize,
    pub max_column: usize,
    pub start_visible_column: usize,
    pub is_basic_ascii: bool,
    pub contains_rtl: bool,
    pub tokens: LineTokens,
    pub inline_decorations: Vec<InlineDecoration>,
    pub tab_size: usize,
}

impl ViewLineRenderingData {
    pub fn from_view_line_data(
        data: ViewLineData,
        view_line: usize,
        tab_size: usize,
        might_contain_non_basic_ascii: bool,
        might_contain_rtl: bool,
    ) -> Self {
        let is_basic_ascii = Self::is_basic_ascii(&data.content, might_contain_non_basic_ascii);
        let contains_rtl = Self::contains_rtl(&data.content, is_basic_ascii, might_contain_rtl);
        let inline_decorations = data
            .inline_decorations
            .map(|decorations| {
                decorations
                    .iter()
                    .map(|d| d.to_inline_decoration(view_line))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            content: data.content,
            continues_with_wrapped_line: data.continues_with_wrapped_line,
            min_column: data.min_column,
            max_column: data.max_column,
            start_visible_column: data.start_visible_column,
            is_basic_ascii,
            contains_rtl,
            tokens: data.tokens,
            inline_decorations,
            tab_size,
        }
    }

    /// Fast-path contract: when the caller asserts the content cannot contain
    /// non-ASCII (`might_contain_non_basic_ascii == false`), the answer is
    /// `true` without scanning.
    pub fn is_basic_ascii(content: &str, might_contain_non_basic_ascii: bool) -> bool {
        if !might_contain_non_basic_ascii {
            return true;
        }
        content
            .bytes()
            .all(|b| (32..=126).contains(&b) || b == b'\t')
    }

    /// RTL scan, skipped when the content is known to be basic ASCII or the
    /// model asserts it holds no RTL text at all.
    pub fn contains_rtl(content: &str, is_basic_ascii: bool, might_contain_rtl: bool) -> bool {
        if is_basic_ascii || !might_contain_rtl {
            return false;
        }
        RTL_PATTERN.is_match(content)
    }
}

/// View lines prepared for the minimap: `data[i]` is `None` when line
/// `start_line + i` was not requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimapLinesRenderingData {
    pub tab_size: usize,
    pub data: Vec<Option<ViewLineData>>,
}
