use std::sync::Arc;

use smallvec::SmallVec;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::options::{WrapOptions, WrappingIndent};

use super::line_breaks::{LineBreakData, apply_injected_text};
use super::InjectedText;

/// Break behavior of a character, as seen by the monospace wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    None,
    /// A break may be placed before this character.
    BreakBefore,
    /// A break may be placed after this character.
    BreakAfter,
    /// Ideographic: breaks are allowed on both sides.
    BreakIdeographic,
}

fn char_class(c: char) -> CharClass {
    match c {
        ' ' | '\t' => CharClass::BreakAfter,
        ')' | ']' | '}' | '.' | ',' | ';' | ':' | '!' | '?' => CharClass::BreakAfter,
        '）' | '］' | '｝' | '」' | '』' | '】' | '〉' | '》' | '、' | '。' | '，' | '．'
        | '！' | '？' => CharClass::BreakAfter,
        '(' | '[' | '{' => CharClass::BreakBefore,
        '（' | '［' | '｛' | '「' | '『' | '【' | '〈' | '《' => CharClass::BreakBefore,
        c if is_ideographic(c) => CharClass::BreakIdeographic,
        _ => CharClass::None,
    }
}

fn is_ideographic(c: char) -> bool {
    matches!(
        c as u32,
        0x2E80..=0x303F      // CJK radicals, punctuation
        | 0x3040..=0x30FF    // Hiragana, Katakana
        | 0x3400..=0x4DBF    // CJK extension A
        | 0x4E00..=0x9FFF    // CJK unified
        | 0xAC00..=0xD7AF    // Hangul syllables
        | 0xF900..=0xFAFF    // CJK compatibility
        | 0xFF00..=0xFFEF    // full-width forms
    )
}

fn can_break(prev: CharClass, current: CharClass) -> bool {
    prev == CharClass::BreakAfter
        || current == CharClass::BreakBefore
        || (prev == CharClass::BreakIdeographic && current != CharClass::BreakAfter)
        || (current == CharClass::BreakIdeographic && prev != CharClass::BreakBefore)
}

/// Visible width of one grapheme cluster starting at `visible_column`.
fn cluster_width(cluster: &str, visible_column: usize, options: &WrapOptions) -> usize {
    if cluster == "\t" {
        return options.tab_width(visible_column);
    }
    match cluster.width() {
        0 => 0,
        1 => 1,
        _ => options.columns_for_full_width_char,
    }
}

/// Indentation applied to continuation lines, derived from the line's leading
/// whitespace per [`WrappingIndent`]. Forced to 0 when it would leave no room
/// for content.
fn compute_wrapped_indent(line_text: &str, options: &WrapOptions, wrapping_column: usize) -> usize {
    if options.wrapping_indent == WrappingIndent::None {
        return 0;
    }
    let Some(first_non_whitespace) = line_text.chars().position(|c| c != ' ' && c != '\t') else {
        // Whitespace-only line.
        return 0;
    };

    let mut indent = 0usize;
    for c in line_text.chars().take(first_non_whitespace) {
        indent += if c == '\t' { options.tab_width(indent) } else { 1 };
    }
    let additional_tabs = match options.wrapping_indent {
        WrappingIndent::Indent => 1,
        WrappingIndent::DeepIndent => 2,
        _ => 0,
    };
    for _ in 0..additional_tabs {
        indent += options.tab_width(indent);
    }

    if indent + options.columns_for_full_width_char > wrapping_column {
        indent = 0;
    }
    indent
}

struct BreakTable {
    offsets: SmallVec<[usize; 2]>,
    visible_columns: SmallVec<[usize; 2]>,
    wrapped_indent_len: usize,
}

/// Run the wrapping scan over spliced line content. Returns `None` when the
/// content fits `wrapping_column`.
fn compute_breaks(content: &str, options: &WrapOptions, wrapping_column: usize) -> Option<BreakTable> {
    let wrapped_indent_len = compute_wrapped_indent(content, options, wrapping_column);
    // Columns available for content on continuation lines.
    let wrapped_line_break_column = wrapping_column - wrapped_indent_len;

    let mut offsets: SmallVec<[usize; 2]> = SmallVec::new();
    let mut visible_columns: SmallVec<[usize; 2]> = SmallVec::new();

    // Absolute visible column limit of the visual line being filled.
    let mut breaking_column = wrapping_column;
    // Last usable break opportunity, 0 meaning none since the last break.
    let mut break_offset = 0usize;
    let mut break_offset_visible_column = 0usize;

    let mut visible_column = 0usize;
    let mut char_offset = 0usize;
    let mut prev_class = CharClass::None;

    for cluster in content.graphemes(true) {
        let class = cluster
            .chars()
            .next()
            .map(char_class)
            .unwrap_or(CharClass::None);
        if char_offset > 0 && can_break(prev_class, class) {
            break_offset = char_offset;
            break_offset_visible_column = visible_column;
        }

        let width = cluster_width(cluster, visible_column, options);
        visible_column += width;

        // Would this cluster overflow the current visual line?
        if char_offset > 0 && visible_column > breaking_column {
            if break_offset == 0
                || visible_column - break_offset_visible_column > wrapped_line_break_column
            {
                // No usable opportunity: hard break before this cluster.
                break_offset = char_offset;
                break_offset_visible_column = visible_column - width;
            }
            offsets.push(break_offset);
            visible_columns.push(break_offset_visible_column);
            breaking_column = break_offset_visible_column + wrapped_line_break_column;
            break_offset = 0;
        }

        prev_class = class;
        char_offset += cluster.chars().count();
    }

    if offsets.is_empty() {
        return None;
    }

    offsets.push(char_offset);
    visible_columns.push(visible_column);
    Some(BreakTable {
        offsets,
        visible_columns,
        wrapped_indent_len,
    })
}

/// Total visible width of spliced content, without breaking.
fn measure_width(content: &str, options: &WrapOptions) -> usize {
    let mut visible_column = 0usize;
    for cluster in content.graphemes(true) {
        visible_column += cluster_width(cluster, visible_column, options);
    }
    visible_column
}

struct BreakRequest {
    line_text: String,
    injections: Option<Vec<InjectedText>>,
    previous: Option<Arc<LineBreakData>>,
}

/// Batched computation of [`LineBreakData`] for a set of logical lines.
///
/// One batch per edit or re-layout transaction: `add_request` for every
/// affected line, then a single `finish` returning results in submission
/// order. The underlying document must not change between the first
/// `add_request` and `finish`; create a fresh computer per batch.
pub struct LineBreaksComputer {
    options: WrapOptions,
    requests: Vec<BreakRequest>,
}

impl LineBreaksComputer {
    pub fn new(options: WrapOptions) -> Self {
        Self {
            options,
            requests: Vec::new(),
        }
    }

    /// Queue one line. `previous` may carry the break data the line had
    /// before a wrapping-column-only change; it is a reuse hint, never
    /// required for correctness.
    pub fn add_request(
        &mut self,
        line_text: &str,
        mut injections: Vec<InjectedText>,
        previous: Option<Arc<LineBreakData>>,
    ) {
        if !injections.windows(2).all(|w| w[0].offset < w[1].offset) {
            tracing::warn!("injected text spans out of order, sorting");
            injections.sort_by_key(|i| i.offset);
        }
        self.requests.push(BreakRequest {
            line_text: line_text.to_string(),
            injections: (!injections.is_empty()).then_some(injections),
            previous,
        });
    }

    /// Compute all queued requests. `None` entries are lines that fit the
    /// wrapping column and carry no injected text.
    pub fn finish(self) -> Vec<Option<Arc<LineBreakData>>> {
        tracing::trace!(requests = self.requests.len(), "computing line breaks");
        let options = self.options;
        self.requests
            .into_iter()
            .map(|request| Self::compute_one(request, &options))
            .collect()
    }

    fn compute_one(request: BreakRequest, options: &WrapOptions) -> Option<Arc<LineBreakData>> {
        let BreakRequest {
            line_text,
            injections,
            previous,
        } = request;

        let spliced;
        let content: &str = match &injections {
            Some(spans) => {
                spliced = apply_injected_text(&line_text, spans);
                &spliced
            }
            None => &line_text,
        };

        let Some(wrapping_column) = options.wrapping_column else {
            return Self::unwrapped(content, injections, options);
        };

        // Reuse hint: the previous table's last visible column is the total
        // width of the line, so a line that now fits needs no re-measuring.
        if let Some(previous) = &previous {
            if let Some(&total_width) = previous.break_offsets_visible_column.last() {
                if previous.injections == injections && total_width <= wrapping_column {
                    tracing::trace!(total_width, "reusing previous break data, line fits");
                    return Self::unwrapped(content, injections, options);
                }
            }
        }

        match compute_breaks(content, options, wrapping_column) {
            Some(table) => Some(Arc::new(LineBreakData::new(
                table.offsets,
                table.visible_columns,
                table.wrapped_indent_len,
                injections,
            ))),
            None => Self::unwrapped(content, injections, options),
        }
    }

    /// A line that does not wrap still needs a break table when it carries
    /// injected text, so the injections get rendered and mapped.
    fn unwrapped(
        content: &str,
        injections: Option<Vec<InjectedText>>,
        options: &WrapOptions,
    ) -> Option<Arc<LineBreakData>> {
        let injections = injections?;
        let len = content.chars().count();
        let width = measure_width(content, options);
        let mut offsets: SmallVec<[usize; 2]> = SmallVec::new();
        let mut visible_columns: SmallVec<[usize; 2]> = SmallVec::new();
        offsets.push(len);
        visible_columns.push(width);
        Some(Arc::new(LineBreakData::new(
            offsets,
            visible_columns,
            0,
            Some(injections),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute(
        text: &str,
        injections: Vec<InjectedText>,
        options: WrapOptions,
    ) -> Option<Arc<LineBreakData>> {
        let mut computer = LineBreaksComputer::new(options);
        computer.add_request(text, injections, None);
        computer.finish().remove(0)
    }

    #[test]
    fn test_short_line_does_not_wrap() {
        assert!(compute("short line", vec![], WrapOptions::new(40, 4)).is_none());
        assert!(compute("", vec![], WrapOptions::new(40, 4)).is_none());
    }

    #[test]
    fn test_wrapping_disabled() {
        let mut options = WrapOptions::default();
        options.wrapping_column = None;
        assert!(compute(&"x".repeat(500), vec![], options).is_none());
    }

    #[test]
    fn test_breaks_at_word_boundaries() {
        let data = compute("aaaa bbbb cccc dddd", vec![], WrapOptions::new(10, 4)).unwrap();
        // The latest opportunity that still fits wins: "aaaa bbbb " fills the
        // first sub-line exactly, "cccc dddd" the second.
        assert_eq!(data.break_offsets.as_slice(), &[10, 19]);
        assert_eq!(data.break_offsets_visible_column.as_slice(), &[10, 19]);
        assert_eq!(data.output_line_count(), 2);
    }

    #[test]
    fn test_hard_break_without_opportunity() {
        let data = compute(&"a".repeat(25), vec![], WrapOptions::new(10, 4)).unwrap();
        assert_eq!(data.break_offsets.as_slice(), &[10, 20, 25]);
        assert_eq!(data.output_line_count(), 3);
    }

    #[test]
    fn test_tabs_expand_to_tab_stops() {
        // Tab at col 0 expands to 4 columns; the only break opportunity is
        // right after it, so the first sub-line is just the tab.
        let data = compute("\tabcdefgh", vec![], WrapOptions::new(8, 4)).unwrap();
        assert_eq!(data.break_offsets.as_slice(), &[1, 9]);
        assert_eq!(data.break_offsets_visible_column.as_slice(), &[4, 12]);
    }

    #[test]
    fn test_wide_chars_count_double() {
        // Six full-width chars at 2 columns each, wrapped at 8 columns.
        let data = compute("你好世界测试", vec![], WrapOptions::new(8, 4)).unwrap();
        assert_eq!(data.break_offsets.as_slice(), &[4, 6]);
        assert_eq!(data.break_offsets_visible_column.as_slice(), &[8, 12]);
    }

    #[test]
    fn test_wrapped_indent_same_repeats_leading_whitespace() {
        let text = format!("    {}", "word ".repeat(8)); // 4 + 40 chars
        let data = compute(&text, vec![], WrapOptions::new(20, 4)).unwrap();
        assert_eq!(data.wrapped_indent_len, 4);
        // Continuation lines fit 20 - 4 = 16 content columns.
        for index in 1..data.output_line_count() {
            assert!(data.output_line_len(index) <= 16);
        }
    }

    #[test]
    fn test_wrapped_indent_forced_to_zero_when_too_deep() {
        let text = format!("{}{}", " ".repeat(19), "y".repeat(30));
        let data = compute(&text, vec![], WrapOptions::new(20, 4)).unwrap();
        assert_eq!(data.wrapped_indent_len, 0);
    }

    #[test]
    fn test_indent_mode_adds_tab_stop() {
        let text = format!("  {}", "word ".repeat(10));
        let options = WrapOptions::new(20, 4).with_indent(WrappingIndent::Indent);
        let data = compute(&text, vec![], options).unwrap();
        // 2 leading spaces rounded up to the next stop: 2 + (4 - 2 % 4) = 4.
        assert_eq!(data.wrapped_indent_len, 4);
    }

    #[test]
    fn test_injections_always_produce_break_data() {
        let data = compute(
            "let x = 1;",
            vec![InjectedText::new(4, ": i32")],
            WrapOptions::new(80, 4),
        )
        .unwrap();
        assert_eq!(data.output_line_count(), 1);
        assert_eq!(data.len_with_injections(), 15);
        assert!(data.injections.is_some());
    }

    #[test]
    fn test_injected_text_participates_in_wrapping() {
        // 10 chars + 12 injected = 22 columns, wrapped at 12.
        let data = compute(
            "abcde fghij",
            vec![InjectedText::new(6, "injected txt")],
            WrapOptions::new(12, 4),
        )
        .unwrap();
        assert!(data.output_line_count() > 1);
        let total = data.len_with_injections();
        assert_eq!(total, 23);
        assert_eq!(*data.break_offsets.last().unwrap(), total);
    }

    #[test]
    fn test_grapheme_clusters_never_split() {
        // "e" + combining acute repeated; clusters are 2 chars wide each in
        // char count but 1 visible column.
        let text = "e\u{301}".repeat(15);
        let data = compute(&text, vec![], WrapOptions::new(10, 4)).unwrap();
        for &offset in &data.break_offsets {
            // Break offsets land on even char offsets, i.e. cluster starts.
            assert_eq!(offset % 2, 0);
        }
    }

    #[test]
    fn test_reuse_skips_remeasure_when_line_fits_again() {
        let text = "aaaa bbbb cccc dddd";
        let narrow = compute(text, vec![], WrapOptions::new(10, 4)).unwrap();

        let mut computer = LineBreaksComputer::new(WrapOptions::new(40, 4));
        computer.add_request(text, vec![], Some(narrow));
        assert!(computer.finish().remove(0).is_none());
    }

    #[test]
    fn test_reuse_agrees_with_fresh_compute() {
        let text = format!("{} tail", "word ".repeat(12));
        let narrow = compute(&text, vec![], WrapOptions::new(12, 4));

        for column in [8, 16, 24, 64, 200] {
            let mut with_previous = LineBreaksComputer::new(WrapOptions::new(column, 4));
            with_previous.add_request(&text, vec![], narrow.clone());
            let reused = with_previous.finish().remove(0);
            let fresh = compute(&text, vec![], WrapOptions::new(column, 4));
            assert_eq!(reused, fresh, "column {column}");
        }
    }

    #[test]
    fn test_batch_preserves_submission_order() {
        let mut computer = LineBreaksComputer::new(WrapOptions::new(10, 4));
        computer.add_request("fits", vec![], None);
        computer.add_request("does not fit at all here", vec![], None);
        computer.add_request("fits too", vec![], None);
        let results = computer.finish();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_none());
        assert!(results[1].is_some());
        assert!(results[2].is_none());
    }
}
