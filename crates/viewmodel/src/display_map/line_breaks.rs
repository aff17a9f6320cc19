use smallvec::SmallVec;

use super::{InjectedText, OutputPosition};

/// The break table of one logical line that wraps or carries injected text.
///
/// Offsets are char offsets into the line content with injected text spliced
/// in. `break_offsets[i]` is the exclusive end of wrapped sub-line `i`; the
/// final entry is the full spliced length, so the table always has one entry
/// per output line. `break_offsets_visible_column` is parallel and holds the
/// absolute visible column (tabs and wide chars accounted for) of the text up
/// to each break.
///
/// Instances are owned by the line-break cache and replaced wholesale on edit
/// or re-wrap, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBreakData {
    pub break_offsets: SmallVec<[usize; 2]>,
    pub break_offsets_visible_column: SmallVec<[usize; 2]>,
    /// Columns of indentation rendered at the start of every sub-line after
    /// the first. Applies to view columns and content only; [`OutputPosition`]
    /// offsets never include it.
    pub wrapped_indent_len: usize,
    /// Injected text spans, offsets strictly increasing. `None` when the line
    /// has no injected text.
    pub injections: Option<Vec<InjectedText>>,
}

impl LineBreakData {
    pub fn new(
        break_offsets: SmallVec<[usize; 2]>,
        break_offsets_visible_column: SmallVec<[usize; 2]>,
        wrapped_indent_len: usize,
        injections: Option<Vec<InjectedText>>,
    ) -> Self {
        debug_assert!(!break_offsets.is_empty());
        debug_assert_eq!(break_offsets.len(), break_offsets_visible_column.len());
        debug_assert!(break_offsets.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(
            injections
                .as_deref()
                .map(|spans| spans.windows(2).all(|w| w[0].offset < w[1].offset))
                .unwrap_or(true)
        );
        Self {
            break_offsets,
            break_offsets_visible_column,
            wrapped_indent_len,
            injections,
        }
    }

    /// Number of output (wrapped) lines this logical line occupies.
    #[inline]
    pub fn output_line_count(&self) -> usize {
        self.break_offsets.len()
    }

    /// Char offset the given output line starts at, in spliced space.
    #[inline]
    pub fn start_offset(&self, output_line_index: usize) -> usize {
        if output_line_index == 0 {
            0
        } else {
            self.break_offsets[output_line_index - 1]
        }
    }

    /// Char length of the given output line, excluding wrapped indentation.
    #[inline]
    pub fn output_line_len(&self, output_line_index: usize) -> usize {
        self.break_offsets[output_line_index] - self.start_offset(output_line_index)
    }

    /// Length of the line content with injections applied.
    #[inline]
    pub fn len_with_injections(&self) -> usize {
        self.break_offsets.last().copied().unwrap_or(0)
    }

    /// Map an output position back to the input (document) char offset.
    ///
    /// A position inside an injected span snaps to the span's anchor offset;
    /// a position past a span has the span's length removed so injected text
    /// never counts toward document offsets. The `>` comparison is
    /// intentionally asymmetric with [`Self::input_offset_to_output_position`];
    /// boundary behavior at injection points depends on it.
    pub fn output_position_to_input_offset(
        &self,
        output_line_index: usize,
        output_offset: usize,
    ) -> usize {
        let mut offset = if output_line_index == 0 {
            output_offset
        } else {
            self.break_offsets[output_line_index - 1] + output_offset
        };

        if let Some(injections) = &self.injections {
            for injected in injections {
                if offset > injected.offset {
                    if offset < injected.offset + injected.content_len() {
                        offset = injected.offset;
                    } else {
                        offset -= injected.content_len();
                    }
                } else {
                    break;
                }
            }
        }

        offset
    }

    /// Map an input (document) char offset to its output position.
    ///
    /// Spans anchored strictly before the offset shift it right by their
    /// content length; an offset exactly at an injection anchor stays before
    /// the virtual text.
    pub fn input_offset_to_output_position(&self, input_offset: usize) -> OutputPosition {
        let mut offset = input_offset;
        if let Some(injections) = &self.injections {
            let mut delta = 0;
            for injected in injections {
                if input_offset <= injected.offset {
                    break;
                }
                delta += injected.content_len();
            }
            offset += delta;
        }
        self.spliced_offset_to_output_position(offset)
    }

    /// Binary search over the break table for the sub-line containing a
    /// spliced-space offset: the unique `mid` with
    /// `start(mid) <= offset < break_offsets[mid]`, except that the offset at
    /// the final break maps to the end of the last sub-line.
    fn spliced_offset_to_output_position(&self, offset: usize) -> OutputPosition {
        debug_assert!(offset <= self.len_with_injections());

        let mut low = 0usize;
        let mut high = self.break_offsets.len() - 1;
        let mut mid = 0usize;
        let mut mid_start = 0usize;

        while low <= high {
            mid = low + (high - low) / 2;
            let mid_stop = self.break_offsets[mid];
            mid_start = if mid > 0 { self.break_offsets[mid - 1] } else { 0 };

            if offset < mid_start {
                high = mid - 1;
            } else if offset >= mid_stop {
                low = mid + 1;
            } else {
                break;
            }
        }

        OutputPosition::new(mid, offset - mid_start)
    }
}

/// Splice injected text spans into a line's content. Offsets are char
/// offsets; spans must be ordered by offset. Offsets past the end of the
/// line append.
pub fn apply_injected_text(line_text: &str, injections: &[InjectedText]) -> String {
    if injections.is_empty() {
        return line_text.to_string();
    }

    let extra: usize = injections.iter().map(|i| i.content.len()).sum();
    let mut result = String::with_capacity(line_text.len() + extra);
    let mut chars = line_text.chars();
    let mut pos = 0usize;
    for injected in injections {
        while pos < injected.offset {
            match chars.next() {
                Some(c) => result.push(c),
                None => break,
            }
            pos += 1;
        }
        result.push_str(&injected.content);
    }
    result.extend(chars);
    result
}
