use smallvec::SmallVec;
use std::ops::Range;

/// One style run inside a line.
///
/// `end_offset` is the exclusive char offset the run stops at; runs cover the
/// line back to back, so a run starts where the previous one ended. `style_id`
/// is opaque to this core and resolved by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub end_offset: usize,
    pub style_id: u32,
}

/// Style runs covering a whole line, supplied by the tokenization layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTokens {
    spans: SmallVec<[TokenSpan; 8]>,
}

impl LineTokens {
    /// A single unstyled run covering `len` chars.
    pub fn plain(len: usize) -> Self {
        let mut spans = SmallVec::new();
        spans.push(TokenSpan {
            end_offset: len,
            style_id: 0,
        });
        Self { spans }
    }

    pub fn from_spans(spans: impl IntoIterator<Item = TokenSpan>) -> Self {
        Self {
            spans: spans.into_iter().collect(),
        }
    }

    #[inline]
    pub fn spans(&self) -> &[TokenSpan] {
        &self.spans
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Slice the runs to `range` (char offsets), rebasing them to start at 0
    /// and shifting the result right by `shift` chars.
    ///
    /// Used to cut one wrapped segment out of the whole line's tokens; `shift`
    /// accounts for the wrapped indentation prepended to continuation lines.
    pub fn slice(&self, range: Range<usize>, shift: usize) -> LineTokens {
        let mut spans = SmallVec::new();
        let mut start = 0usize;
        for span in &self.spans {
            let end = span.end_offset;
            if end > range.start && start < range.end {
                let clipped_end = end.min(range.end);
                spans.push(TokenSpan {
                    end_offset: clipped_end - range.start + shift,
                    style_id: span.style_id,
                });
            }
            start = end;
            if start >= range.end {
                break;
            }
        }
        LineTokens { spans }
    }

    /// Extend the covered length to `len`, continuing the last style.
    ///
    /// Injected text not covered by model tokens is rendered with the style of
    /// the run it interrupts.
    pub fn extend_to(&mut self, len: usize) {
        match self.spans.last_mut() {
            Some(last) if last.end_offset < len => last.end_offset = len,
            None => self.spans.push(TokenSpan {
                end_offset: len,
                style_id: 0,
            }),
            _ => {}
        }
    }
}
