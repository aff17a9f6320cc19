use std::cell::Cell;
use std::collections::BTreeMap;
use std::ops::Range;

use ropey::Rope;

use crate::decoration::ModelDecoration;
use crate::display_map::InjectedText;
use crate::position::TextRange;
use crate::rope_ext::RopeExt as _;
use crate::tokens::LineTokens;

/// The document/text-storage collaborator.
///
/// Line numbers are 1-based. Implementations must keep line content stable
/// for the duration of a line-breaks batch; this core never mutates the
/// document.
pub trait TextModel {
    fn line_count(&self) -> usize;

    /// Content of the line, without the line terminator.
    fn line_content(&self, line_number: usize) -> String;

    /// Char length of the line, without the line terminator.
    fn line_len(&self, line_number: usize) -> usize;

    /// Style runs for the line. A plain single run is a valid answer for an
    /// untokenized line.
    fn line_tokens(&self, line_number: usize) -> LineTokens;

    /// Injected text anchored on the line, ordered by offset.
    fn injected_texts(&self, _line_number: usize) -> Vec<InjectedText> {
        Vec::new()
    }

    /// False asserts the whole document is basic ASCII, enabling render-time
    /// fast paths.
    fn might_contain_non_basic_ascii(&self) -> bool {
        true
    }

    fn might_contain_rtl(&self) -> bool {
        true
    }

    fn tab_size(&self) -> usize {
        4
    }

    /// Hint that background tokenization should prioritize these lines.
    /// Purely advisory; correctness never depends on it.
    fn prioritize_tokenization(&self, _lines: Range<usize>) {}
}

/// The decoration layer: supplies model-space decoration ranges on request.
pub trait DecorationProvider {
    fn decorations_in_range(&self, range: TextRange) -> Vec<ModelDecoration>;
}

/// A [`TextModel`] backed by a [`Rope`], with settable tokens, injected text
/// and decorations. The production document layer lives outside this crate;
/// this implementation backs tests and simple embedders.
pub struct RopeTextModel {
    rope: Rope,
    tab_size: usize,
    tokens: BTreeMap<usize, LineTokens>,
    injections: BTreeMap<usize, Vec<InjectedText>>,
    decorations: Vec<ModelDecoration>,
    tokenization_hint: Cell<Option<(usize, usize)>>,
}

impl RopeTextModel {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            tab_size: 4,
            tokens: BTreeMap::new(),
            injections: BTreeMap::new(),
            decorations: Vec::new(),
            tokenization_hint: Cell::new(None),
        }
    }

    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    /// Replace a char range of the document.
    pub fn splice(&mut self, range: Range<usize>, text: &str) {
        self.rope.remove(range.clone());
        self.rope.insert(range.start, text);
    }

    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }

    pub fn set_line_tokens(&mut self, line_number: usize, tokens: LineTokens) {
        self.tokens.insert(line_number, tokens);
    }

    pub fn set_injected_texts(&mut self, line_number: usize, injections: Vec<InjectedText>) {
        if injections.is_empty() {
            self.injections.remove(&line_number);
        } else {
            self.injections.insert(line_number, injections);
        }
    }

    pub fn set_decorations(&mut self, decorations: Vec<ModelDecoration>) {
        self.decorations = decorations;
    }

    /// The last range passed to [`TextModel::prioritize_tokenization`].
    pub fn tokenization_hint(&self) -> Option<Range<usize>> {
        self.tokenization_hint.get().map(|(start, end)| start..end)
    }
}

impl TextModel for RopeTextModel {
    fn line_count(&self) -> usize {
        self.rope.lines_len()
    }

    fn line_content(&self, line_number: usize) -> String {
        self.rope.line_str(line_number.saturating_sub(1))
    }

    fn line_len(&self, line_number: usize) -> usize {
        self.rope.line_len(line_number.saturating_sub(1))
    }

    fn line_tokens(&self, line_number: usize) -> LineTokens {
        self.tokens
            .get(&line_number)
            .cloned()
            .unwrap_or_else(|| LineTokens::plain(self.line_len(line_number)))
    }

    fn injected_texts(&self, line_number: usize) -> Vec<InjectedText> {
        self.injections
            .get(&line_number)
            .cloned()
            .unwrap_or_default()
    }

    fn tab_size(&self) -> usize {
        self.tab_size
    }

    fn prioritize_tokenization(&self, lines: Range<usize>) {
        self.tokenization_hint.set(Some((lines.start, lines.end)));
    }
}

impl DecorationProvider for RopeTextModel {
    fn decorations_in_range(&self, range: TextRange) -> Vec<ModelDecoration> {
        self.decorations
            .iter()
            .filter(|d| d.range.intersection(&range).is_some())
            .cloned()
            .collect()
    }
}
