use std::ops::Range;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::decoration::SingleLineInlineDecoration;
use crate::position::TextRange;
use crate::text_model::TextModel;
use crate::tokens::{LineTokens, TokenSpan};
use crate::view_line::ViewLineData;

use super::line_breaks::{LineBreakData, apply_injected_text};
use super::InjectedText;

/// Projection state of one model line.
#[derive(Debug, Clone)]
struct LineProjection {
    breaks: Option<Arc<LineBreakData>>,
    visible: bool,
}

impl LineProjection {
    fn new(breaks: Option<Arc<LineBreakData>>) -> Self {
        Self {
            breaks,
            visible: true,
        }
    }

    fn view_line_count(&self) -> usize {
        if !self.visible {
            return 0;
        }
        match &self.breaks {
            Some(breaks) => breaks.output_line_count(),
            None => 1,
        }
    }
}

/// The per-document line-break cache: one entry per model line, keyed by line
/// number, replaced wholesale on edit or re-wrap.
///
/// Maintains a prefix-sum cache (first view line per model line) for O(log n)
/// view → model lookup, and a generation counter bumped by every mutation so
/// downstream caches can invalidate.
///
/// Hidden areas (folding) are an external collaborator's concern, signaled in
/// through [`Self::set_hidden_areas`]; hidden lines occupy zero view lines.
pub struct WrappedLinesCollection {
    lines: Vec<LineProjection>,
    /// First view line index (0-based) of each model line.
    view_line_starts: Vec<usize>,
    total_view_lines: usize,
    hidden_areas: Vec<Range<usize>>,
    generation: u64,
}

impl WrappedLinesCollection {
    pub fn new(results: Vec<Option<Arc<LineBreakData>>>) -> Self {
        let mut collection = Self {
            lines: results.into_iter().map(LineProjection::new).collect(),
            view_line_starts: Vec::new(),
            total_view_lines: 0,
            hidden_areas: Vec::new(),
            generation: 0,
        };
        collection.rebuild_cache();
        collection
    }

    /// Number of model lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of view lines, hidden areas excluded.
    #[inline]
    pub fn view_line_count(&self) -> usize {
        self.total_view_lines
    }

    /// Bumped by every mutation; lets consumers key caches off the current
    /// projection state.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn is_visible(&self, line_number: usize) -> bool {
        self.lines
            .get(line_number.saturating_sub(1))
            .map(|l| l.visible)
            .unwrap_or(false)
    }

    pub fn line_breaks(&self, line_number: usize) -> Option<&Arc<LineBreakData>> {
        self.lines
            .get(line_number.saturating_sub(1))
            .and_then(|l| l.breaks.as_ref())
    }

    /// Number of view lines the model line occupies: 0 when hidden, 1 when
    /// unwrapped.
    pub fn get_model_line_view_line_count(&self, line_number: usize) -> usize {
        self.lines
            .get(line_number.saturating_sub(1))
            .map(|l| l.view_line_count())
            .unwrap_or(0)
    }

    /// First view line (1-based) of a visible model line. For a hidden line,
    /// the first view line of the nearest visible line before it.
    pub fn view_line_of_model_line(&self, line_number: usize) -> usize {
        if self.is_empty() {
            return 1;
        }
        let line_number = self.nearest_visible_line(line_number);
        self.view_line_starts[line_number - 1] + 1
    }

    /// 0-based first view line index of a model line.
    #[inline]
    pub(crate) fn view_line_start(&self, line_number: usize) -> usize {
        self.view_line_starts[line_number - 1]
    }

    /// Nearest visible model line at or before `line_number`, falling forward
    /// when everything before is hidden.
    pub fn nearest_visible_line(&self, line_number: usize) -> usize {
        let line_number = line_number.clamp(1, self.len().max(1));
        if self.is_visible(line_number) {
            return line_number;
        }
        for candidate in (1..line_number).rev() {
            if self.is_visible(candidate) {
                return candidate;
            }
        }
        for candidate in line_number + 1..=self.len() {
            if self.is_visible(candidate) {
                return candidate;
            }
        }
        line_number
    }

    /// Map a view line (1-based) to its model line and output sub-line index.
    pub fn model_line_of_view_line(&self, view_line: usize) -> (usize, usize) {
        if self.total_view_lines == 0 {
            return (1, 0);
        }
        let row = view_line.saturating_sub(1).min(self.total_view_lines - 1);
        // Last model line whose first view line is at or before `row`; lines
        // occupying zero view lines share their start with the next line and
        // are never the last such line.
        let line_index = self.view_line_starts.partition_point(|&start| start <= row) - 1;
        (line_index + 1, row - self.view_line_starts[line_index])
    }

    // ==================== Mutation ====================

    /// Full replacement, e.g. after a wrapping-options change. Hidden areas
    /// are preserved where they still fit.
    pub fn on_flushed(&mut self, results: Vec<Option<Arc<LineBreakData>>>) {
        let hidden = self.hidden_areas.clone();
        self.lines = results.into_iter().map(LineProjection::new).collect();
        self.apply_hidden_areas(hidden);
        self.touch();
    }

    pub fn on_line_changed(&mut self, line_number: usize, breaks: Option<Arc<LineBreakData>>) {
        debug_assert!(line_number >= 1 && line_number <= self.len());
        if let Some(projection) = self.lines.get_mut(line_number - 1) {
            projection.breaks = breaks;
        }
        self.touch();
    }

    pub fn on_lines_inserted(
        &mut self,
        line_number: usize,
        results: Vec<Option<Arc<LineBreakData>>>,
    ) {
        let at = (line_number.saturating_sub(1)).min(self.len());
        self.lines
            .splice(at..at, results.into_iter().map(LineProjection::new));
        self.touch();
    }

    pub fn on_lines_deleted(&mut self, from_line: usize, to_line: usize) {
        let from = from_line.saturating_sub(1).min(self.len());
        let to = to_line.min(self.len());
        self.lines.drain(from..to);
        self.touch();
    }

    /// Replace the set of hidden (folded) model-line areas. Overlapping input
    /// ranges are merged. Returns false when nothing changed.
    pub fn set_hidden_areas(&mut self, areas: &[TextRange]) -> bool {
        let mut ranges: Vec<Range<usize>> = areas
            .iter()
            .map(|r| r.start.line.max(1)..r.end.line.min(self.len()) + 1)
            .filter(|r| r.start < r.end)
            .collect();
        ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }

        if merged == self.hidden_areas {
            return false;
        }
        self.apply_hidden_areas(merged);
        self.touch();
        true
    }

    pub fn hidden_areas(&self) -> &[Range<usize>] {
        &self.hidden_areas
    }

    fn apply_hidden_areas(&mut self, areas: Vec<Range<usize>>) {
        for line in &mut self.lines {
            line.visible = true;
        }
        for range in &areas {
            for line_index in range.start - 1..(range.end - 1).min(self.lines.len()) {
                self.lines[line_index].visible = false;
            }
        }
        self.hidden_areas = areas;
    }

    fn touch(&mut self) {
        self.rebuild_cache();
        self.generation += 1;
    }

    /// Rebuild the prefix-sum cache, eagerly on every mutation.
    fn rebuild_cache(&mut self) {
        self.view_line_starts.clear();
        self.view_line_starts.reserve(self.lines.len());
        let mut view_line = 0usize;
        for line in &self.lines {
            self.view_line_starts.push(view_line);
            view_line += line.view_line_count();
        }
        self.total_view_lines = view_line;
    }

    // ==================== View line assembly ====================

    /// Assemble the renderable snapshot of one view line.
    pub fn view_line_data(&self, view_line: usize, model: &dyn TextModel) -> ViewLineData {
        let (model_line, output_index) = self.model_line_of_view_line(view_line);
        let projection = &self.lines[model_line - 1];

        let Some(breaks) = &projection.breaks else {
            let content = model.line_content(model_line);
            let len = content.chars().count();
            let mut tokens = model.line_tokens(model_line);
            tokens.extend_to(len);
            return ViewLineData {
                content,
                continues_with_wrapped_line: false,
                min_column: 1,
                max_column: len + 1,
                start_visible_column: 0,
                tokens,
                inline_decorations: None,
            };
        };

        let line_text = model.line_content(model_line);
        let injections: &[InjectedText] = breaks.injections.as_deref().unwrap_or(&[]);
        let spliced = apply_injected_text(&line_text, injections);

        let start = breaks.start_offset(output_index);
        let end = breaks.break_offsets[output_index];
        let indent = if output_index > 0 {
            breaks.wrapped_indent_len
        } else {
            0
        };

        let mut content = String::with_capacity(indent + (end - start) * 2);
        for _ in 0..indent {
            content.push(' ');
        }
        content.push_str(char_slice(&spliced, start..end));
        let content_len = indent + (end - start);

        let mut line_tokens = model.line_tokens(model_line);
        line_tokens.extend_to(line_text.chars().count());
        let mut tokens = expand_tokens(&line_tokens, injections, breaks.len_with_injections())
            .slice(start..end, indent);
        tokens.extend_to(content_len);

        let inline_decorations = injection_decorations(injections, start..end, indent);

        ViewLineData {
            content,
            continues_with_wrapped_line: output_index + 1 < breaks.output_line_count(),
            min_column: indent + 1,
            max_column: content_len + 1,
            start_visible_column: if output_index == 0 {
                0
            } else {
                breaks.break_offsets_visible_column[output_index - 1]
            },
            tokens,
            inline_decorations,
        }
    }

    /// Bulk form of [`Self::view_line_data`]: `None` for lines not marked in
    /// `needed`. `start_view_line`/`end_view_line` are 1-based, inclusive.
    pub fn view_lines_data(
        &self,
        start_view_line: usize,
        end_view_line: usize,
        needed: &[bool],
        model: &dyn TextModel,
    ) -> Vec<Option<ViewLineData>> {
        (start_view_line..=end_view_line)
            .enumerate()
            .map(|(index, view_line)| {
                if needed.get(index).copied().unwrap_or(false) {
                    Some(self.view_line_data(view_line, model))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Slice a string by char offsets.
fn char_slice(s: &str, range: Range<usize>) -> &str {
    let start = byte_of_char(s, range.start);
    let end = byte_of_char(s, range.end);
    &s[start..end]
}

fn byte_of_char(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Rebase input-space token runs into spliced space: each injected span
/// stretches the run containing its anchor, so injected text inherits the
/// style of the text it interrupts.
fn expand_tokens(tokens: &LineTokens, injections: &[InjectedText], spliced_len: usize) -> LineTokens {
    if injections.is_empty() {
        let mut tokens = tokens.clone();
        tokens.extend_to(spliced_len);
        return tokens;
    }

    let mut spans: SmallVec<[TokenSpan; 8]> = SmallVec::new();
    let mut pending = injections.iter().peekable();
    let mut delta = 0usize;
    for span in tokens.spans() {
        while let Some(injected) = pending.peek() {
            if injected.offset < span.end_offset {
                delta += injected.content_len();
                pending.next();
            } else {
                break;
            }
        }
        spans.push(TokenSpan {
            end_offset: span.end_offset + delta,
            style_id: span.style_id,
        });
    }

    let mut result = LineTokens::from_spans(spans);
    // Injections at the end of the line extend the trailing run.
    result.extend_to(spliced_len);
    result
}

/// Inline decorations contributed by injected text with a class, clipped to
/// one output segment and rebased to its content (indent included).
fn injection_decorations(
    injections: &[InjectedText],
    segment: Range<usize>,
    indent: usize,
) -> Option<Vec<SingleLineInlineDecoration>> {
    if injections.is_empty() {
        return None;
    }

    let mut decorations = Vec::new();
    let mut spliced_offset = 0usize;
    let mut input_offset = 0usize;
    for injected in injections {
        spliced_offset += injected.offset - input_offset;
        input_offset = injected.offset;
        let injected_range = spliced_offset..spliced_offset + injected.content_len();
        spliced_offset = injected_range.end;

        if let Some(class_name) = &injected.class_name {
            let start = injected_range.start.max(segment.start);
            let end = injected_range.end.min(segment.end);
            if start < end {
                decorations.push(SingleLineInlineDecoration::new(
                    start - segment.start + indent,
                    end - segment.start + indent,
                    class_name.clone(),
                ));
            }
        }
    }

    (!decorations.is_empty()).then_some(decorations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_map::LineBreaksComputer;
    use crate::options::WrapOptions;
    use crate::text_model::RopeTextModel;

    fn collection_for(text: &str, options: WrapOptions) -> (RopeTextModel, WrappedLinesCollection) {
        let model = RopeTextModel::new(text);
        let mut computer = LineBreaksComputer::new(options);
        for line_number in 1..=model.line_count() {
            computer.add_request(
                &model.line_content(line_number),
                model.injected_texts(line_number),
                None,
            );
        }
        let collection = WrappedLinesCollection::new(computer.finish());
        (model, collection)
    }

    fn plain_breaks(offsets: &[usize]) -> Arc<LineBreakData> {
        Arc::new(LineBreakData::new(
            offsets.iter().copied().collect(),
            offsets.iter().copied().collect(),
            0,
            None,
        ))
    }

    #[test]
    fn test_prefix_sums_and_lookup() {
        let collection = WrappedLinesCollection::new(vec![
            Some(plain_breaks(&[10, 20])), // 2 view lines
            None,                          // 1 view line
            Some(plain_breaks(&[8, 16, 20])), // 3 view lines
        ]);

        assert_eq!(collection.view_line_count(), 6);
        assert_eq!(collection.get_model_line_view_line_count(1), 2);
        assert_eq!(collection.get_model_line_view_line_count(2), 1);
        assert_eq!(collection.get_model_line_view_line_count(3), 3);

        assert_eq!(collection.model_line_of_view_line(1), (1, 0));
        assert_eq!(collection.model_line_of_view_line(2), (1, 1));
        assert_eq!(collection.model_line_of_view_line(3), (2, 0));
        assert_eq!(collection.model_line_of_view_line(4), (3, 0));
        assert_eq!(collection.model_line_of_view_line(6), (3, 2));

        assert_eq!(collection.view_line_of_model_line(3), 4);
    }

    #[test]
    fn test_hidden_areas_drop_view_lines() {
        let mut collection = WrappedLinesCollection::new(vec![
            None,
            Some(plain_breaks(&[5, 9])),
            None,
            None,
        ]);
        assert_eq!(collection.view_line_count(), 5);

        let changed = collection.set_hidden_areas(&[((2, 1), (3, 1)).into()]);
        assert!(changed);
        assert_eq!(collection.view_line_count(), 2);
        assert!(!collection.is_visible(2));
        assert!(!collection.is_visible(3));
        assert_eq!(collection.get_model_line_view_line_count(2), 0);
        assert_eq!(collection.model_line_of_view_line(2), (4, 0));

        // Same areas again: no change.
        assert!(!collection.set_hidden_areas(&[((2, 1), (3, 1)).into()]));

        assert!(collection.set_hidden_areas(&[]));
        assert_eq!(collection.view_line_count(), 5);
    }

    #[test]
    fn test_hidden_area_lookup_skips_to_visible_line() {
        let mut collection =
            WrappedLinesCollection::new(vec![None, None, None]);
        collection.set_hidden_areas(&[((1, 1), (2, 1)).into()]);
        assert_eq!(collection.view_line_count(), 1);
        assert_eq!(collection.model_line_of_view_line(1), (3, 0));
        assert_eq!(collection.nearest_visible_line(1), 3);
    }

    #[test]
    fn test_mutations_bump_generation_and_update_counts() {
        let mut collection = WrappedLinesCollection::new(vec![None, None]);
        let generation = collection.generation();

        collection.on_line_changed(2, Some(plain_breaks(&[4, 8])));
        assert_eq!(collection.view_line_count(), 3);
        assert!(collection.generation() > generation);

        collection.on_lines_inserted(2, vec![None, Some(plain_breaks(&[3, 6]))]);
        assert_eq!(collection.len(), 4);
        assert_eq!(collection.view_line_count(), 6);

        collection.on_lines_deleted(2, 3);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.view_line_count(), 3);

        collection.on_flushed(vec![None]);
        assert_eq!(collection.view_line_count(), 1);
    }

    #[test]
    fn test_view_line_data_for_wrapped_line() {
        let (model, collection) =
            collection_for("    alpha beta gamma delta epsilon", WrapOptions::new(16, 4));
        assert!(collection.view_line_count() > 1);

        let first = collection.view_line_data(1, &model);
        assert_eq!(first.min_column, 1);
        assert!(first.continues_with_wrapped_line);
        assert_eq!(first.start_visible_column, 0);

        let second = collection.view_line_data(2, &model);
        // Continuation lines carry the wrapped indentation.
        assert!(second.content.starts_with("    "));
        assert_eq!(second.min_column, 5);
        assert!(second.start_visible_column > 0);
        assert_eq!(second.max_column, second.content.chars().count() + 1);
    }

    #[test]
    fn test_view_line_data_reassembles_full_text() {
        let text = "one two three four five six seven eight nine ten";
        let (model, collection) = collection_for(text, WrapOptions::new(12, 4));

        let mut reassembled = String::new();
        for view_line in 1..=collection.view_line_count() {
            let data = collection.view_line_data(view_line, &model);
            reassembled.push_str(data.content.trim_start());
        }
        assert_eq!(reassembled.replace(' ', ""), text.replace(' ', ""));
    }

    #[test]
    fn test_view_line_data_with_injected_class() {
        let mut model = RopeTextModel::new("let x = compute();");
        model.set_injected_texts(
            1,
            vec![InjectedText::new(5, ": u32").with_class("inline-hint")],
        );
        let mut computer = LineBreaksComputer::new(WrapOptions::new(80, 4));
        computer.add_request(&model.line_content(1), model.injected_texts(1), None);
        let collection = WrappedLinesCollection::new(computer.finish());

        let data = collection.view_line_data(1, &model);
        assert_eq!(data.content, "let x: u32 = compute();");
        let decorations = data.inline_decorations.unwrap();
        assert_eq!(decorations, vec![SingleLineInlineDecoration::new(
            5,
            10,
            "inline-hint"
        )]);
        // Tokens cover the injected content too.
        assert_eq!(
            data.tokens.spans().last().unwrap().end_offset,
            data.content.chars().count()
        );
    }

    #[test]
    fn test_expand_tokens_stretches_interrupted_run() {
        let tokens = LineTokens::from_spans([
            TokenSpan {
                end_offset: 5,
                style_id: 1,
            },
            TokenSpan {
                end_offset: 10,
                style_id: 2,
            },
        ]);
        let injections = vec![InjectedText::new(3, "abc")];
        let expanded = expand_tokens(&tokens, &injections, 13);
        assert_eq!(expanded.spans(), &[
            TokenSpan {
                end_offset: 8,
                style_id: 1
            },
            TokenSpan {
                end_offset: 13,
                style_id: 2
            },
        ]);
    }

    #[test]
    fn test_char_slice_handles_multibyte() {
        assert_eq!(char_slice("héllo", 1..3), "él");
        assert_eq!(char_slice("中文abc", 2..5), "abc");
        assert_eq!(char_slice("abc", 3..3), "");
    }

    #[test]
    fn test_empty_collection() {
        let collection = WrappedLinesCollection::new(Vec::new());
        assert!(collection.is_empty());
        assert_eq!(collection.view_line_count(), 0);
    }
}
