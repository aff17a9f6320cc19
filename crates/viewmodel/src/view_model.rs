use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::sync::Arc;

use itertools::Itertools;

use crate::decoration::{InlineDecoration, ViewModelDecoration};
use crate::display_map::{
    CoordinatesConverter as _, LineBreakData, LineBreaksComputer, ViewCoordinatesConverter,
    WrappedLinesCollection,
};
use crate::options::WrapOptions;
use crate::position::{Position, TextRange};
use crate::text_model::{DecorationProvider, TextModel};
use crate::view_line::{MinimapLinesRenderingData, ViewLineData, ViewLineRenderingData};
use crate::viewport::Viewport;

/// A change to the projected view.
///
/// Payloads carry model-line numbers. [`ViewModelEvent::Flushed`] carries no
/// payload on purpose: it means everything changed and consumers must
/// recompute fully, never incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewModelEvent {
    Flushed,
    ConfigurationChanged,
    LinesChanged { from_line: usize, to_line: usize },
    LinesInserted { from_line: usize, to_line: usize },
    LinesDeleted { from_line: usize, to_line: usize },
    HiddenAreasChanged,
}

/// The cursor subsystem, reached through the facade's pass-through
/// operations. Owns its own state machine; this core only reads, writes and
/// repairs positions.
pub trait CursorHost {
    fn primary_position(&self) -> Position;
    fn set_primary_position(&mut self, position: Position);
}

/// Minimal in-memory cursor host, for tests and simple embedders.
#[derive(Debug, Clone, Copy)]
pub struct SingleCursor {
    position: Position,
}

impl Default for SingleCursor {
    fn default() -> Self {
        Self {
            position: Position::new(1, 1),
        }
    }
}

impl CursorHost for SingleCursor {
    fn primary_position(&self) -> Position {
        self.position
    }

    fn set_primary_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// Decorations prepared for one viewport range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewportDecorations {
    /// All decorations touching the range, in view space, ordered by start.
    pub decorations: Vec<ViewModelDecoration>,
    /// Inline decorations per view line of the requested range.
    pub inline_decorations: Vec<Vec<InlineDecoration>>,
}

struct DecorationsCache {
    view_range: TextRange,
    generation: u64,
    value: ViewportDecorations,
}

type Listener = Box<dyn Fn(&ViewModelEvent)>;

/// The view model facade: composes the line-break cache with viewport state,
/// decoration retrieval and cursor pass-through, and assembles the per-line
/// rendering data the view layer consumes.
///
/// Single-threaded and synchronous; every operation runs to completion on the
/// calling thread. The owner of document mutation is responsible for calling
/// the `on_model_*` notifications after each edit, serialized against any
/// in-flight line-breaks batch.
pub struct ViewModel<M: TextModel + DecorationProvider> {
    model: M,
    options: WrapOptions,
    lines: WrappedLinesCollection,
    viewport: Viewport,
    viewport_lines: Option<(usize, usize)>,
    cursor: Box<dyn CursorHost>,
    listeners: Vec<Listener>,
    decorations_cache: RefCell<Option<DecorationsCache>>,
}

impl<M: TextModel + DecorationProvider> ViewModel<M> {
    pub fn new(model: M, options: WrapOptions) -> Self {
        let lines = WrappedLinesCollection::new(compute_all_breaks(&model, options));
        Self {
            model,
            options,
            lines,
            viewport: Viewport::default(),
            viewport_lines: None,
            cursor: Box::new(SingleCursor::default()),
            listeners: Vec::new(),
            decorations_cache: RefCell::new(None),
        }
    }

    pub fn with_cursor_host(mut self, cursor: Box<dyn CursorHost>) -> Self {
        self.cursor = cursor;
        self
    }

    #[inline]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The document layer is external; edits go through here and must be
    /// followed by the matching `on_model_*` notification.
    #[inline]
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    #[inline]
    pub fn wrap_options(&self) -> WrapOptions {
        self.options
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn view_line_count(&self) -> usize {
        self.lines.view_line_count()
    }

    /// The converter over the current projection state.
    pub fn coordinates(&self) -> ViewCoordinatesConverter<'_> {
        ViewCoordinatesConverter::new(&self.lines, &self.model)
    }

    // ==================== Change notification ====================

    pub fn subscribe(&mut self, listener: impl Fn(&ViewModelEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&self, event: ViewModelEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    // ==================== Model change handling ====================

    /// Re-project a single changed line.
    pub fn on_model_line_changed(&mut self, line_number: usize) {
        let breaks = self.compute_breaks_for(line_number..=line_number).remove(0);
        self.lines.on_line_changed(line_number, breaks);
        self.repair_cursor();
        self.emit(ViewModelEvent::LinesChanged {
            from_line: line_number,
            to_line: line_number,
        });
    }

    /// Project lines newly inserted at `from_line..=to_line` (the model
    /// already contains them).
    pub fn on_model_lines_inserted(&mut self, from_line: usize, to_line: usize) {
        let results = self.compute_breaks_for(from_line..=to_line);
        self.lines.on_lines_inserted(from_line, results);
        self.repair_cursor();
        self.emit(ViewModelEvent::LinesInserted { from_line, to_line });
    }

    /// Drop projections of deleted lines `from_line..=to_line`.
    pub fn on_model_lines_deleted(&mut self, from_line: usize, to_line: usize) {
        self.lines.on_lines_deleted(from_line, to_line);
        self.repair_cursor();
        self.emit(ViewModelEvent::LinesDeleted { from_line, to_line });
    }

    /// The model was replaced wholesale; re-project everything.
    pub fn on_model_flushed(&mut self) {
        let results = compute_all_breaks(&self.model, self.options);
        self.lines.on_flushed(results);
        self.repair_cursor();
        self.emit(ViewModelEvent::Flushed);
    }

    /// Change wrapping options, reusing previous break data when only the
    /// wrapping column differs.
    pub fn set_wrap_options(&mut self, options: WrapOptions) {
        if options == self.options {
            return;
        }
        let column_only_change = WrapOptions {
            wrapping_column: options.wrapping_column,
            ..self.options
        } == options;

        let mut computer = LineBreaksComputer::new(options);
        for line_number in 1..=self.model.line_count() {
            let previous = if column_only_change {
                self.lines.line_breaks(line_number).cloned()
            } else {
                None
            };
            computer.add_request(
                &self.model.line_content(line_number),
                self.model.injected_texts(line_number),
                previous,
            );
        }
        self.options = options;
        self.lines.on_flushed(computer.finish());
        self.repair_cursor();
        self.emit(ViewModelEvent::ConfigurationChanged);
        self.emit(ViewModelEvent::Flushed);
    }

    /// Replace the hidden (folded) areas, as decided by the folding
    /// collaborator.
    pub fn set_hidden_areas(&mut self, areas: &[TextRange]) {
        if self.lines.set_hidden_areas(areas) {
            self.repair_cursor();
            self.emit(ViewModelEvent::HiddenAreasChanged);
        }
    }

    /// Fresh break computation for a line range; previous data is never a
    /// valid reuse hint after the text itself changed.
    fn compute_breaks_for(&self, lines: RangeInclusive<usize>) -> Vec<Option<Arc<LineBreakData>>> {
        let mut computer = LineBreaksComputer::new(self.options);
        for line_number in lines {
            computer.add_request(
                &self.model.line_content(line_number),
                self.model.injected_texts(line_number),
                None,
            );
        }
        computer.finish()
    }

    // ==================== Cursor pass-through ====================

    pub fn primary_cursor(&self) -> Position {
        self.cursor.primary_position()
    }

    pub fn primary_cursor_view_position(&self) -> Position {
        self.coordinates()
            .convert_model_position_to_view_position(self.cursor.primary_position())
    }

    pub fn set_primary_cursor(&mut self, model_position: Position) {
        self.cursor.set_primary_position(model_position);
    }

    /// Snap the cursor back onto a valid position after a structural change,
    /// keeping the intended column where possible.
    fn repair_cursor(&mut self) {
        let expected = self.cursor.primary_position();
        let converter = ViewCoordinatesConverter::new(&self.lines, &self.model);
        let view = converter.convert_model_position_to_view_position(expected);
        let repaired = converter.convert_view_position_to_model_position(view);
        if repaired != expected {
            self.cursor.set_primary_position(repaired);
        }
    }

    // ==================== Viewport ====================

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport_rect(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Performance hint: the view layer is showing these view lines, so
    /// background tokenization should prioritize them. Never required for
    /// correctness.
    pub fn set_viewport(&mut self, start_view_line: usize, end_view_line: usize, _centered: bool) {
        self.viewport_lines = Some((start_view_line, end_view_line));
        self.tokenize_viewport();
    }

    /// Forward the current viewport hint to the tokenizer. Safe to call at
    /// any time, including before any viewport was set.
    pub fn tokenize_viewport(&self) {
        let Some((start_view_line, end_view_line)) = self.viewport_lines else {
            return;
        };
        let converter = self.coordinates();
        let start = converter
            .convert_view_position_to_model_position(Position::new(start_view_line, 1))
            .line;
        let end = converter
            .convert_view_position_to_model_position(Position::new(end_view_line, 1))
            .line;
        self.model.prioritize_tokenization(start..end + 1);
    }

    // ==================== Rendering data ====================

    pub fn get_view_line_data(&self, view_line: usize) -> ViewLineData {
        self.lines.view_line_data(view_line, &self.model)
    }

    pub fn get_view_line_rendering_data(&self, view_line: usize) -> ViewLineRenderingData {
        let data = self.lines.view_line_data(view_line, &self.model);
        ViewLineRenderingData::from_view_line_data(
            data,
            view_line,
            self.model.tab_size(),
            self.model.might_contain_non_basic_ascii(),
            self.model.might_contain_rtl(),
        )
    }

    /// Bulk rendering data; `needed[i]` gates line `start_view_line + i`.
    pub fn get_view_lines_data(
        &self,
        start_view_line: usize,
        end_view_line: usize,
        needed: &[bool],
    ) -> Vec<Option<ViewLineData>> {
        self.lines
            .view_lines_data(start_view_line, end_view_line, needed, &self.model)
    }

    pub fn get_minimap_lines_rendering_data(
        &self,
        start_view_line: usize,
        end_view_line: usize,
        needed: &[bool],
    ) -> MinimapLinesRenderingData {
        MinimapLinesRenderingData {
            tab_size: self.model.tab_size(),
            data: self
                .lines
                .view_lines_data(start_view_line, end_view_line, needed, &self.model),
        }
    }

    // ==================== Decorations ====================

    /// Model decorations projected into the given view range, cached per
    /// (range, cache generation).
    pub fn decorations_in_viewport(&self, view_range: TextRange) -> ViewportDecorations {
        if let Some(cache) = &*self.decorations_cache.borrow() {
            if cache.view_range == view_range && cache.generation == self.lines.generation() {
                return cache.value.clone();
            }
        }

        let value = self.compute_viewport_decorations(view_range);
        *self.decorations_cache.borrow_mut() = Some(DecorationsCache {
            view_range,
            generation: self.lines.generation(),
            value: value.clone(),
        });
        value
    }

    fn compute_viewport_decorations(&self, view_range: TextRange) -> ViewportDecorations {
        let converter = self.coordinates();
        let model_range = converter.convert_view_range_to_model_range(view_range);

        let start_line = view_range.start.line;
        let end_line = view_range.end.line.max(start_line);
        let mut inline_decorations: Vec<Vec<InlineDecoration>> =
            vec![Vec::new(); end_line - start_line + 1];
        let mut decorations = Vec::new();

        let model_decorations = self
            .model
            .decorations_in_range(model_range)
            .into_iter()
            .sorted_by_key(|d| d.range.start)
            .collect_vec();

        for decoration in model_decorations {
            let range = converter.convert_model_range_to_view_range(decoration.range);
            decorations.push(ViewModelDecoration {
                range,
                options: decoration.options.clone(),
            });

            let Some(inline_class_name) = &decoration.options.inline_class_name else {
                continue;
            };
            for view_line in range.start.line.max(start_line)..=range.end.line.min(end_line) {
                let (min_column, max_column) = converter.view_line_column_bounds(view_line);
                let start_column = if view_line == range.start.line {
                    range.start.column.max(min_column)
                } else {
                    min_column
                };
                let end_column = if view_line == range.end.line {
                    range.end.column.min(max_column)
                } else {
                    max_column
                };
                if start_column < end_column {
                    inline_decorations[view_line - start_line].push(InlineDecoration::new(
                        TextRange::new(
                            Position::new(view_line, start_column),
                            Position::new(view_line, end_column),
                        ),
                        inline_class_name.clone(),
                        decoration.options.kind,
                    ));
                }
            }
        }

        ViewportDecorations {
            decorations,
            inline_decorations,
        }
    }
}

fn compute_all_breaks<M: TextModel>(
    model: &M,
    options: WrapOptions,
) -> Vec<Option<Arc<LineBreakData>>> {
    let mut computer = LineBreaksComputer::new(options);
    for line_number in 1..=model.line_count() {
        computer.add_request(
            &model.line_content(line_number),
            model.injected_texts(line_number),
            None,
        );
    }
    computer.finish()
}
