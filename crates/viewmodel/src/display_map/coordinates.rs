use crate::position::{Position, TextRange};
use crate::text_model::TextModel;

use super::lines_collection::WrappedLinesCollection;

/// Model ↔ view position translation.
///
/// Implementations are stateless services over the current line-break cache;
/// conversions of canonical positions are mutual inverses, and out-of-range
/// input is clamped, never an error.
pub trait CoordinatesConverter {
    fn convert_view_position_to_model_position(&self, view_position: Position) -> Position;

    fn convert_model_position_to_view_position(&self, model_position: Position) -> Position;

    fn convert_view_range_to_model_range(&self, view_range: TextRange) -> TextRange {
        TextRange::new(
            self.convert_view_position_to_model_position(view_range.start),
            self.convert_view_position_to_model_position(view_range.end),
        )
    }

    fn convert_model_range_to_view_range(&self, model_range: TextRange) -> TextRange {
        TextRange::new(
            self.convert_model_position_to_view_position(model_range.start),
            self.convert_model_position_to_view_position(model_range.end),
        )
    }

    /// Repair a possibly-stale view position: when it no longer resolves to
    /// `expected_model_position`, answer the canonical view position of the
    /// expected one instead. Best-effort correction, never a failure.
    fn validate_view_position(
        &self,
        view_position: Position,
        expected_model_position: Position,
    ) -> Position;

    fn validate_view_range(&self, view_range: TextRange, expected_model_range: TextRange) -> TextRange {
        TextRange::new(
            self.validate_view_position(view_range.start, expected_model_range.start),
            self.validate_view_position(view_range.end, expected_model_range.end),
        )
    }

    /// False only when the position's line is inside a hidden (folded) area.
    fn model_position_is_visible(&self, model_position: Position) -> bool;

    /// Output lines the model line occupies; 1 when unwrapped.
    fn get_model_line_view_line_count(&self, model_line_number: usize) -> usize;
}

/// The production converter, borrowing the current projection state.
pub struct ViewCoordinatesConverter<'a> {
    lines: &'a WrappedLinesCollection,
    model: &'a dyn TextModel,
}

impl<'a> ViewCoordinatesConverter<'a> {
    pub fn new(lines: &'a WrappedLinesCollection, model: &'a dyn TextModel) -> Self {
        Self { lines, model }
    }

    /// Min and max column (1-based, inclusive bounds) of a view line.
    pub(crate) fn view_line_column_bounds(&self, view_line: usize) -> (usize, usize) {
        let (model_line, output_index) = self.lines.model_line_of_view_line(view_line);
        match self.lines.line_breaks(model_line) {
            None => (1, self.model.line_len(model_line) + 1),
            Some(breaks) => {
                let indent = if output_index > 0 {
                    breaks.wrapped_indent_len
                } else {
                    0
                };
                (
                    indent + 1,
                    indent + breaks.output_line_len(output_index) + 1,
                )
            }
        }
    }
}

impl CoordinatesConverter for ViewCoordinatesConverter<'_> {
    fn convert_view_position_to_model_position(&self, view_position: Position) -> Position {
        let total = self.lines.view_line_count();
        if total == 0 {
            return Position::new(1, 1);
        }
        let view_line = view_position.line.clamp(1, total);
        let (model_line, output_index) = self.lines.model_line_of_view_line(view_line);

        match self.lines.line_breaks(model_line) {
            None => {
                let max_column = self.model.line_len(model_line) + 1;
                Position::new(model_line, view_position.column.clamp(1, max_column))
            }
            Some(breaks) => {
                let indent = if output_index > 0 {
                    breaks.wrapped_indent_len
                } else {
                    0
                };
                let output_offset = view_position
                    .column
                    .saturating_sub(1)
                    .saturating_sub(indent)
                    .min(breaks.output_line_len(output_index));
                let input_offset = breaks.output_position_to_input_offset(output_index, output_offset);
                let line_len = self.model.line_len(model_line);
                Position::new(model_line, input_offset.min(line_len) + 1)
            }
        }
    }

    fn convert_model_position_to_view_position(&self, model_position: Position) -> Position {
        if self.lines.is_empty() || self.lines.view_line_count() == 0 {
            return Position::new(1, 1);
        }
        let line_number = model_position.line.clamp(1, self.lines.len());

        if !self.lines.is_visible(line_number) {
            // Folded away: land at the start of the nearest visible line.
            let nearest = self.lines.nearest_visible_line(line_number);
            return Position::new(self.lines.view_line_start(nearest) + 1, 1);
        }

        let view_start = self.lines.view_line_start(line_number);
        match self.lines.line_breaks(line_number) {
            None => {
                let max_column = self.model.line_len(line_number) + 1;
                Position::new(view_start + 1, model_position.column.clamp(1, max_column))
            }
            Some(breaks) => {
                let line_len = self.model.line_len(line_number);
                let input_offset = model_position.column.saturating_sub(1).min(line_len);
                let output = breaks.input_offset_to_output_position(input_offset);
                let indent = if output.line_index > 0 {
                    breaks.wrapped_indent_len
                } else {
                    0
                };
                Position::new(view_start + output.line_index + 1, output.offset + indent + 1)
            }
        }
    }

    fn validate_view_position(
        &self,
        view_position: Position,
        expected_model_position: Position,
    ) -> Position {
        let total = self.lines.view_line_count();
        if total == 0 {
            return Position::new(1, 1);
        }
        let view_line = view_position.line.clamp(1, total);
        let (min_column, max_column) = self.view_line_column_bounds(view_line);
        let candidate = Position::new(view_line, view_position.column.clamp(min_column, max_column));

        let resolved = self.convert_view_position_to_model_position(candidate);
        if resolved == expected_model_position {
            return candidate;
        }
        tracing::trace!(
            %candidate,
            %resolved,
            expected = %expected_model_position,
            "stale view position repaired"
        );
        self.convert_model_position_to_view_position(expected_model_position)
    }

    fn model_position_is_visible(&self, model_position: Position) -> bool {
        model_position.line >= 1
            && model_position.line <= self.lines.len()
            && self.lines.is_visible(model_position.line)
    }

    fn get_model_line_view_line_count(&self, model_line_number: usize) -> usize {
        self.lines.get_model_line_view_line_count(model_line_number)
    }
}

/// Test double: view space equals model space.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCoordinatesConverter;

impl CoordinatesConverter for IdentityCoordinatesConverter {
    fn convert_view_position_to_model_position(&self, view_position: Position) -> Position {
        view_position
    }

    fn convert_model_position_to_view_position(&self, model_position: Position) -> Position {
        model_position
    }

    fn validate_view_position(
        &self,
        _view_position: Position,
        expected_model_position: Position,
    ) -> Position {
        expected_model_position
    }

    fn model_position_is_visible(&self, _model_position: Position) -> bool {
        true
    }

    fn get_model_line_view_line_count(&self, _model_line_number: usize) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use smallvec::smallvec;

    use super::*;
    use crate::display_map::line_breaks::LineBreakData;
    use crate::text_model::RopeTextModel;

    /// A 38-char function line wrapped as [0,20) + [20,38), continuation
    /// indent 4, followed by a plain short line.
    fn wrapped_fixture() -> (RopeTextModel, WrappedLinesCollection) {
        let model = RopeTextModel::new("function foobar(aa, b) { return a+b; }\nshort");
        let data = Arc::new(LineBreakData::new(
            smallvec![20, 38],
            smallvec![20, 38],
            4,
            None,
        ));
        let collection = WrappedLinesCollection::new(vec![Some(data), None]);
        (model, collection)
    }

    #[test]
    fn test_model_to_view_inside_wrapped_line() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        // Model offset 25 lands on the second sub-line at offset 5; the view
        // column adds the wrapped indentation.
        assert_eq!(
            converter.convert_model_position_to_view_position(Position::new(1, 26)),
            Position::new(2, 10)
        );
        assert_eq!(
            converter.convert_view_position_to_model_position(Position::new(2, 10)),
            Position::new(1, 26)
        );
    }

    #[test]
    fn test_wrap_boundary_round_trips_without_drift() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        // Offset 20 is the canonical boundary: start of the second sub-line.
        let view = converter.convert_model_position_to_view_position(Position::new(1, 21));
        assert_eq!(view, Position::new(2, 5));
        assert_eq!(
            converter.convert_view_position_to_model_position(view),
            Position::new(1, 21)
        );

        // Every canonical model position on the line round-trips.
        for column in 1..=39 {
            let model_position = Position::new(1, column);
            let view = converter.convert_model_position_to_view_position(model_position);
            assert_eq!(
                converter.convert_view_position_to_model_position(view),
                model_position,
                "column {column} drifted"
            );
        }
    }

    #[test]
    fn test_view_column_inside_indent_clamps_to_segment_start() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        for column in 1..=5 {
            assert_eq!(
                converter.convert_view_position_to_model_position(Position::new(2, column)),
                Position::new(1, 21)
            );
        }
    }

    #[test]
    fn test_lines_after_wrapped_line_shift_down() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        assert_eq!(
            converter.convert_model_position_to_view_position(Position::new(2, 3)),
            Position::new(3, 3)
        );
        assert_eq!(
            converter.convert_view_position_to_model_position(Position::new(3, 3)),
            Position::new(2, 3)
        );
        assert_eq!(converter.get_model_line_view_line_count(1), 2);
        assert_eq!(converter.get_model_line_view_line_count(2), 1);
    }

    #[test]
    fn test_out_of_range_positions_clamp() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        // Past the last view line and column.
        assert_eq!(
            converter.convert_view_position_to_model_position(Position::new(99, 99)),
            Position::new(2, 6)
        );
        // Past the last model line.
        assert_eq!(
            converter.convert_model_position_to_view_position(Position::new(99, 1)),
            Position::new(3, 1)
        );
    }

    #[test]
    fn test_range_conversion_preserves_emptiness() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        let empty = TextRange::new(Position::new(1, 21), Position::new(1, 21));
        let view_range = converter.convert_model_range_to_view_range(empty);
        assert!(view_range.is_empty());

        let range = TextRange::new(Position::new(1, 10), Position::new(2, 4));
        let view_range = converter.convert_model_range_to_view_range(range);
        assert_eq!(view_range, ((1, 10), (3, 4)).into());
        assert_eq!(converter.convert_view_range_to_model_range(view_range), range);
    }

    #[test]
    fn test_validate_view_position_keeps_consistent_input() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        let view = Position::new(2, 10);
        assert_eq!(
            converter.validate_view_position(view, Position::new(1, 26)),
            view
        );
    }

    #[test]
    fn test_validate_view_position_repairs_stale_input() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        // A view position captured before an edit no longer matches.
        assert_eq!(
            converter.validate_view_position(Position::new(9, 42), Position::new(1, 26)),
            Position::new(2, 10)
        );
        // Column clamped into the view line keeps the intended model column.
        assert_eq!(
            converter.validate_view_position(Position::new(3, 99), Position::new(2, 6)),
            Position::new(3, 6)
        );
    }

    #[test]
    fn test_validate_view_range_repairs_both_endpoints() {
        let (model, collection) = wrapped_fixture();
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        let stale = TextRange::new(Position::new(7, 1), Position::new(8, 2));
        let expected = TextRange::new(Position::new(1, 10), Position::new(1, 26));
        assert_eq!(
            converter.validate_view_range(stale, expected),
            ((1, 10), (2, 10)).into()
        );
    }

    #[test]
    fn test_hidden_lines_visibility() {
        let (model, mut collection) = wrapped_fixture();
        collection.set_hidden_areas(&[((1, 1), (1, 1)).into()]);
        let converter = ViewCoordinatesConverter::new(&collection, &model);

        assert!(!converter.model_position_is_visible(Position::new(1, 5)));
        assert!(converter.model_position_is_visible(Position::new(2, 1)));
        assert_eq!(converter.get_model_line_view_line_count(1), 0);

        // Positions on the hidden line resolve to the nearest visible line.
        assert_eq!(
            converter.convert_model_position_to_view_position(Position::new(1, 30)),
            Position::new(1, 1)
        );
    }

    #[test]
    fn test_identity_converter() {
        let converter = IdentityCoordinatesConverter;
        let position = Position::new(7, 3);
        assert_eq!(
            converter.convert_model_position_to_view_position(position),
            position
        );
        assert_eq!(
            converter.convert_view_position_to_model_position(position),
            position
        );
        assert_eq!(converter.get_model_line_view_line_count(7), 1);
        assert!(converter.model_position_is_visible(position));
        assert_eq!(
            converter.validate_view_position(Position::new(1, 1), position),
            position
        );
    }
}
