//! Placement plans.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::CodecError;
use super::token::ActionToken;

/// Number of cells, and of controllers.
pub const CELL_COUNT: usize = 4;

/// A cell position, 1 to 4.
///
/// The cell number is also the controller index and the position of the
/// cell's chunk in an [`super::EncodedCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CellId(u8);

impl CellId {
    /// `None` unless `number` is 1 to 4.
    pub fn new(number: u8) -> Option<Self> {
        (1..=CELL_COUNT as u8).contains(&number).then_some(Self(number))
    }

    /// All cells in order.
    pub fn all() -> impl Iterator<Item = CellId> {
        (1..=CELL_COUNT as u8).map(CellId)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Zero-based position.
    pub fn index(&self) -> usize {
        usize::from(self.0) - 1
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered actions for each of the four cells.
///
/// A cell with no actions is `unchanged`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPlan {
    cells: [Vec<ActionToken>; CELL_COUNT],
}

impl PlacementPlan {
    /// Plan that leaves every cell unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, cell: CellId, actions: Vec<ActionToken>) -> Self {
        self.set_cell(cell, actions);
        self
    }

    pub fn set_cell(&mut self, cell: CellId, actions: Vec<ActionToken>) {
        self.cells[cell.index()] = actions;
    }

    /// Actions of `cell`; empty means unchanged.
    pub fn cell(&self, cell: CellId) -> &[ActionToken] {
        &self.cells[cell.index()]
    }

    /// Build a plan from plan JSON.
    ///
    /// Accepts `{"task_sequence": {...}}` or a bare cell map keyed `"1"` to
    /// `"4"`. A cell value is a list of tokens, or one string holding tokens
    /// separated by `;` or newlines. Missing or null cells are unchanged and
    /// other keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let sequence = value.get("task_sequence").unwrap_or(value);
        let map = sequence.as_object().ok_or_else(|| {
            CodecError::InvalidPlan("task sequence must be an object of cells".to_string())
        })?;

        let mut plan = Self::new();
        for cell in CellId::all() {
            let actions = match map.get(&cell.to_string()) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::String(text)) => parse_tokens(split_action_string(text))?,
                Some(Value::Array(items)) => parse_tokens(array_tokens(cell, items)?)?,
                Some(other) => {
                    return Err(CodecError::InvalidPlan(format!(
                        "cell {cell} must be a list or string, got {other}"
                    )))
                }
            };
            plan.set_cell(cell, actions);
        }
        Ok(plan)
    }

    /// Parse plan JSON text. See [`PlacementPlan::from_value`].
    pub fn from_json_str(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::InvalidPlan(format!("invalid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// `{"task_sequence": {"1": [...], ...}}` with every cell spelled out.
    pub fn to_value(&self) -> Value {
        let cells: Map<String, Value> = CellId::all()
            .map(|cell| {
                let actions = match self.cell(cell) {
                    [] => vec![Value::String(ActionToken::Unchanged.to_string())],
                    actions => actions
                        .iter()
                        .map(|a| Value::String(a.to_string()))
                        .collect(),
                };
                (cell.to_string(), Value::Array(actions))
            })
            .collect();
        let mut root = Map::new();
        root.insert("task_sequence".to_string(), Value::Object(cells));
        Value::Object(root)
    }
}

fn split_action_string(text: &str) -> Vec<String> {
    text.split(|c: char| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn array_tokens(cell: CellId, items: &[Value]) -> Result<Vec<String>, CodecError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(CodecError::InvalidPlan(format!(
                "cell {cell} contains a non-token value {other}"
            ))),
        })
        .filter(|token| !matches!(token, Ok(t) if t.is_empty()))
        .collect()
}

fn parse_tokens(tokens: Vec<String>) -> Result<Vec<ActionToken>, CodecError> {
    tokens.iter().map(|t| t.parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RailPosition, SeatAngle};
    use serde_json::json;

    fn cell(n: u8) -> CellId {
        CellId::new(n).unwrap()
    }

    #[test]
    fn test_cell_ids() {
        assert!(CellId::new(0).is_none());
        assert!(CellId::new(5).is_none());
        assert_eq!(cell(3).index(), 2);
        assert_eq!(CellId::all().count(), CELL_COUNT);
    }

    #[test]
    fn test_task_sequence_wrapper_and_bare_map() {
        let wrapped = json!({"task_sequence": {"2": ["fold"]}});
        let bare = json!({"2": ["fold"]});
        let a = PlacementPlan::from_value(&wrapped).unwrap();
        let b = PlacementPlan::from_value(&bare).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cell(cell(2)), &[ActionToken::Fold]);
        assert!(a.cell(cell(1)).is_empty());
    }

    #[test]
    fn test_string_cells_are_split() {
        let plan = PlacementPlan::from_value(&json!({
            "1": "seat_rotate(90); move_on_rail('A')",
            "3": "fold\nunfold\n",
            "4": "",
        }))
        .unwrap();

        assert_eq!(
            plan.cell(cell(1)),
            &[
                ActionToken::SeatRotate(SeatAngle::Deg90),
                ActionToken::MoveOnRail(RailPosition::A)
            ]
        );
        assert_eq!(plan.cell(cell(3)), &[ActionToken::Fold, ActionToken::Unfold]);
        assert!(plan.cell(cell(4)).is_empty());
    }

    #[test]
    fn test_null_cell_and_extra_keys() {
        let plan = PlacementPlan::from_value(&json!({"1": null, "7": ["nonsense"]})).unwrap();
        assert_eq!(plan, PlacementPlan::new());
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(
            PlacementPlan::from_value(&json!(["fold"])),
            Err(CodecError::InvalidPlan(_))
        ));
        assert!(matches!(
            PlacementPlan::from_value(&json!({"1": {"a": 1}})),
            Err(CodecError::InvalidPlan(_))
        ));
        assert!(matches!(
            PlacementPlan::from_value(&json!({"1": [null]})),
            Err(CodecError::InvalidPlan(_))
        ));
        assert!(matches!(
            PlacementPlan::from_json_str("{oops"),
            Err(CodecError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_bad_token_fails_whole_plan() {
        let result = PlacementPlan::from_value(&json!({"1": ["fold"], "2": ["fly(3)"]}));
        assert!(matches!(result, Err(CodecError::Validation { .. })));
    }

    #[test]
    fn test_to_value_parses_back() {
        let plan = PlacementPlan::new().with_cell(cell(4), vec![ActionToken::Fold]);
        let value = plan.to_value();
        assert_eq!(value["task_sequence"]["1"], json!(["unchanged"]));
        assert_eq!(value["task_sequence"]["4"], json!(["fold"]));

        let reparsed = PlacementPlan::from_value(&value).unwrap();
        assert_eq!(reparsed.cell(cell(4)), &[ActionToken::Fold]);
        assert_eq!(reparsed.cell(cell(1)), &[ActionToken::Unchanged]);
    }
}
