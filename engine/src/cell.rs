//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: A cell is one of three kinds — empty, plain text, or a formula
//! with a memoized result. Classifying raw input text into a kind is kept
//! separate (`PendingContent::classify`) from committing it to a cell, so a
//! parse failure or a rejected cycle never mutates sheet state.

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

use parser::ast::Expr;
use parser::position::Position;
use parser::ParseError;

use crate::eval::{CellResolver, Evaluator};

/// Marks a cell's raw text as a formula.
pub const FORMULA_SIGN: char = '=';
/// Escapes a leading `FORMULA_SIGN` so the text is stored literally.
pub const ESCAPE_SIGN: char = '`';

/// Errors a formula's own evaluation can produce. Distinct from `SheetError`:
/// this is a value that flows through `CellValue`, not a Rust control-flow error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    /// A referenced position is out of range, or its own value can't resolve.
    Ref,
    /// A referenced text cell's contents don't parse as a finite number.
    Value,
    /// An operation produced NaN/±infinity, or divided by exactly zero.
    Arithmetic,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Arithmetic => "#ARITHM!",
        };
        write!(f, "{}", token)
    }
}

/// The value a cell presents to a caller of `Sheet::get_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// An empty cell's value, or a text cell's (escape-stripped) contents.
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
enum Kind {
    Empty,
    Text(String),
    Formula {
        expr: Expr,
        refs: Vec<Position>,
        cache: RefCell<Option<Result<f64, FormulaError>>>,
    },
}

/// Raw `text` classified into what it would become, before it is committed
/// to a `Cell`. Built ahead of any graph mutation: a cycle found while
/// wiring `refs` into the sheet's dependency graph must leave the sheet
/// untouched, so nothing here may be applied until that check passes.
pub(crate) enum PendingContent {
    Empty,
    Text(String),
    Formula { expr: Expr, refs: Vec<Position> },
}

impl PendingContent {
    pub(crate) fn classify(text: &str) -> Result<PendingContent, ParseError> {
        if text.is_empty() {
            Ok(PendingContent::Empty)
        } else if text.len() > 1 && text.starts_with(FORMULA_SIGN) {
            let expr = parser::parse(&text[FORMULA_SIGN.len_utf8()..])?;
            let refs = expr.referenced_cells();
            Ok(PendingContent::Formula { expr, refs })
        } else {
            Ok(PendingContent::Text(text.to_string()))
        }
    }

    pub(crate) fn refs(&self) -> &[Position] {
        match self {
            PendingContent::Formula { refs, .. } => refs,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub struct Cell {
    kind: Kind,
}

impl Cell {
    pub fn new() -> Self {
        Cell { kind: Kind::Empty }
    }

    pub(crate) fn apply(&mut self, content: PendingContent) {
        self.kind = match content {
            PendingContent::Empty => Kind::Empty,
            PendingContent::Text(s) => Kind::Text(s),
            PendingContent::Formula { expr, refs } => {
                Kind::Formula { expr, refs, cache: RefCell::new(None) }
            }
        };
    }

    /// The text that would reproduce this cell if fed back through
    /// `Sheet::set_cell`. For a formula cell this is the canonical
    /// pretty-printed form, which may differ from whatever was typed.
    pub fn text(&self) -> String {
        match &self.kind {
            Kind::Empty => String::new(),
            Kind::Text(s) => s.clone(),
            Kind::Formula { expr, .. } => format!("{}{}", FORMULA_SIGN, expr.to_canonical_string()),
        }
    }

    pub fn referenced_cells(&self) -> &[Position] {
        match &self.kind {
            Kind::Formula { refs, .. } => refs,
            _ => &[],
        }
    }

    pub fn invalidate_cache(&self) {
        if let Kind::Formula { cache, .. } = &self.kind {
            *cache.borrow_mut() = None;
        }
    }

    pub fn value(&self, resolver: &dyn CellResolver) -> CellValue {
        match &self.kind {
            Kind::Empty => CellValue::Text(String::new()),
            Kind::Text(s) => CellValue::Text(strip_escape(s).to_string()),
            Kind::Formula { expr, cache, .. } => {
                if cache.borrow().is_none() {
                    let result = Evaluator::new(resolver).eval(expr);
                    *cache.borrow_mut() = Some(result);
                }
                match cache.borrow().clone().expect("cache filled above") {
                    Ok(n) => CellValue::Number(n),
                    Err(e) => CellValue::Error(e),
                }
            }
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_escape(s: &str) -> &str {
    let mut chars = s.chars();
    if chars.next() == Some(ESCAPE_SIGN) {
        chars.as_str()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cell_is_empty() {
        let cell = Cell::new();
        assert_eq!(cell.text(), "");
        assert!(cell.referenced_cells().is_empty());
    }

    #[test]
    fn text_cell_roundtrips_text() {
        let mut cell = Cell::new();
        cell.apply(PendingContent::classify("hello").unwrap());
        assert_eq!(cell.text(), "hello");
    }

    #[test]
    fn strips_exactly_one_leading_escape_char() {
        let mut cell = Cell::new();
        cell.apply(PendingContent::classify("`=1+1").unwrap());
        // text() keeps the escape char; value() strips exactly one.
        assert_eq!(cell.text(), "`=1+1");

        struct NoRefs;
        impl CellResolver for NoRefs {
            fn resolve(&self, _pos: Position) -> Result<f64, FormulaError> {
                Ok(0.0)
            }
        }
        assert_eq!(cell.value(&NoRefs), CellValue::Text("=1+1".to_string()));
    }

    #[test]
    fn double_escape_strips_only_the_first_char() {
        let mut cell = Cell::new();
        cell.apply(PendingContent::classify("``x").unwrap());

        struct NoRefs;
        impl CellResolver for NoRefs {
            fn resolve(&self, _pos: Position) -> Result<f64, FormulaError> {
                Ok(0.0)
            }
        }
        assert_eq!(cell.value(&NoRefs), CellValue::Text("`x".to_string()));
    }

    #[test]
    fn formula_text_is_canonical_not_raw_input() {
        let mut cell = Cell::new();
        // Extra parens the parser doesn't need to preserve.
        cell.apply(PendingContent::classify("=(1+2)").unwrap());
        assert_eq!(cell.text(), "=1+2");
    }

    #[test]
    fn single_equals_sign_alone_is_text_not_formula() {
        let content = PendingContent::classify("=").unwrap();
        assert!(matches!(content, PendingContent::Text(s) if s == "="));
    }
}
