//! FILENAME: engine/src/error.rs
//! PURPOSE: Error type for sheet-level operations.

use thiserror::Error;

/// Errors that `Sheet` operations can return. Distinct from `FormulaError`,
/// which is a value that flows through a cell's own result, not a Rust
/// control-flow error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("position out of range or malformed: {0}")]
    InvalidPosition(String),

    #[error("formula parse error: {0}")]
    FormulaParse(#[from] parser::ParseError),

    #[error("setting this cell would create a circular dependency")]
    CircularDependency,
}
