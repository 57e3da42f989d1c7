//! FILENAME: engine/src/eval.rs
//! PURPOSE: Evaluates a formula AST to a number, given a way to resolve
//! other cells' values.
//! CONTEXT: `Expr` is purely syntactic and lives in the parser crate; it
//! carries no sheet context. Evaluation needs that context, so it lives here.

use parser::ast::{BinaryOp, Expr, UnaryOp};
use parser::position::Position;

use crate::cell::FormulaError;

/// Resolves a cell position to the number it contributes to an arithmetic
/// expression. Implemented by `Sheet`.
pub trait CellResolver {
    fn resolve(&self, pos: Position) -> Result<f64, FormulaError>;
}

pub struct Evaluator<'a> {
    resolver: &'a dyn CellResolver,
}

impl<'a> Evaluator<'a> {
    pub fn new(resolver: &'a dyn CellResolver) -> Self {
        Evaluator { resolver }
    }

    pub fn eval(&self, expr: &Expr) -> Result<f64, FormulaError> {
        match expr {
            Expr::Num(n) => Ok(*n),
            Expr::CellRef(pos) => self.resolver.resolve(*pos),
            Expr::Unary(op, inner) => {
                let value = self.eval(inner)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                })
            }
            Expr::Binary(op, left, right) => {
                // Evaluated left-to-right so a left-side error short-circuits
                // and wins over whatever the right side would have produced.
                let lv = self.eval(left)?;
                let rv = self.eval(right)?;

                if *op == BinaryOp::Div && rv == 0.0 {
                    return Err(FormulaError::Arithmetic);
                }

                let result = match op {
                    BinaryOp::Add => lv + rv,
                    BinaryOp::Sub => lv - rv,
                    BinaryOp::Mul => lv * rv,
                    BinaryOp::Div => lv / rv,
                };

                if result.is_finite() {
                    Ok(result)
                } else {
                    Err(FormulaError::Arithmetic)
                }
            }
        }
    }
}
