//! FILENAME: engine/src/sheet.rs
//! PURPOSE: Public surface for a spreadsheet: cell storage, dependency
//! wiring, cycle rejection, and cache invalidation.

use std::collections::HashMap;
use std::fmt;

use parser::position::Position;

use crate::cell::{Cell, CellValue, FormulaError, PendingContent};
use crate::error::SheetError;
use crate::eval::CellResolver;
use crate::graph::DependencyGraph;
use crate::print_area::{PrintAreaTracker, Size};

#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    graph: DependencyGraph,
    print_area: PrintAreaTracker,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cell at `pos` to `text`. Empty text clears the cell; text
    /// starting with `=` (and at least one more character) is parsed as a
    /// formula; anything else is stored as plain text.
    ///
    /// A formula that would introduce a circular dependency, or that fails
    /// to parse, is rejected and the sheet is left unchanged.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        require_valid(pos)?;

        let content = PendingContent::classify(text)?;

        if let PendingContent::Formula { ref refs, .. } = content {
            for &r in refs {
                self.materialize(r);
            }
            if self.graph.would_create_cycle(pos, refs) {
                return Err(SheetError::CircularDependency);
            }
        }

        self.materialize(pos);
        let was_nonempty = !self.cells[&pos].text().is_empty();
        let new_refs = content.refs().to_vec();

        let cell = self.cells.get_mut(&pos).expect("materialized above");
        cell.invalidate_cache();
        cell.apply(content);

        self.graph.set_out_edges(pos, &new_refs);

        let is_nonempty = !self.cells[&pos].text().is_empty();
        match (was_nonempty, is_nonempty) {
            (false, true) => self.print_area.add(pos),
            (true, false) => self.print_area.sub(pos),
            _ => {}
        }

        self.invalidate_dependents(pos);

        Ok(())
    }

    /// Equivalent to `set_cell(pos, "")`. A no-op if the cell is already empty.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        require_valid(pos)?;
        match self.cells.get(&pos) {
            None => Ok(()),
            Some(cell) if cell.text().is_empty() => Ok(()),
            Some(_) => self.set_cell(pos, ""),
        }
    }

    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        require_valid(pos)?;
        Ok(self.cells.get(&pos))
    }

    pub fn get_cell_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>, SheetError> {
        require_valid(pos)?;
        Ok(self.cells.get_mut(&pos))
    }

    /// Convenience wrapper over `get_cell` that also resolves a formula cell's value.
    pub fn get_value(&self, pos: Position) -> Result<CellValue, SheetError> {
        require_valid(pos)?;
        Ok(match self.cells.get(&pos) {
            None => CellValue::Text(String::new()),
            Some(cell) => cell.value(self),
        })
    }

    /// Convenience wrapper over `get_cell` that returns a cell's stored text.
    pub fn get_text(&self, pos: Position) -> Result<String, SheetError> {
        require_valid(pos)?;
        Ok(self.cells.get(&pos).map(|c| c.text()).unwrap_or_default())
    }

    pub fn printable_size(&self) -> Size {
        self.print_area.printable_size()
    }

    pub fn print_values(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.print_grid(out, |cell| cell.value(self).to_string())
    }

    pub fn print_texts(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.print_grid(out, |cell| cell.text())
    }

    fn print_grid(&self, out: &mut impl fmt::Write, render: impl Fn(&Cell) -> String) -> fmt::Result {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", render(cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn materialize(&mut self, pos: Position) {
        self.cells.entry(pos).or_insert_with(Cell::new);
    }

    fn invalidate_dependents(&self, pos: Position) {
        if let Some(cell) = self.cells.get(&pos) {
            cell.invalidate_cache();
        }
        for dep in self.graph.in_closure(pos) {
            if let Some(cell) = self.cells.get(&dep) {
                cell.invalidate_cache();
            }
        }
    }
}

fn require_valid(pos: Position) -> Result<(), SheetError> {
    if pos.is_valid() {
        Ok(())
    } else {
        Err(SheetError::InvalidPosition(pos.to_a1()))
    }
}

impl CellResolver for Sheet {
    fn resolve(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        match self.cells.get(&pos) {
            None => Ok(0.0),
            Some(cell) => match cell.value(self) {
                CellValue::Text(s) => {
                    if s.is_empty() {
                        Ok(0.0)
                    } else {
                        match s.trim().parse::<f64>() {
                            Ok(n) if n.is_finite() => Ok(n),
                            _ => Err(FormulaError::Value),
                        }
                    }
                }
                CellValue::Number(n) => Ok(n),
                CellValue::Error(e) => Err(e),
            },
        }
    }
}
