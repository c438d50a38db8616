//! Streaming row access over a completed dataset (spec §4.7, component
//! C8): enum-dispatched rather than virtual-dispatch-per-row (spec §9 —
//! "only the specialized accessors need per-kind logic"), so `next()`
//! resolves the variant once per call and the hot loop stays a plain match.

use crate::value::{DataSet, Row, Value};
use std::collections::HashMap;

/// Shared cursor state every iterator kind carries.
#[derive(Debug, Clone)]
struct Cursor {
    dataset: DataSet,
    pos: usize,
}

impl Cursor {
    fn valid(&self) -> bool {
        self.pos < self.dataset.len()
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn row(&self) -> Option<&Row> {
        self.dataset.rows.get(self.pos)
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn size(&self) -> usize {
        self.dataset.len()
    }

    /// Stable erase: remove the current row, preserving the order of the
    /// rest, and leave the cursor pointing at what is now the next row.
    fn erase(&mut self) {
        if self.valid() {
            self.dataset.rows.remove(self.pos);
        }
    }

    /// Unstable erase: swap the current row with the last and pop it —
    /// O(1) but does not preserve order (spec §4.7).
    fn unstable_erase(&mut self) {
        if self.valid() {
            let last = self.dataset.len() - 1;
            self.dataset.rows.swap(self.pos, last);
            self.dataset.rows.pop();
        }
    }
}

/// `GetNeighbors`-shaped dataset layout: which columns hold the edge's
/// source id, destination id, and named edge properties, so the
/// specialized accessors don't need to re-resolve column indices per row.
#[derive(Debug, Clone)]
pub struct NeighborsLayout {
    pub src_col: usize,
    pub dst_col: usize,
    pub edge_prop_cols: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct NeighborsCursor {
    cursor: Cursor,
    layout: NeighborsLayout,
}

/// A row-streaming iterator over one operator's output (spec §3 `Result`'s
/// `iter` field). Each kind interprets its backing dataset the same way at
/// the `valid/next/row/reset/erase` level; `GetNeighbors` additionally
/// knows how to read the neighbor-response layout.
#[derive(Debug, Clone)]
pub enum RowIterator {
    Default(Cursor),
    Sequential(Cursor),
    GetNeighbors(NeighborsCursor),
    Prop(Cursor),
    Join(Cursor),
}

impl RowIterator {
    pub fn sequential(dataset: DataSet) -> Self {
        RowIterator::Sequential(Cursor { dataset, pos: 0 })
    }

    pub fn default_over(dataset: DataSet) -> Self {
        RowIterator::Default(Cursor { dataset, pos: 0 })
    }

    pub fn prop(dataset: DataSet) -> Self {
        RowIterator::Prop(Cursor { dataset, pos: 0 })
    }

    pub fn join(dataset: DataSet) -> Self {
        RowIterator::Join(Cursor { dataset, pos: 0 })
    }

    pub fn get_neighbors(dataset: DataSet, layout: NeighborsLayout) -> Self {
        RowIterator::GetNeighbors(NeighborsCursor { cursor: Cursor { dataset, pos: 0 }, layout })
    }

    fn cursor(&self) -> &Cursor {
        match self {
            RowIterator::GetNeighbors(n) => &n.cursor,
            RowIterator::Default(c) | RowIterator::Sequential(c) | RowIterator::Prop(c) | RowIterator::Join(c) => c,
        }
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        match self {
            RowIterator::GetNeighbors(n) => &mut n.cursor,
            RowIterator::Default(c) | RowIterator::Sequential(c) | RowIterator::Prop(c) | RowIterator::Join(c) => c,
        }
    }

    pub fn valid(&self) -> bool {
        self.cursor().valid()
    }

    pub fn next(&mut self) {
        self.cursor_mut().next();
    }

    pub fn row(&self) -> Option<&Row> {
        self.cursor().row()
    }

    pub fn reset(&mut self) {
        self.cursor_mut().reset();
    }

    pub fn size(&self) -> usize {
        self.cursor().size()
    }

    pub fn erase(&mut self) {
        self.cursor_mut().erase();
    }

    pub fn unstable_erase(&mut self) {
        self.cursor_mut().unstable_erase();
    }

    pub fn col_names(&self) -> &[String] {
        &self.cursor().dataset.col_names
    }

    /// `Some` only for the `GetNeighbors` kind, and only while `valid()`.
    pub fn get_src_id(&self) -> Option<&Value> {
        match self {
            RowIterator::GetNeighbors(n) => n.cursor.row().and_then(|r| r.get(n.layout.src_col)),
            _ => None,
        }
    }

    pub fn get_dst_id(&self) -> Option<&Value> {
        match self {
            RowIterator::GetNeighbors(n) => n.cursor.row().and_then(|r| r.get(n.layout.dst_col)),
            _ => None,
        }
    }

    pub fn get_edge_prop(&self, name: &str) -> Option<&Value> {
        match self {
            RowIterator::GetNeighbors(n) => {
                let col = *n.layout.edge_prop_cols.get(name)?;
                n.cursor.row().and_then(|r| r.get(col))
            }
            _ => None,
        }
    }
}
