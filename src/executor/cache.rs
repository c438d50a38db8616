//! Result cache (spec §4.6: "the execution context owns a
//! `map<variable_name, Result>`; operators read by name and write by
//! name"). Backed by `dashmap` the way the teacher's catalog/session
//! state uses concurrent maps, since `Loop`/`Select` bodies and any future
//! cross-branch read can run from different tasks.

use crate::plan::result::ExecResult;
use dashmap::DashMap;

pub struct ResultCache {
    entries: DashMap<String, ExecResult>,
    capacity: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        ResultCache { entries: DashMap::new(), capacity }
    }

    /// Single-writer per variable name (spec §8 invariant: a variable is
    /// written by exactly one node) — this just overwrites, since the
    /// symbol table is what enforces the single-writer invariant upstream.
    pub fn write(&self, var: &str, result: ExecResult) {
        self.entries.insert(var.to_string(), result);
    }

    pub fn read(&self, var: &str) -> Option<ExecResult> {
        self.entries.get(var).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_over_capacity(&self) -> bool {
        self.entries.len() > self.capacity
    }
}
