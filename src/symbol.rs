//! Symbol table & validation context (spec §3/§4.3, component C5):
//! variable resolution and per-variable column schemas, with writer/reader
//! node-id tracking updated during plan construction.
//!
//! Grounded in `original_source/src/context/Symbols.cpp`: each variable
//! entry tracks who wrote it and who has since read it, and anonymous
//! variables are minted by a counter (`"__VAR_1"`-style) rather than left
//! for the caller to name.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct VarEntry {
    pub name: String,
    pub col_names: Vec<String>,
    pub written_by: Vec<u64>,
    pub read_by: Vec<u64>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    vars: HashMap<String, VarEntry>,
    anon_counter: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Mint a fresh anonymous variable name, e.g. for an intermediate
    /// subplan's output the user never named.
    pub fn new_anon_var(&mut self) -> String {
        self.anon_counter += 1;
        format!("__VAR_{}", self.anon_counter)
    }

    /// Record that `writer_node` publishes `var` with the given columns.
    pub fn bind_writer(&mut self, var: &str, col_names: Vec<String>, writer_node: u64) {
        let entry = self.vars.entry(var.to_string()).or_insert_with(|| VarEntry {
            name: var.to_string(),
            ..Default::default()
        });
        entry.col_names = col_names;
        entry.written_by.push(writer_node);
    }

    /// Record that `reader_node` consumes `var`. Returns an error-shaped
    /// `None` if `var` has never been written — the validator turns that
    /// into `Error::SymbolNotFound`.
    pub fn bind_reader(&mut self, var: &str, reader_node: u64) -> Option<&VarEntry> {
        let entry = self.vars.get_mut(var)?;
        entry.read_by.push(reader_node);
        Some(entry)
    }

    pub fn get(&self, var: &str) -> Option<&VarEntry> {
        self.vars.get(var)
    }

    pub fn col_names(&self, var: &str) -> Option<&[String]> {
        self.vars.get(var).map(|e| e.col_names.as_slice())
    }

    /// Spec §8 invariant 2: `writer(r)` must precede `n` in execution
    /// order for every `r` that `n` reads. Since the plan DAG only ever
    /// grows by appending downstream of already-built subplans, a writer
    /// node id is always smaller than any node id that later reads it —
    /// this checks that invariant directly rather than trusting it.
    pub fn writer_precedes_reader(&self, var: &str, reader_node: u64) -> bool {
        self.vars
            .get(var)
            .map(|e| e.written_by.iter().all(|&w| w < reader_node))
            .unwrap_or(false)
    }
}
