//! Execution result contract (spec §3 "Result"): the value a completed
//! operator hands to its dependents, tagged with whether every partition
//! involved in producing it answered (`Ok`) or some legitimately failed
//! while others still returned usable rows (`PartialSuccess`, spec §4.6).

use crate::value::DataSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Ok,
    /// At least one storage partition failed (leader change, timeout) while
    /// others answered; the dataset holds only the rows that did return.
    PartialSuccess,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub dataset: DataSet,
    pub state: ExecState,
    /// Populated only when `state == PartialSuccess`, one entry per failed
    /// partition (spec §4.6 "aggregate partial failures without discarding
    /// rows that did complete").
    pub partial_errors: Vec<String>,
}

impl ExecResult {
    pub fn ok(dataset: DataSet) -> Self {
        ExecResult {
            dataset,
            state: ExecState::Ok,
            partial_errors: vec![],
        }
    }

    pub fn partial(dataset: DataSet, errors: Vec<String>) -> Self {
        ExecResult {
            dataset,
            state: ExecState::PartialSuccess,
            partial_errors: errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == ExecState::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataSet;

    #[test]
    fn partial_result_carries_errors_without_discarding_rows() {
        let dataset = DataSet::new(vec!["id".into()]);
        let result = ExecResult::partial(dataset, vec!["part 3: leader changed".into()]);
        assert_eq!(result.state, ExecState::PartialSuccess);
        assert_eq!(result.partial_errors.len(), 1);
        assert!(!result.is_ok());
    }
}
