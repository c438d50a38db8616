//! Query service boundary (spec §6): `authenticate` / `execute` / `signout`,
//! the request/response shapes a real RPC handler would sit in front of.
//! Authentication and session lifecycle are external collaborators (spec
//! §1) — [`QueryService`] wires together the pieces this crate does own
//! (validator, optimizer, executor) behind the three calls the spec names,
//! using an in-memory credential store only so the pipeline is exercisable
//! end to end without a real auth service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::auth::{hash_password, verify_password, Role};
use crate::ast::Statement;
use crate::catalog::Catalog;
use crate::error::{Error, ErrorCode, Result};
use crate::config::OptimizerConfig;
use crate::executor::{self, ExecutionContext};
use crate::optimizer;
use crate::session::{SessionConfig, SessionId, SessionManager};
use crate::storage::StorageClient;
use crate::validator::{self, PermissionGate, ValidatorContext};
use crate::value::Value;

/// Minimal credential store (spec §9 decision: no `Statement`/AST entry
/// point exists to manage accounts, so this stays an internal implementation
/// detail rather than a modeled DDL surface).
#[derive(Default)]
pub struct CredentialStore {
    accounts: DashMap<String, (String, Role)>,
}

impl CredentialStore {
    pub fn new() -> Self {
        CredentialStore::default()
    }

    pub fn register(&self, username: &str, password: &str, role: Role) {
        self.accounts.insert(username.to_string(), (hash_password(password), role));
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        let entry = self.accounts.get(username)?;
        let (hash, role) = entry.value();
        verify_password(password, hash).then_some(*role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub session_id: Option<SessionId>,
    pub status: ErrorCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub status: ErrorCode,
    pub latency_us: u64,
    pub space_name: Option<String>,
    pub error_msg: Option<String>,
    pub dataset: Option<Json>,
    pub plan_description: Option<Json>,
}

impl ExecutionResponse {
    fn failed(status: ErrorCode, message: impl Into<String>) -> Self {
        ExecutionResponse {
            status,
            latency_us: 0,
            space_name: None,
            error_msg: Some(message.into()),
            dataset: None,
            plan_description: None,
        }
    }
}

/// Owns every per-process collaborator this crate is responsible for: the
/// catalog, the storage client façade, the session table, and the
/// optimizer/executor configuration every query runs under.
pub struct QueryService {
    catalog: Arc<Catalog>,
    storage: Arc<dyn StorageClient>,
    sessions: SessionManager,
    credentials: CredentialStore,
    optimizer_config: OptimizerConfig,
    executor_config: crate::config::ExecutorConfig,
}

impl QueryService {
    pub fn new(
        catalog: Arc<Catalog>,
        storage: Arc<dyn StorageClient>,
        session_config: SessionConfig,
        optimizer_config: OptimizerConfig,
        executor_config: crate::config::ExecutorConfig,
    ) -> Self {
        QueryService {
            catalog,
            storage,
            sessions: SessionManager::new(session_config),
            credentials: CredentialStore::new(),
            optimizer_config,
            executor_config,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// `authenticate(user, password) → {sessionId, status}` (spec §6). The
    /// session binds to `space` for its lifetime — nothing in the AST
    /// models a `USE <space>` clause to switch it later (spec §9 decision:
    /// every clause already carries its own space at lowering time).
    pub fn authenticate(&self, username: &str, password: &str, space: &str) -> AuthResponse {
        match self.credentials.authenticate(username, password) {
            Some(role) => match self.sessions.create_session(username, role, space) {
                Ok(session_id) => AuthResponse { session_id: Some(session_id), status: ErrorCode::Succeeded },
                Err(_) => AuthResponse { session_id: None, status: ErrorCode::ExecutionError },
            },
            None => AuthResponse { session_id: None, status: ErrorCode::PermissionError },
        }
    }

    /// `execute(sessionId, statement) → ExecutionResponse` (spec §6).
    pub async fn execute(&self, session_id: &SessionId, statement: &Statement, explain: bool) -> ExecutionResponse {
        let started = Instant::now();
        let session = match self.sessions.touch(session_id) {
            Ok(session) => session,
            Err(_) => return ExecutionResponse::failed(ErrorCode::PermissionError, "no such session"),
        };

        let mut ctx = ValidatorContext::new(Arc::clone(&self.catalog), PermissionGate::new(session.role));
        if let Err(err) = validator::validate(statement, &session.space, &mut ctx) {
            return ExecutionResponse::failed(err.code(), err.to_string());
        }
        let Some(root) = ctx.plan.root else {
            return ExecutionResponse::failed(ErrorCode::ExecutionError, "validator produced no root node");
        };

        let rules = optimizer::default_rules(&self.optimizer_config);
        optimizer::optimize(&mut ctx.plan, root, &rules, &self.catalog, self.optimizer_config.max_iterations);

        let plan_description = explain.then(|| ctx.plan.describe(root).to_json());

        let exec_ctx = ExecutionContext::new(Arc::clone(&self.catalog), Arc::clone(&self.storage), &self.executor_config);
        let result = executor::execute_plan(&ctx.plan, root, HashMap::new(), &exec_ctx).await;

        let latency_us = started.elapsed().as_micros() as u64;
        match result {
            Ok(exec_result) => ExecutionResponse {
                status: if exec_result.is_ok() { ErrorCode::Succeeded } else { ErrorCode::PartialSuccess },
                latency_us,
                space_name: Some(session.space),
                error_msg: None,
                dataset: Some(dataset_to_json(&exec_result.dataset)),
                plan_description,
            },
            Err(err) => ExecutionResponse {
                status: err.code(),
                latency_us,
                space_name: Some(session.space),
                error_msg: Some(err.to_string()),
                dataset: None,
                plan_description,
            },
        }
    }

    /// `signout(sessionId)` (spec §6).
    pub fn signout(&self, session_id: &SessionId) -> Result<()> {
        self.sessions.close_session(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    pub fn reap_expired_sessions(&self) -> usize {
        self.sessions.reap_expired()
    }
}

fn dataset_to_json(dataset: &crate::value::DataSet) -> Json {
    let rows: Vec<Json> = dataset
        .rows
        .iter()
        .map(|row| {
            let cells: HashMap<&String, Json> = dataset.col_names.iter().zip(row.values()).map(|(name, v)| (name, value_to_json(v))).collect();
            serde_json::to_value(cells).unwrap_or(Json::Null)
        })
        .collect();
    serde_json::json!({ "colNames": dataset.col_names, "rows": rows })
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null(_) => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => serde_json::json!(i),
        Value::Float(f) => serde_json::json!(f),
        Value::String(s) => Json::String(s.to_string()),
        other => Json::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{InsertVerticesClause, Statement};
    use crate::catalog::SpaceSchema;
    use crate::storage::InMemoryStorageClient;
    use crate::value::Value;

    fn service() -> QueryService {
        let catalog = Arc::new(Catalog::new());
        let mut space = SpaceSchema::new("sg", 1, 4);
        space.tags.insert(
            "Person".into(),
            crate::catalog::TagSchema {
                name: "Person".into(),
                id: 1,
                props: vec![crate::catalog::PropertyDef { name: "name".into(), data_type: crate::catalog::DataType::String }],
            },
        );
        catalog.refresh(vec![space]);
        let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
        let service = QueryService::new(catalog, storage, SessionConfig::default(), OptimizerConfig::default(), crate::config::ExecutorConfig::default());
        service.credentials().register("ada", "hunter2", Role::User);
        service
    }

    #[test]
    fn wrong_password_is_rejected() {
        let service = service();
        let response = service.authenticate("ada", "wrong", "sg");
        assert_eq!(response.status, ErrorCode::PermissionError);
        assert!(response.session_id.is_none());
    }

    #[tokio::test]
    async fn authenticate_then_execute_an_insert_round_trips() {
        let service = service();
        let auth = service.authenticate("ada", "hunter2", "sg");
        assert_eq!(auth.status, ErrorCode::Succeeded);
        let session_id = auth.session_id.unwrap();

        let statement = Statement::InsertVertices(InsertVerticesClause {
            tag: "Person".into(),
            prop_names: vec!["name".into()],
            rows: vec![(crate::expression::Expression::Constant(Value::Int(1)), vec![crate::expression::Expression::Constant(Value::string("Ada"))])],
            overwrite: true,
        });
        let response = service.execute(&session_id, &statement, true).await;
        assert_eq!(response.status, ErrorCode::Succeeded);
        assert!(response.plan_description.is_some());

        service.signout(&session_id).unwrap();
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn execute_on_an_unknown_session_is_rejected() {
        let service = service();
        let statement = Statement::Pipeline(vec![]);
        let response = service.execute(&"bogus".to_string(), &statement, false).await;
        assert_eq!(response.status, ErrorCode::PermissionError);
    }
}
