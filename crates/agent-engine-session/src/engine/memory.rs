//! In-memory agent engine.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use agent_engine_core::{
    AgentEngine, AgentEvent, Deployment, DeploymentSpec, EngineError, EventStream, Session,
    SessionRef,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use uuid::Uuid;

/// Remote call kinds, used for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListDeployments,
    GetDeployment,
    CreateDeployment,
    DeleteDeployment,
    CreateSession,
    ListSessions,
    GetSession,
    DeleteSession,
    StreamQuery,
}

struct StoredSession {
    raw: SessionRef,
    /// Reads that still report not-found, simulating initialization lag.
    pending_reads: u32,
}

#[derive(Default)]
struct Inner {
    deployments: BTreeMap<String, Deployment>,
    sessions: HashMap<(String, String), Vec<StoredSession>>,
    failing: HashSet<Operation>,
    failing_session_deletes: HashSet<String>,
    read_lag: u32,
    replies: Option<Vec<Value>>,
    stream_fails_after: Option<usize>,
    calls: HashMap<Operation, usize>,
    deleted_sessions: Vec<String>,
    next_deployment: u64,
}

/// In-memory engine implementation.
///
/// Useful for development and tests. Behaves like the managed service for
/// the operations this workspace uses, with hooks to inject failures,
/// heterogeneous session shapes and read-after-create lag.
pub struct MemoryEngine {
    inner: RwLock<Inner>,
}

impl MemoryEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, EngineError> {
        self.inner
            .read()
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, EngineError> {
        self.inner
            .write()
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    fn with_inner(&self, f: impl FnOnce(&mut Inner)) {
        if let Ok(mut inner) = self.inner.write() {
            f(&mut inner);
        }
    }

    /// Register a deployment and return its resource name.
    pub fn add_deployment(&self, display_name: &str) -> String {
        let mut name = String::new();
        self.with_inner(|inner| {
            inner.next_deployment += 1;
            name = format!(
                "projects/memory/locations/local/reasoningEngines/{}",
                inner.next_deployment
            );
            let mut deployment = Deployment::new(name.clone());
            deployment.display_name = Some(display_name.to_string());
            inner.deployments.insert(name.clone(), deployment);
        });
        name
    }

    /// Store a session value verbatim, whatever its shape.
    pub fn insert_raw_session(&self, deployment_id: &str, user_id: &str, raw: Value) {
        self.with_inner(|inner| {
            let key = Self::key(inner, deployment_id, user_id);
            inner.sessions.entry(key).or_default().push(StoredSession {
                raw: SessionRef::from_value(raw),
                pending_reads: 0,
            });
        });
    }

    /// Make every call of `op` fail with an internal API error.
    pub fn fail(&self, op: Operation) {
        self.with_inner(|inner| {
            inner.failing.insert(op);
        });
    }

    /// Stop failing calls of `op`.
    pub fn recover(&self, op: Operation) {
        self.with_inner(|inner| {
            inner.failing.remove(&op);
        });
    }

    /// Make deletion of one session id fail.
    pub fn fail_session_delete(&self, session_id: &str) {
        self.with_inner(|inner| {
            inner.failing_session_deletes.insert(session_id.to_string());
        });
    }

    /// Newly created sessions report not-found for this many reads.
    pub fn set_read_lag(&self, reads: u32) {
        self.with_inner(|inner| inner.read_lag = reads);
    }

    /// Events returned by every streamed query instead of the default echo.
    pub fn set_replies(&self, replies: Vec<Value>) {
        self.with_inner(|inner| inner.replies = Some(replies));
    }

    /// Streamed queries yield `n` events then fail.
    pub fn fail_stream_after(&self, n: usize) {
        self.with_inner(|inner| inner.stream_fails_after = Some(n));
    }

    /// Number of calls made for `op`, failed ones included.
    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.inner
            .read()
            .map(|inner| inner.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Session ids deleted so far, in order.
    #[must_use]
    pub fn deleted_sessions(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.deleted_sessions.clone())
            .unwrap_or_default()
    }

    /// Resource names of the remaining deployments.
    #[must_use]
    pub fn deployment_names(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.deployments.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn key(inner: &Inner, deployment_id: &str, user_id: &str) -> (String, String) {
        let name = Self::resolve(inner, deployment_id).unwrap_or_else(|| deployment_id.to_string());
        (name, user_id.to_string())
    }

    fn resolve(inner: &Inner, deployment_id: &str) -> Option<String> {
        inner
            .deployments
            .values()
            .find(|d| d.resource_name == deployment_id || d.short_id() == deployment_id)
            .map(|d| d.resource_name.clone())
    }

    /// Count the call and apply failure injection.
    fn enter(&self, op: Operation) -> Result<RwLockWriteGuard<'_, Inner>, EngineError> {
        let mut inner = self.write()?;
        *inner.calls.entry(op).or_insert(0) += 1;
        if inner.failing.contains(&op) {
            return Err(EngineError::Api {
                code: 500,
                status: "INTERNAL".to_string(),
                message: format!("injected failure for {op:?}"),
            });
        }
        Ok(inner)
    }

    fn require_deployment(inner: &Inner, deployment_id: &str) -> Result<String, EngineError> {
        Self::resolve(inner, deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {deployment_id}")))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn session_from_ref(session: &SessionRef, id: String, user_id: &str) -> Session {
    if let SessionRef::Mapping(map) = session {
        if let Ok(parsed) = serde_json::from_value::<Session>(Value::Object(map.clone())) {
            return parsed;
        }
    }
    let mut typed = Session::new(id);
    typed.user_id = Some(user_id.to_string());
    typed
}

#[async_trait]
impl AgentEngine for MemoryEngine {
    async fn list_deployments(&self) -> Result<Vec<Deployment>, EngineError> {
        let inner = self.enter(Operation::ListDeployments)?;
        Ok(inner.deployments.values().cloned().collect())
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, EngineError> {
        let inner = self.enter(Operation::GetDeployment)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        inner
            .deployments
            .get(&name)
            .cloned()
            .ok_or(EngineError::NotFound(name))
    }

    async fn create_deployment(&self, spec: &DeploymentSpec) -> Result<Deployment, EngineError> {
        drop(self.enter(Operation::CreateDeployment)?);
        let name = self.add_deployment(&spec.display_name);
        let mut inner = self.write()?;
        let deployment = inner
            .deployments
            .get_mut(&name)
            .ok_or_else(|| EngineError::Internal(format!("lost deployment {name}")))?;
        deployment.description.clone_from(&spec.description);
        Ok(deployment.clone())
    }

    async fn delete_deployment(
        &self,
        deployment_id: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        let mut inner = self.enter(Operation::DeleteDeployment)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        let has_sessions = inner
            .sessions
            .iter()
            .any(|((d, _), sessions)| *d == name && !sessions.is_empty());
        if has_sessions && !force {
            return Err(EngineError::Api {
                code: 400,
                status: "FAILED_PRECONDITION".to_string(),
                message: format!("deployment {name} has sessions; use force"),
            });
        }
        inner.sessions.retain(|(d, _), _| *d != name);
        inner.deployments.remove(&name);
        Ok(())
    }

    async fn create_session(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Session, EngineError> {
        let mut inner = self.enter(Operation::CreateSession)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        let id = Uuid::new_v4().to_string();
        let session = json!({
            "id": id,
            "appName": name,
            "userId": user_id,
            "state": {},
            "events": [],
        });
        let typed: Session = serde_json::from_value(session.clone())?;
        let pending_reads = inner.read_lag;
        inner
            .sessions
            .entry((name, user_id.to_string()))
            .or_default()
            .push(StoredSession {
                raw: SessionRef::from_value(session),
                pending_reads,
            });
        Ok(typed)
    }

    async fn list_sessions(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SessionRef>, EngineError> {
        let inner = self.enter(Operation::ListSessions)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        Ok(inner
            .sessions
            .get(&(name, user_id.to_string()))
            .map(|sessions| sessions.iter().map(|s| s.raw.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, EngineError> {
        let mut inner = self.enter(Operation::GetSession)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        let stored = inner
            .sessions
            .get_mut(&(name, user_id.to_string()))
            .and_then(|sessions| {
                sessions
                    .iter_mut()
                    .find(|s| s.raw.id().as_deref() == Some(session_id))
            })
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;

        if stored.pending_reads > 0 {
            stored.pending_reads -= 1;
            return Err(EngineError::NotFound(format!("session {session_id}")));
        }
        Ok(session_from_ref(&stored.raw, session_id.to_string(), user_id))
    }

    async fn delete_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Value, EngineError> {
        let mut inner = self.enter(Operation::DeleteSession)?;
        if inner.failing_session_deletes.contains(session_id) {
            return Err(EngineError::Api {
                code: 500,
                status: "INTERNAL".to_string(),
                message: format!("injected failure deleting {session_id}"),
            });
        }
        let name = Self::require_deployment(&inner, deployment_id)?;
        let sessions = inner
            .sessions
            .get_mut(&(name, user_id.to_string()))
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;
        let index = sessions
            .iter()
            .position(|s| s.raw.id().as_deref() == Some(session_id))
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;
        sessions.remove(index);
        inner.deleted_sessions.push(session_id.to_string());
        Ok(Value::Null)
    }

    async fn stream_query(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream, EngineError> {
        let inner = self.enter(Operation::StreamQuery)?;
        let name = Self::require_deployment(&inner, deployment_id)?;
        let exists = inner
            .sessions
            .get(&(name.clone(), user_id.to_string()))
            .is_some_and(|sessions| {
                sessions
                    .iter()
                    .any(|s| s.raw.id().as_deref() == Some(session_id))
            });
        if !exists {
            return Err(EngineError::NotFound(format!("session {session_id}")));
        }

        let replies = inner.replies.clone().unwrap_or_else(|| {
            vec![json!({
                "author": "memory_agent",
                "invocation_id": Uuid::new_v4().to_string(),
                "content": {"role": "model", "parts": [{"text": format!("echo: {message}")}]},
            })]
        });

        let mut items: Vec<Result<AgentEvent, EngineError>> =
            replies.into_iter().map(|v| Ok(AgentEvent::new(v))).collect();
        if let Some(n) = inner.stream_fails_after {
            items.truncate(n);
            items.push(Err(EngineError::Stream(format!(
                "stream for {name} interrupted"
            ))));
        }
        Ok(futures::stream::iter(items).boxed())
    }
}
