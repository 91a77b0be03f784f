use async_trait::async_trait;
use sqlharbor_core::{
    CloseSessionParams, CloseSessionResponse, ConnectionDetails, CreateSessionResponse,
    ExpandParams, ExpandResponse, ExplorerError, NodeInfo, SessionCreatedNotification,
    ToolsNotification, ToolsService,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::fixtures;

/// Scripted result of one `create_session` call.
#[derive(Debug, Clone)]
pub enum FakeSessionOutcome {
    Success(NodeInfo),
    Failure {
        message: String,
        error_number: Option<i64>,
    },
    /// The request is acknowledged but no notification ever arrives.
    NoReply,
    RequestError(String),
}

#[derive(Debug, Clone)]
pub enum FakeExpandOutcome {
    Nodes(Vec<NodeInfo>),
    Error(String),
    /// `expand` answers `false`.
    Refused,
    NoReply,
    RequestError(String),
}

#[derive(Debug, Clone, Default)]
pub struct FakeToolsStats {
    pub created_sessions: Vec<ConnectionDetails>,
    pub expand_requests: Vec<ExpandParams>,
    pub refresh_requests: Vec<ExpandParams>,
    pub closed_sessions: Vec<String>,
}

#[derive(Default)]
struct FakeToolsState {
    session_script: Mutex<VecDeque<FakeSessionOutcome>>,
    expand_outcomes: Mutex<HashMap<String, FakeExpandOutcome>>,
    held_expands: Mutex<Vec<ExpandResponse>>,
    manual_expand: Mutex<bool>,
    stats: Mutex<FakeToolsStats>,
    next_session: AtomicUsize,
}

/// In-memory tools service. Completions are pushed through the notification
/// channel returned by `new`, like the real service does.
#[derive(Clone)]
pub struct FakeToolsService {
    state: Arc<FakeToolsState>,
    notifications: mpsc::UnboundedSender<ToolsNotification>,
}

impl FakeToolsService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ToolsNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fake = Self {
            state: Arc::new(FakeToolsState::default()),
            notifications: tx,
        };
        (fake, rx)
    }

    /// Queues outcomes for upcoming `create_session` calls. When the queue is
    /// empty sessions succeed with a server root node.
    pub fn push_session_outcome(&self, outcome: FakeSessionOutcome) {
        mutex_lock(&self.state.session_script).push_back(outcome);
    }

    pub fn set_expand_outcome(&self, node_path: impl Into<String>, outcome: FakeExpandOutcome) {
        mutex_lock(&self.state.expand_outcomes).insert(node_path.into(), outcome);
    }

    /// Holds expand completions until `release_expands` is called.
    pub fn set_manual_expand(&self, manual: bool) {
        *mutex_lock(&self.state.manual_expand) = manual;
    }

    pub fn release_expands(&self) -> usize {
        let held: Vec<_> = mutex_lock(&self.state.held_expands).drain(..).collect();
        let count = held.len();
        for response in held {
            self.notify(ToolsNotification::ExpandCompleted(response));
        }
        count
    }

    pub fn stats(&self) -> FakeToolsStats {
        mutex_lock(&self.state.stats).clone()
    }

    pub fn as_service_arc(&self) -> Arc<dyn ToolsService> {
        Arc::new(self.clone())
    }

    fn notify(&self, notification: ToolsNotification) {
        let _ = self.notifications.send(notification);
    }

    fn complete_expand(&self, params: &ExpandParams) -> Result<bool, ExplorerError> {
        let outcome = mutex_lock(&self.state.expand_outcomes)
            .get(&params.node_path)
            .cloned()
            .unwrap_or(FakeExpandOutcome::Nodes(Vec::new()));

        let response = |nodes: Vec<NodeInfo>, error_message: Option<String>| ExpandResponse {
            session_id: params.session_id.clone(),
            node_path: params.node_path.clone(),
            nodes,
            error_message,
        };

        let response = match outcome {
            FakeExpandOutcome::Nodes(nodes) => response(nodes, None),
            FakeExpandOutcome::Error(message) => response(Vec::new(), Some(message)),
            FakeExpandOutcome::Refused => return Ok(false),
            FakeExpandOutcome::NoReply => return Ok(true),
            FakeExpandOutcome::RequestError(message) => return Err(ExplorerError::rpc(message)),
        };

        if *mutex_lock(&self.state.manual_expand) {
            mutex_lock(&self.state.held_expands).push(response);
        } else {
            self.notify(ToolsNotification::ExpandCompleted(response));
        }

        Ok(true)
    }
}

#[async_trait]
impl ToolsService for FakeToolsService {
    async fn create_session(
        &self,
        details: ConnectionDetails,
    ) -> Result<CreateSessionResponse, ExplorerError> {
        let server = details.server.clone();
        mutex_lock(&self.state.stats).created_sessions.push(details);

        let outcome = mutex_lock(&self.state.session_script)
            .pop_front()
            .unwrap_or_else(|| FakeSessionOutcome::Success(fixtures::server_root(&server)));

        let seq = self.state.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let session_id = format!("session-{seq}");

        let notification = match outcome {
            FakeSessionOutcome::Success(root) => Some(SessionCreatedNotification {
                session_id: session_id.clone(),
                success: true,
                root_node: Some(root),
                error_message: None,
                error_number: None,
            }),
            FakeSessionOutcome::Failure {
                message,
                error_number,
            } => Some(SessionCreatedNotification {
                session_id: session_id.clone(),
                success: false,
                root_node: None,
                error_message: Some(message),
                error_number,
            }),
            FakeSessionOutcome::NoReply => None,
            FakeSessionOutcome::RequestError(message) => return Err(ExplorerError::rpc(message)),
        };

        // The real service may also notify before the response arrives.
        if let Some(notification) = notification {
            self.notify(ToolsNotification::SessionCreated(notification));
        }

        Ok(CreateSessionResponse { session_id })
    }

    async fn expand(&self, params: ExpandParams) -> Result<bool, ExplorerError> {
        mutex_lock(&self.state.stats)
            .expand_requests
            .push(params.clone());
        self.complete_expand(&params)
    }

    async fn refresh(&self, params: ExpandParams) -> Result<bool, ExplorerError> {
        mutex_lock(&self.state.stats)
            .refresh_requests
            .push(params.clone());
        self.complete_expand(&params)
    }

    async fn close_session(
        &self,
        params: CloseSessionParams,
    ) -> Result<CloseSessionResponse, ExplorerError> {
        mutex_lock(&self.state.stats)
            .closed_sessions
            .push(params.session_id.clone());

        Ok(CloseSessionResponse {
            success: true,
            session_id: params.session_id,
        })
    }
}

pub(crate) fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
