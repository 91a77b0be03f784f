use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlharbor_core::{
    CloseSessionParams, CloseSessionResponse, ConnectionDetails, CreateSessionResponse,
    ExpandParams, ExplorerError, ToolsNotification, ToolsService,
};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::envelope::{IncomingMessage, RpcNotification, RpcRequest, methods};
use crate::framing::{read_message, write_message};
use crate::RpcError;

type Reply = oneshot::Sender<Result<Value, RpcError>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Default)]
struct PendingReplies {
    waiters: HashMap<u64, Reply>,
    closed: bool,
}

type SharedPending = Arc<Mutex<PendingReplies>>;

fn lock_pending(pending: &Mutex<PendingReplies>) -> MutexGuard<'_, PendingReplies> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poison_err) => {
            warn!("RPC pending map mutex poisoned, recovering...");
            poison_err.into_inner()
        }
    }
}

/// JSON-RPC client for the tools service.
///
/// Requests are correlated with responses by id on a background reader task.
/// Notifications are decoded into `ToolsNotification`s and forwarded to the
/// channel returned by `new`.
pub struct RpcClient {
    writer: tokio::sync::Mutex<BoxedWriter>,
    pending: SharedPending,
    next_id: AtomicU64,
    request_timeout: Duration,
    reader_task: JoinHandle<()>,
}

impl RpcClient {
    /// Starts the reader task, so this must run inside a tokio runtime.
    pub fn new<R, W>(
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ToolsNotification>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending: SharedPending = Arc::new(Mutex::new(PendingReplies::default()));
        let reader_task = tokio::spawn(read_loop(BufReader::new(reader), pending.clone(), tx));

        let client = Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(0),
            request_timeout,
            reader_task,
        };

        (client, rx)
    }

    pub fn pending_requests(&self) -> usize {
        lock_pending(&self.pending).waiters.len()
    }

    pub fn is_closed(&self) -> bool {
        lock_pending(&self.pending).closed
    }

    /// Sends `method` and waits for its response.
    pub async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, RpcError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RpcRequest::new(id, method, Some(serde_json::to_value(params)?));

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock_pending(&self.pending);
            if pending.closed {
                return Err(RpcError::Closed);
            }
            pending.waiters.insert(id, tx);
        }

        debug!("-> {} #{}", method, id);

        let sent = {
            let mut writer = self.writer.lock().await;
            write_message(&mut *writer, &request).await
        };

        if let Err(e) = sent {
            lock_pending(&self.pending).waiters.remove(&id);
            return Err(e);
        }

        let value = match timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(RpcError::Closed),
            Err(_) => {
                lock_pending(&self.pending).waiters.remove(&id);
                warn!("Request {} #{} timed out", method, id);
                return Err(RpcError::Timeout);
            }
        };

        Ok(serde_json::from_value(value)?)
    }

    /// Stops reading and fails every outstanding request.
    pub fn shutdown(&self) {
        self.reader_task.abort();
        fail_pending(&self.pending);
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[async_trait]
impl ToolsService for RpcClient {
    async fn create_session(
        &self,
        details: ConnectionDetails,
    ) -> Result<CreateSessionResponse, ExplorerError> {
        Ok(self.call(methods::CREATE_SESSION, &details).await?)
    }

    async fn expand(&self, params: ExpandParams) -> Result<bool, ExplorerError> {
        Ok(self.call(methods::EXPAND, &params).await?)
    }

    async fn refresh(&self, params: ExpandParams) -> Result<bool, ExplorerError> {
        Ok(self.call(methods::REFRESH, &params).await?)
    }

    async fn close_session(
        &self,
        params: CloseSessionParams,
    ) -> Result<CloseSessionResponse, ExplorerError> {
        Ok(self.call(methods::CLOSE_SESSION, &params).await?)
    }
}

async fn read_loop<R>(
    mut reader: R,
    pending: SharedPending,
    notifications: mpsc::UnboundedSender<ToolsNotification>,
) where
    R: AsyncBufRead + Unpin,
{
    loop {
        let body = match read_message(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                info!("Tools service closed its output");
                break;
            }
            Err(e) => {
                error!("Failed to read from tools service: {}", e);
                break;
            }
        };

        match IncomingMessage::parse(&body) {
            Ok(IncomingMessage::Response(response)) => {
                let waiter = lock_pending(&pending).waiters.remove(&response.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response.into_result());
                    }
                    None => warn!("Response for unknown request #{}", response.id),
                }
            }
            Ok(IncomingMessage::Notification(notification)) => {
                let method = notification.method.clone();
                match decode_notification(notification) {
                    Ok(Some(decoded)) => {
                        if notifications.send(decoded).is_err() {
                            debug!("Notification receiver dropped, discarding {}", method);
                        }
                    }
                    Ok(None) => debug!("Ignoring notification {}", method),
                    Err(e) => warn!("Malformed {} notification: {}", method, e),
                }
            }
            Ok(IncomingMessage::Request(request)) => {
                debug!("Ignoring request {} from tools service", request.method);
            }
            Err(e) => warn!("Discarding malformed message: {}", e),
        }
    }

    fail_pending(&pending);
}

fn fail_pending(pending: &Mutex<PendingReplies>) {
    let waiters: Vec<Reply> = {
        let mut pending = lock_pending(pending);
        pending.closed = true;
        pending.waiters.drain().map(|(_, tx)| tx).collect()
    };

    for tx in waiters {
        let _ = tx.send(Err(RpcError::Closed));
    }
}

fn decode_notification(
    notification: RpcNotification,
) -> Result<Option<ToolsNotification>, RpcError> {
    let decoded = match notification.method.as_str() {
        methods::SESSION_CREATED => Some(ToolsNotification::SessionCreated(
            serde_json::from_value(notification.params)?,
        )),
        methods::EXPAND_COMPLETED => Some(ToolsNotification::ExpandCompleted(
            serde_json::from_value(notification.params)?,
        )),
        _ => None,
    };

    Ok(decoded)
}
