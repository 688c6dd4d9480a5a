//! Blocking client with an in-memory request queue.
//!
//! Queued requests go through a bounded channel to a dispatcher thread that
//! keeps retrying transport failures, so the watcher never waits on the
//! network. Unqueued requests are sent on the caller's thread.

use crate::client::http::{AwClient, ClientConfig};
use crate::client::{ClientError, Event, Reporter};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Maximum number of requests waiting for delivery.
pub const QUEUE_CAPACITY: usize = 1_000;

/// Pause between attempts at a failing request.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
enum Request {
    CreateBucket {
        bucket_id: String,
        event_type: String,
    },
    Heartbeat {
        bucket_id: String,
        event: Event,
        pulsetime: f64,
    },
}

impl Request {
    async fn send(&self, client: &AwClient) -> Result<(), ClientError> {
        match self {
            Request::CreateBucket {
                bucket_id,
                event_type,
            } => client.create_bucket(bucket_id, event_type).await,
            Request::Heartbeat {
                bucket_id,
                event,
                pulsetime,
            } => client.heartbeat(bucket_id, event, *pulsetime).await,
        }
    }
}

/// Client for use in synchronous contexts, with queued delivery.
pub struct QueuedClient {
    client: Arc<AwClient>,
    runtime: Arc<Runtime>,
    sender: Option<Sender<Request>>,
    closing: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
}

impl QueuedClient {
    /// Create a new queued client.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_retry_delay(config, DEFAULT_RETRY_DELAY)
    }

    /// Create a new queued client that waits `retry_delay` between attempts.
    pub fn with_retry_delay(
        config: ClientConfig,
        retry_delay: Duration,
    ) -> Result<Self, ClientError> {
        // Both the dispatcher and the caller block on this runtime
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create runtime: {e}")))?;
        let runtime = Arc::new(runtime);
        let client = Arc::new(AwClient::new(config)?);
        let closing = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = bounded(QUEUE_CAPACITY);

        let dispatcher = {
            let client = client.clone();
            let runtime = runtime.clone();
            let closing = closing.clone();
            thread::Builder::new()
                .name("aw-client-dispatch".to_string())
                .spawn(move || dispatch_loop(receiver, client, runtime, closing, retry_delay))
                .map_err(|e| ClientError::Config(format!("Failed to spawn dispatcher: {e}")))?
        };

        Ok(Self {
            client,
            runtime,
            sender: Some(sender),
            closing,
            dispatcher: Some(dispatcher),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// The bucket this client reports into.
    pub fn bucket_id(&self) -> String {
        self.client.config().bucket_id()
    }

    /// Test connection to the server.
    pub fn test_connection(&self) -> Result<bool, ClientError> {
        self.runtime.block_on(self.client.info()).map(|_| true)
    }

    /// Stop accepting requests and deliver what is already queued.
    ///
    /// Each remaining request gets one more attempt; failures are dropped.
    pub fn close(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        self.sender.take();
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }

    fn submit(&self, request: Request, queued: bool) -> Result<(), ClientError> {
        if !queued {
            return self.runtime.block_on(request.send(&self.client));
        }

        let sender = self.sender.as_ref().ok_or(ClientError::Closed)?;
        match sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ClientError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(ClientError::Closed),
        }
    }
}

impl Reporter for QueuedClient {
    fn create_bucket(
        &self,
        bucket_id: &str,
        event_type: &str,
        queued: bool,
    ) -> Result<(), ClientError> {
        let request = Request::CreateBucket {
            bucket_id: bucket_id.to_string(),
            event_type: event_type.to_string(),
        };
        self.submit(request, queued)
    }

    fn heartbeat(
        &self,
        bucket_id: &str,
        event: Event,
        pulsetime: f64,
        queued: bool,
    ) -> Result<(), ClientError> {
        let request = Request::Heartbeat {
            bucket_id: bucket_id.to_string(),
            event,
            pulsetime,
        };
        self.submit(request, queued)
    }
}

impl Drop for QueuedClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Deliver queued requests in order, holding on to a failing one until it
/// goes through or the client closes.
fn dispatch_loop(
    receiver: Receiver<Request>,
    client: Arc<AwClient>,
    runtime: Arc<Runtime>,
    closing: Arc<AtomicBool>,
    retry_delay: Duration,
) {
    let mut pending: Option<Request> = None;

    loop {
        let request = match pending.take() {
            Some(request) => request,
            None => match receiver.recv() {
                Ok(request) => request,
                // Sender dropped and queue empty
                Err(_) => break,
            },
        };

        match runtime.block_on(request.send(&client)) {
            Ok(()) => debug!("Delivered queued request"),
            Err(e) if e.is_retryable() && !closing.load(Ordering::SeqCst) => {
                warn!("Request failed, retrying in {retry_delay:?}: {e}");
                pending = Some(request);
                sleep_unless_closing(&closing, retry_delay);
            }
            Err(e) => warn!("Dropping request: {e}"),
        }
    }
}

fn sleep_unless_closing(closing: &AtomicBool, delay: Duration) {
    let deadline = Instant::now() + delay;
    while !closing.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}
