//! One participant's connection to the hub, demultiplexed into the four
//! domain layers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use hero_core::ItemId;
use hero_protocol::frames::ServerFrame;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::domain::Domain;
use crate::error::ClientError;
use crate::layer::{Advisory, Mirrors};

const ADVISORY_CAPACITY: usize = 32;

struct State {
    mirrors: Mirrors,
    /// Writer half of the live connection. `None` while disconnected.
    outbound: Option<mpsc::UnboundedSender<String>>,
}

struct Shared {
    config: ClientConfig,
    state: Mutex<State>,
    revision: watch::Sender<u64>,
    advisories: broadcast::Sender<Advisory>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn set_outbound(&self, tx: Option<mpsc::UnboundedSender<String>>) {
        self.state().outbound = tx;
        self.bump();
    }

    fn apply(&self, text: &str) {
        let frame = match ServerFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping unreadable frame from hub");
                return;
            }
        };
        let advisory = self.state().mirrors.apply(frame);
        if let Some(advisory) = advisory {
            info!(class = ?advisory.class, message = %advisory.message, "hub advisory");
            // no subscribers is fine
            let _ = self.advisories.send(advisory);
        }
        self.bump();
    }
}

/// Handle to a running session. Dropping it stops the background task.
pub struct Session {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Start connecting in the background. Returns immediately; watch
    /// `subscribe()` or poll `is_connected()` for the connection to come up.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let url = config.connect_url()?;
        let (revision, _) = watch::channel(0);
        let (advisories, _) = broadcast::channel(ADVISORY_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                mirrors: Mirrors::new(config.cooldown),
                outbound: None,
            }),
            config,
            revision,
            advisories,
        });

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(Arc::clone(&shared), url, cancel.clone()));
        Ok(Self {
            shared,
            cancel,
            task: Some(task),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state().outbound.is_some()
    }

    /// Snapshot of one domain's local mirror.
    pub fn items<D: Domain>(&self) -> Vec<D::Item> {
        self.shared.state().mirrors.layer::<D>().items().to_vec()
    }

    /// Send a creation frame for domain `D`.
    ///
    /// Refused locally while disconnected, for a draft the hub would drop, or
    /// while the domain's cooldown runs. Nothing is queued or shown then.
    pub fn submit<D: Domain>(&self, draft: D::Draft) -> Result<(), ClientError> {
        {
            let mut state = self.shared.state();
            let Some(tx) = state.outbound.clone() else {
                return Err(ClientError::Disconnected);
            };

            let author = self.shared.config.display_name.as_deref();
            let layer = state.mirrors.layer_mut::<D>();
            let (frame, submission) = layer.begin_submit(&draft, author, Instant::now())?;

            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    layer.abort_submit(submission);
                    return Err(e.into());
                }
            };
            if tx.send(text).is_err() {
                layer.abort_submit(submission);
                return Err(ClientError::Disconnected);
            }
            debug!(class = %D::CLASS, kind = frame.kind(), "submitted");
        }
        self.shared.bump();
        Ok(())
    }

    /// Ask the hub to remove a record. The mirror changes only when the
    /// hub's removal broadcast comes back.
    pub fn remove<D: Domain>(&self, id: &ItemId) -> Result<(), ClientError> {
        let text = serde_json::to_string(&D::removal_frame(id.clone()))?;
        let state = self.shared.state();
        let tx = state.outbound.as_ref().ok_or(ClientError::Disconnected)?;
        tx.send(text).map_err(|_| ClientError::Disconnected)
    }

    /// Revision counter, bumped on every mirror or connection change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Server `error` frames (rate-limit and authorization refusals).
    pub fn advisories(&self) -> broadcast::Receiver<Advisory> {
        self.shared.advisories.subscribe()
    }

    /// Close the connection and wait for the background task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Connect, drive until the socket ends, wait the fixed delay, repeat.
/// Retries never stop; only their logging is bounded.
async fn run(shared: Arc<Shared>, url: Url, cancel: CancellationToken) {
    // the URL may carry the credential, so only the host is logged
    let host = url.host_str().unwrap_or_default().to_string();
    let delay = shared.config.reconnect_delay;
    let max_logged = shared.config.max_logged_retries;
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        let failure = match connected {
            Ok((ws, _response)) => {
                attempt = 0;
                info!(host = %host, "connected to hub");
                drive(&shared, ws, &cancel).await;
                shared.set_outbound(None);
                if cancel.is_cancelled() {
                    break;
                }
                info!(host = %host, "connection to hub closed");
                None
            }
            Err(e) => Some(e),
        };

        attempt = attempt.saturating_add(1);
        let delay_ms = delay.as_millis() as u64;
        if retry_is_logged(attempt, max_logged) {
            if let Some(e) = &failure {
                warn!(host = %host, error = %e, "could not reach hub");
            }
            info!(attempt, delay_ms, "reconnecting");
        } else {
            if let Some(e) = &failure {
                debug!(host = %host, error = %e, "could not reach hub");
            }
            debug!(attempt, delay_ms, "reconnecting");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    shared.set_outbound(None);
    debug!(host = %host, "session stopped");
}

/// Attempts past `max_logged` go to debug. This gates logging only; the
/// loop in `run` retries regardless.
fn retry_is_logged(attempt: u32, max_logged: u32) -> bool {
    attempt <= max_logged
}

async fn drive(
    shared: &Shared,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cancel: &CancellationToken,
) {
    let (mut write, mut read) = ws.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    shared.set_outbound(Some(tx));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => shared.apply(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    // pings are answered by tungstenite on the next read
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "read from hub failed");
                        break;
                    }
                }
            }

            frame = outbound.recv() => {
                let Some(text) = frame else { break };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    debug!(error = %e, "write to hub failed");
                    break;
                }
            }
        }
    }
}
