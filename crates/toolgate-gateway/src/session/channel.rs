//! Channels
//!
//! A channel is one logical JSON-RPC path between a client and the server.
//! Both transports end up as the same [`ChannelIo`] halves:
//!
//! - stdio: newline-delimited JSON over a byte stream pair
//! - SSE: outbound messages feed one long-lived event-stream response,
//!   inbound messages arrive through separate POSTs and are pushed into an
//!   mpsc queue
//!
//! Lifecycle belongs to [`ChannelCloser`]; the protocol engine only sees the
//! send/receive halves.

use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::{CancellationToken, PollSender};
use tracing::{debug, warn};

use toolgate_core::TransportKind;

/// Default depth of the SSE inbound and outbound queues
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("line codec failed: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),
}

type CloseObserver = Box<dyn FnOnce() + Send>;

struct CloserInner {
    closed: AtomicBool,
    token: CancellationToken,
    observers: Mutex<Vec<CloseObserver>>,
}

/// Idempotent close signal shared by every half of a channel
#[derive(Clone)]
pub struct ChannelCloser {
    inner: Arc<CloserInner>,
}

impl ChannelCloser {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CloserInner {
                closed: AtomicBool::new(false),
                token: CancellationToken::new(),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Close the channel. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.token.cancel();
        let observers = std::mem::take(&mut *self.inner.observers.lock());
        for observer in observers {
            observer();
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Run `observer` once when the channel closes, or now if it already has
    pub fn on_close<F>(&self, observer: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut observers = self.inner.observers.lock();
        if self.is_closed() {
            drop(observers);
            observer();
        } else {
            observers.push(Box::new(observer));
        }
    }

    /// Resolves once the channel is closed
    pub async fn closed(&self) {
        self.inner.token.cancelled().await
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}

impl Default for ChannelCloser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChannelCloser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCloser")
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub type OutboundSink = Pin<Box<dyn Sink<ServerJsonRpcMessage, Error = ChannelError> + Send>>;
pub type InboundStream = Pin<Box<dyn Stream<Item = ClientJsonRpcMessage> + Send>>;

/// The halves handed to the protocol engine
pub struct ChannelIo {
    pub kind: TransportKind,
    pub outbound: OutboundSink,
    pub inbound: InboundStream,
    pub closer: ChannelCloser,
}

impl ChannelIo {
    pub fn into_parts(self) -> (OutboundSink, InboundStream, ChannelCloser) {
        (self.outbound, self.inbound, self.closer)
    }
}

/// The registry-side handle of an SSE channel
#[derive(Clone)]
pub struct SseChannel {
    inbound_tx: mpsc::Sender<ClientJsonRpcMessage>,
    closer: ChannelCloser,
}

impl SseChannel {
    /// Create an SSE channel
    ///
    /// Returns the registry handle, the engine halves, and the receiver the
    /// HTTP response drains into event-stream frames.
    pub fn open(buffer: usize) -> (SseChannel, ChannelIo, mpsc::Receiver<ServerJsonRpcMessage>) {
        let closer = ChannelCloser::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);

        let outbound = PollSender::new(outbound_tx).sink_map_err(|_| ChannelError::Closed);
        let inbound = cancellable(inbound_rx, closer.token());

        let io = ChannelIo {
            kind: TransportKind::Sse,
            outbound: Box::pin(outbound),
            inbound: Box::pin(inbound),
            closer: closer.clone(),
        };

        (SseChannel { inbound_tx, closer }, io, outbound_rx)
    }

    /// Push a client message into the channel
    ///
    /// Waits while the inbound queue is full; a close during the wait ends it
    /// with [`ChannelError::Closed`].
    pub async fn deliver(&self, message: ClientJsonRpcMessage) -> Result<(), ChannelError> {
        if self.closer.is_closed() {
            return Err(ChannelError::Closed);
        }
        tokio::select! {
            _ = self.closer.closed() => Err(ChannelError::Closed),
            sent = self.inbound_tx.send(message) => sent.map_err(|_| ChannelError::Closed),
        }
    }

    pub fn closer(&self) -> &ChannelCloser {
        &self.closer
    }

    pub fn close(&self) -> bool {
        self.closer.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }
}

fn cancellable(
    mut rx: mpsc::Receiver<ClientJsonRpcMessage>,
    token: CancellationToken,
) -> impl Stream<Item = ClientJsonRpcMessage> + Send {
    async_stream::stream! {
        loop {
            let message = tokio::select! {
                _ = token.cancelled() => None,
                message = rx.recv() => message,
            };
            match message {
                Some(message) => yield message,
                None => break,
            }
        }
    }
}

/// Newline-delimited JSON-RPC over a byte stream pair
///
/// Lines that fail to parse are logged and skipped. The inbound half ends at
/// EOF, a read error, or close; reaching EOF closes the channel.
pub fn byte_stream_channel<R, W>(reader: R, writer: W) -> ChannelIo
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let closer = ChannelCloser::new();
    let token = closer.token();
    let eof_closer = closer.clone();

    let mut lines = FramedRead::new(reader, LinesCodec::new());
    let inbound = async_stream::stream! {
        loop {
            let line = tokio::select! {
                _ = token.cancelled() => None,
                line = lines.next() => line,
            };
            match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ClientJsonRpcMessage>(&line) {
                        Ok(message) => yield message,
                        Err(e) => warn!("[Stdio] Skipping malformed message: {}", e),
                    }
                }
                Some(Err(e)) => {
                    warn!("[Stdio] Read failed: {}", e);
                    break;
                }
                None => {
                    debug!("[Stdio] Input reached EOF");
                    break;
                }
            }
        }
        eof_closer.close();
    };

    let outbound = FramedWrite::new(writer, LinesCodec::new()).with(
        |message: ServerJsonRpcMessage| async move {
            serde_json::to_string(&message).map_err(ChannelError::from)
        },
    );

    ChannelIo {
        kind: TransportKind::Stdio,
        outbound: Box::pin(outbound),
        inbound: Box::pin(inbound),
        closer,
    }
}

/// The process's stdin/stdout as one channel
pub fn stdio_channel() -> ChannelIo {
    byte_stream_channel(tokio::io::stdin(), tokio::io::stdout())
}
