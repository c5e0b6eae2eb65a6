//! Queue plumbing between message producers and the single runtime consumer.
//!
//! Producers (timer threads, custom sources, effect threads, the host) only ever send; the
//! runtime owns the receiving end and drains it in FIFO order.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, SystemTime};
use url::Url;

/// One item on the runtime queue.
pub enum RuntimeEvent<M> {
    /// Ready message for `update`.
    Message(M),
    /// Raw output of a subscription source. The runtime tags it with the subscription that
    /// owns `token`, or drops it when that subscription is gone.
    Source {
        token: SourceToken,
        payload: SourcePayload,
    },
    /// The current location changed (history traversal, pushed url).
    UrlChanged(Url),
    /// Stop `Runtime::run`.
    Teardown,
}

impl<M: fmt::Debug> fmt::Debug for RuntimeEvent<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeEvent::Message(m) => f.debug_tuple("Message").field(m).finish(),
            RuntimeEvent::Source { token, payload } => f
                .debug_struct("Source")
                .field("token", token)
                .field("payload", payload)
                .finish(),
            RuntimeEvent::UrlChanged(url) => f.debug_tuple("UrlChanged").field(url).finish(),
            RuntimeEvent::Teardown => f.write_str("Teardown"),
        }
    }
}

/// What a subscription source produced.
#[derive(Clone, Debug, PartialEq)]
pub enum SourcePayload {
    Tick { at: SystemTime },
    Data(Value),
}

/// Identifies one started instance of a subscription source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceToken(pub u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl SourceToken {
    pub fn fresh() -> Self {
        SourceToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Unbounded FIFO queue owned by one runtime.
pub struct Queue<M> {
    tx: Sender<RuntimeEvent<M>>,
    rx: Receiver<RuntimeEvent<M>>,
}

impl<M> Queue<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> MessageSender<M> {
        MessageSender {
            tx: self.tx.clone(),
        }
    }

    /// Push from the consumer side.
    pub fn push(&self, event: RuntimeEvent<M>) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.tx.send(event);
    }

    pub fn try_next(&self) -> Option<RuntimeEvent<M>> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<RuntimeEvent<M>> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocks until an event arrives. `self` holds a sender, so this never disconnects.
    pub fn next_blocking(&self) -> Option<RuntimeEvent<M>> {
        self.rx.recv().ok()
    }
}

impl<M> Default for Queue<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer handle; cheap to clone and `Send` when `M` is.
pub struct MessageSender<M> {
    tx: Sender<RuntimeEvent<M>>,
}

impl<M> Clone for MessageSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> fmt::Debug for MessageSender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageSender")
    }
}

impl<M> MessageSender<M> {
    /// Enqueue a message. Returns `false` once the runtime is gone.
    pub fn send(&self, message: M) -> bool {
        self.tx.send(RuntimeEvent::Message(message)).is_ok()
    }

    pub fn send_event(&self, event: RuntimeEvent<M>) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn teardown(&self) -> bool {
        self.send_event(RuntimeEvent::Teardown)
    }
}

impl<M: Send + 'static> MessageSender<M> {
    /// Message-agnostic sink for one source instance.
    pub fn source_sink(&self, token: SourceToken) -> SourceSink {
        let tx = self.tx.clone();
        SourceSink {
            token,
            emit: Arc::new(move |payload| tx.send(RuntimeEvent::Source { token, payload }).is_ok()),
        }
    }
}

/// Where a subscription source delivers its payloads.
#[derive(Clone)]
pub struct SourceSink {
    token: SourceToken,
    emit: Arc<dyn Fn(SourcePayload) -> bool + Send + Sync>,
}

impl SourceSink {
    pub fn token(&self) -> SourceToken {
        self.token
    }

    /// Returns `false` once the runtime is gone; sources should stop then.
    pub fn emit(&self, payload: SourcePayload) -> bool {
        let delivered = (self.emit)(payload);
        if !delivered {
            log::debug!(target: "runtime.subs", "source {:?} outlived its runtime", self.token);
        }
        delivered
    }

    pub fn tick(&self) -> bool {
        self.emit(SourcePayload::Tick {
            at: SystemTime::now(),
        })
    }

    pub fn data(&self, value: Value) -> bool {
        self.emit(SourcePayload::Data(value))
    }
}

impl fmt::Debug for SourceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSink").field("token", &self.token).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo_across_senders() {
        let queue: Queue<u32> = Queue::new();
        let a = queue.sender();
        let b = a.clone();
        assert!(a.send(1));
        assert!(b.send(2));
        queue.push(RuntimeEvent::Message(3));

        let drained: Vec<u32> = std::iter::from_fn(|| queue.try_next())
            .filter_map(|event| match event {
                RuntimeEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(drained, vec![1, 2, 3]);
    }

    #[test]
    fn sink_tags_payloads_with_its_token() {
        let queue: Queue<()> = Queue::new();
        let token = SourceToken::fresh();
        let sink = queue.sender().source_sink(token);
        assert!(sink.data(serde_json::json!({"k": 1})));

        match queue.try_next() {
            Some(RuntimeEvent::Source { token: got, payload }) => {
                assert_eq!(got, token);
                assert_eq!(payload, SourcePayload::Data(serde_json::json!({"k": 1})));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn senders_notice_a_dropped_runtime() {
        let queue: Queue<u8> = Queue::new();
        let sender = queue.sender();
        let sink = sender.source_sink(SourceToken::fresh());
        drop(queue);
        assert!(!sender.send(1));
        assert!(!sink.tick());
    }

    #[test]
    fn timeout_returns_none_on_empty_queue() {
        let queue: Queue<u8> = Queue::new();
        assert!(queue.next_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(SourceToken::fresh(), SourceToken::fresh());
    }
}
