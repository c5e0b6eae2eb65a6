//! Subscriptions: long-lived message sources declared by `Program::subscriptions`.
//!
//! After every applied cycle the declared set is compared with the running one by
//! [`SubscriptionId`]: new ids start a source, vanished ids stop theirs, and ids present in
//! both keep running with the freshest tagger. Payloads carry the token of the source instance
//! that produced them, so anything a stopped source left in the queue is dropped instead of
//! reaching `update`.

use bus::{MessageSender, SourcePayload, SourceSink, SourceToken};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Arc<str>);

impl SubscriptionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        SubscriptionId(Arc::from(value))
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        SubscriptionId(Arc::from(value))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-provided source. `start` is called once per activation; the returned handle is stopped
/// exactly once, when the subscription disappears or the runtime tears down.
pub trait EventSource {
    fn start(&self, sink: SourceSink) -> io::Result<Box<dyn ActiveSource>>;
}

pub trait ActiveSource {
    /// Stop producing. Must not return before the source has stopped using its sink.
    fn stop(self: Box<Self>);
}

#[derive(Clone)]
pub enum Source {
    Timer { every: Duration },
    /// Global events the host forwards through `Runtime::host_event`.
    HostEvent { event: Arc<str> },
    Custom(Arc<dyn EventSource>),
}

impl Source {
    /// Whether a running instance of `self` can serve `next` without a restart.
    fn serves(&self, next: &Source) -> bool {
        match (self, next) {
            (Source::Timer { every: a }, Source::Timer { every: b }) => a == b,
            (Source::HostEvent { event: a }, Source::HostEvent { event: b }) => a == b,
            (Source::Custom(_), Source::Custom(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Timer { every } => f.debug_struct("Timer").field("every", every).finish(),
            Source::HostEvent { event } => {
                f.debug_struct("HostEvent").field("event", event).finish()
            }
            Source::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

type Tagger<M> = Arc<dyn Fn(SourcePayload) -> Option<M>>;

pub struct Subscription<M> {
    pub id: SubscriptionId,
    pub source: Source,
    tagger: Tagger<M>,
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish()
    }
}

impl<M: 'static> Subscription<M> {
    pub fn new(
        id: impl Into<SubscriptionId>,
        source: Source,
        tagger: impl Fn(SourcePayload) -> Option<M> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            tagger: Arc::new(tagger),
        }
    }

    /// Tick every `every`, starting one interval after activation.
    pub fn every(
        id: impl Into<SubscriptionId>,
        every: Duration,
        f: impl Fn(SystemTime) -> M + 'static,
    ) -> Self {
        Self::new(id, Source::Timer { every }, move |payload| match payload {
            SourcePayload::Tick { at } => Some(f(at)),
            SourcePayload::Data(_) => None,
        })
    }

    pub fn on_host_event(
        id: impl Into<SubscriptionId>,
        event: &str,
        f: impl Fn(&Value) -> Option<M> + 'static,
    ) -> Self {
        Self::new(
            id,
            Source::HostEvent {
                event: Arc::from(event),
            },
            move |payload| match payload {
                SourcePayload::Data(value) => f(&value),
                SourcePayload::Tick { .. } => None,
            },
        )
    }

    pub fn custom(
        id: impl Into<SubscriptionId>,
        source: Arc<dyn EventSource>,
        tagger: impl Fn(SourcePayload) -> Option<M> + 'static,
    ) -> Self {
        Self::new(id, Source::Custom(source), tagger)
    }

    pub fn batch(groups: impl IntoIterator<Item = Vec<Subscription<M>>>) -> Vec<Subscription<M>> {
        groups.into_iter().flatten().collect()
    }
}

/// What one reconcile did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub started: usize,
    pub stopped: usize,
    pub kept: usize,
}

struct Active<M> {
    token: SourceToken,
    source: Source,
    tagger: Tagger<M>,
    handle: Option<Box<dyn ActiveSource>>,
}

impl<M> Active<M> {
    fn stop(self, id: &SubscriptionId) {
        log::debug!(target: "runtime.subs", "stop {id} ({:?})", self.token);
        if let Some(handle) = self.handle {
            handle.stop();
        }
    }
}

/// Running subscriptions of one runtime.
pub(crate) struct SubscriptionSet<M> {
    active: BTreeMap<SubscriptionId, Active<M>>,
    tokens: HashMap<SourceToken, SubscriptionId>,
}

impl<M: Send + 'static> SubscriptionSet<M> {
    pub(crate) fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            tokens: HashMap::new(),
        }
    }

    pub(crate) fn reconcile(
        &mut self,
        declared: Vec<Subscription<M>>,
        sender: &MessageSender<M>,
    ) -> io::Result<ReconcileStats> {
        let mut next: BTreeMap<SubscriptionId, Subscription<M>> = BTreeMap::new();
        for subscription in declared {
            if next.contains_key(&subscription.id) {
                log::warn!(
                    target: "runtime.subs",
                    "subscription {} declared twice; keeping the last one",
                    subscription.id
                );
            }
            next.insert(subscription.id.clone(), subscription);
        }

        let mut stats = ReconcileStats::default();
        let vanished: Vec<SubscriptionId> = self
            .active
            .iter()
            .filter(|(id, active)| !next.get(*id).is_some_and(|n| active.source.serves(&n.source)))
            .map(|(id, _)| id.clone())
            .collect();
        for id in vanished {
            if let Some(active) = self.active.remove(&id) {
                self.tokens.remove(&active.token);
                active.stop(&id);
                stats.stopped += 1;
            }
        }

        for (id, subscription) in next {
            if let Some(active) = self.active.get_mut(&id) {
                active.tagger = subscription.tagger;
                stats.kept += 1;
                continue;
            }
            let token = SourceToken::fresh();
            let handle = start(&subscription.source, sender.source_sink(token))?;
            log::debug!(
                target: "runtime.subs",
                "start {id} ({:?}, {:?})",
                subscription.source,
                token
            );
            self.tokens.insert(token, id.clone());
            self.active.insert(
                id,
                Active {
                    token,
                    source: subscription.source,
                    tagger: subscription.tagger,
                    handle,
                },
            );
            stats.started += 1;
        }
        Ok(stats)
    }
}

impl<M> SubscriptionSet<M> {
    /// Message for a payload, or `None` when its source is no longer active.
    pub(crate) fn tag(&self, token: SourceToken, payload: SourcePayload) -> Option<M> {
        let Some(id) = self.tokens.get(&token) else {
            log::debug!(target: "runtime.subs", "dropping payload of stopped source {token:?}");
            return None;
        };
        let active = self.active.get(id)?;
        (active.tagger)(payload)
    }

    /// Messages of every host-event subscription listening to `event`, in id order.
    pub(crate) fn host_event(&self, event: &str, value: &Value) -> Vec<M> {
        self.active
            .values()
            .filter(|active| {
                matches!(&active.source, Source::HostEvent { event: e } if &**e == event)
            })
            .filter_map(|active| (active.tagger)(SourcePayload::Data(value.clone())))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = &SubscriptionId> {
        self.active.keys()
    }

    pub(crate) fn cancel_all(&mut self) {
        self.tokens.clear();
        while let Some((id, active)) = self.active.pop_first() {
            active.stop(&id);
        }
    }
}

impl<M> Drop for SubscriptionSet<M> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn start(source: &Source, sink: SourceSink) -> io::Result<Option<Box<dyn ActiveSource>>> {
    match source {
        Source::Timer { every } => Ok(Some(Box::new(Timer::spawn(*every, sink)?))),
        Source::HostEvent { .. } => Ok(None),
        Source::Custom(source) => source.start(sink).map(Some),
    }
}

/// Shortest interval a timer runs at; shorter requests are raised to it.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Interval source on its own thread, parked between ticks.
struct Timer {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Timer {
    fn spawn(every: Duration, sink: SourceSink) -> io::Result<Self> {
        if every < MIN_INTERVAL {
            log::warn!(
                target: "runtime.subs",
                "timer interval {every:?} raised to {MIN_INTERVAL:?}"
            );
        }
        let every = every.max(MIN_INTERVAL);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("timer-{}", sink.token().0))
            .spawn(move || {
                let mut deadline = Instant::now() + every;
                loop {
                    if flag.load(Ordering::Acquire) {
                        return;
                    }
                    let now = Instant::now();
                    if now < deadline {
                        thread::park_timeout(deadline - now);
                        continue;
                    }
                    if !sink.tick() {
                        return;
                    }
                    deadline += every;
                }
            })?;
        Ok(Self { stop, thread })
    }
}

impl ActiveSource for Timer {
    fn stop(self: Box<Self>) {
        self.stop.store(true, Ordering::Release);
        self.thread.thread().unpark();
        if self.thread.join().is_err() {
            log::error!(target: "runtime.subs", "timer thread panicked");
        }
    }
}
