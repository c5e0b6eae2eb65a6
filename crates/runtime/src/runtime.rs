use crate::command::{Command, Navigation};
use crate::config::RuntimeConfig;
use crate::effects::EffectInterpreter;
use crate::error::RuntimeError;
use crate::executor::{ExecutorError, PatchExecutor};
use crate::nav::{History, LocationChange};
use crate::program::{Program, UrlRequest};
use crate::registry::{DispatchError, HandlerRegistry};
use crate::subscription::{SubscriptionId, SubscriptionSet};
use bus::{MessageSender, Queue, RuntimeEvent};
use core_types::{CommandId, RenderVersion};
use std::time::Duration;
use url::Url;
use vdom::{Node, Patch, align, diff_optional};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Running,
    TornDown,
}

/// One rendered view, not yet shipped.
struct Frame<M> {
    body: Node<M>,
    title: String,
    patches: Vec<Patch>,
}

/// Owns one hosted program: its model, the last applied tree, the handler registry, the
/// subscriptions and the message queue feeding them all.
pub struct Runtime<P: Program, X, I> {
    program: P,
    executor: X,
    interpreter: I,
    config: RuntimeConfig,
    base: Option<Url>,
    queue: Queue<P::Message>,
    state: RunState,
    model: P::Model,
    tree: Option<Node<P::Message>>,
    title: Option<String>,
    version: RenderVersion,
    registry: HandlerRegistry<P::Message>,
    subscriptions: SubscriptionSet<P::Message>,
    history: History,
    rejected: usize,
}

impl<P, X, I> Runtime<P, X, I>
where
    P: Program,
    X: PatchExecutor,
    I: EffectInterpreter<P::Message, P::Effect>,
{
    /// Run `init`, mount the first view into the executor, then start the initial command and
    /// subscriptions.
    pub fn start(
        program: P,
        flags: P::Flags,
        url: Url,
        executor: X,
        interpreter: I,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let base = config.base()?;
        let (model, command) = program.init(&url, flags);
        let mut runtime = Runtime {
            program,
            executor,
            interpreter,
            config,
            base,
            queue: Queue::new(),
            state: RunState::Initializing,
            model,
            tree: None,
            title: None,
            version: RenderVersion::INITIAL,
            registry: HandlerRegistry::new(),
            subscriptions: SubscriptionSet::new(),
            history: History::new(url),
            rejected: 0,
        };

        let frame = runtime.render(&runtime.model);
        runtime.ship(&frame).map_err(RuntimeError::InitialRender)?;
        runtime.install(frame)?;
        runtime.reconcile_subscriptions()?;
        runtime.run_command(command);
        runtime.state = RunState::Running;
        log::debug!(
            target: "runtime.loop",
            "started at {} with {} handlers",
            runtime.version,
            runtime.registry.len()
        );
        Ok(runtime)
    }

    // -- Host entry points ---

    /// A DOM event fired on a handler without payload.
    pub fn dispatch(&mut self, command: &CommandId) -> Result<(), DispatchError> {
        self.enqueue_resolved(command, None)
    }

    /// A DOM event fired with the JSON payload its handler asked for.
    pub fn dispatch_with_data(
        &mut self,
        command: &CommandId,
        json: &str,
    ) -> Result<(), DispatchError> {
        self.enqueue_resolved(command, Some(json))
    }

    fn enqueue_resolved(
        &mut self,
        command: &CommandId,
        payload: Option<&str>,
    ) -> Result<(), DispatchError> {
        match self.registry.resolve(command, payload) {
            Ok(Some(message)) => {
                self.queue.push(RuntimeEvent::Message(message));
                Ok(())
            }
            Ok(None) => {
                log::trace!(target: "runtime.loop", "{command}: event ignored by its decoder");
                Ok(())
            }
            Err(err) => {
                log::warn!(target: "runtime.loop", "dispatch failed: {err}");
                Err(err)
            }
        }
    }

    /// A global event (keyboard, resize, ...) for host-event subscriptions. Returns how many
    /// messages it produced.
    pub fn host_event(&mut self, event: &str, json: &str) -> Result<usize, serde_json::Error> {
        let value = serde_json::from_str(json)?;
        let messages = self.subscriptions.host_event(event, &value);
        let produced = messages.len();
        for message in messages {
            self.queue.push(RuntimeEvent::Message(message));
        }
        Ok(produced)
    }

    /// The host changed the location on its own (back/forward buttons).
    pub fn url_changed(&mut self, url: Url) {
        self.queue.push(RuntimeEvent::UrlChanged(url));
    }

    /// The user followed a link; the program decides what happens.
    pub fn link_clicked(&mut self, href: &str) {
        let request = match self.history.resolve(href) {
            Ok(url) if self.is_internal(&url) => UrlRequest::Internal(url),
            Ok(url) => UrlRequest::External(url.to_string()),
            Err(_) => UrlRequest::External(href.to_string()),
        };
        log::debug!(target: "runtime.nav", "link {href} -> {request:?}");
        if let Some(message) = self.program.on_url_request(request) {
            self.queue.push(RuntimeEvent::Message(message));
        }
    }

    fn is_internal(&self, url: &Url) -> bool {
        match &self.base {
            Some(base) => url.as_str().starts_with(base.as_str()),
            None => url.origin() == self.history.current().origin(),
        }
    }

    // -- Driving ---

    /// Producer handle for threads outside the runtime.
    pub fn sender(&self) -> MessageSender<P::Message> {
        self.queue.sender()
    }

    /// Handle queued events until the queue is empty, or `max_drain` events were handled.
    pub fn run_until_idle(&mut self) -> Result<usize, RuntimeError> {
        let mut handled = 0;
        while self.state != RunState::TornDown {
            if handled == self.config.max_drain {
                log::warn!(
                    target: "runtime.loop",
                    "stopped draining after {handled} events; queue is still busy"
                );
                break;
            }
            let Some(event) = self.queue.try_next() else {
                break;
            };
            self.handle(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait up to `timeout` for one event and handle it.
    pub fn wait_and_process(&mut self, timeout: Duration) -> Result<bool, RuntimeError> {
        if self.state == RunState::TornDown {
            return Ok(false);
        }
        match self.queue.next_timeout(timeout) {
            Some(event) => {
                self.handle(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handle events until a `Teardown` arrives.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.state != RunState::TornDown {
            let Some(event) = self.queue.next_blocking() else {
                break;
            };
            self.handle(event)?;
        }
        Ok(())
    }

    /// Stop every subscription and forget every handler. Queued events are discarded.
    pub fn teardown(&mut self) {
        if self.state == RunState::TornDown {
            return;
        }
        self.subscriptions.cancel_all();
        self.registry.clear();
        self.state = RunState::TornDown;
        log::debug!(target: "runtime.loop", "torn down at {}", self.version);
    }

    fn handle(&mut self, event: RuntimeEvent<P::Message>) -> Result<(), RuntimeError> {
        match event {
            RuntimeEvent::Message(message) => self.step(message),
            RuntimeEvent::Source { token, payload } => {
                match self.subscriptions.tag(token, payload) {
                    Some(message) => self.step(message),
                    None => Ok(()),
                }
            }
            RuntimeEvent::UrlChanged(url) => {
                self.history.sync(&url);
                match self.program.on_url_change(&url) {
                    Some(message) => self.step(message),
                    None => Ok(()),
                }
            }
            RuntimeEvent::Teardown => {
                self.teardown();
                Ok(())
            }
        }
    }

    // -- Cycle ---

    /// update, view, diff, ship; on success swap in the new model and tree, then reconcile
    /// subscriptions and run the command.
    fn step(&mut self, message: P::Message) -> Result<(), RuntimeError> {
        let (model, command) = self.program.update(message, &self.model);
        let frame = self.render(&model);
        if let Err(err) = self.ship(&frame) {
            self.rejected += 1;
            log::error!(
                target: "runtime.loop",
                "batch for {} rejected, keeping the previous tree: {err}",
                self.version.next()
            );
            return Ok(());
        }
        self.model = model;
        self.install(frame)?;
        self.reconcile_subscriptions()?;
        self.run_command(command);
        Ok(())
    }

    fn render(&self, model: &P::Model) -> Frame<P::Message> {
        let document = self.program.view(model);
        let body = align(self.tree.as_ref(), document.body);
        let mut patches = diff_optional(self.tree.as_ref(), &body);
        if self.title.as_deref() != Some(document.title.as_str()) {
            patches.push(Patch::SetTitle {
                title: document.title.clone(),
            });
        }
        Frame {
            body,
            title: document.title,
            patches,
        }
    }

    /// Encode and apply. An empty frame ships nothing and keeps the version.
    fn ship(&mut self, frame: &Frame<P::Message>) -> Result<(), ExecutorError> {
        if frame.patches.is_empty() {
            return Ok(());
        }
        let version = self.version.next();
        let (batch, stats) = wire::encode_with_stats(&frame.patches);
        if self.config.log_batches {
            log::info!(
                target: "runtime.loop",
                "{version}: {} patches in {} bytes",
                stats.patches,
                stats.bytes
            );
        }
        #[cfg(feature = "patch-stats")]
        log::debug!(target: "runtime.loop", "{version}: {stats:?}");
        for patch in &frame.patches {
            log::trace!(target: "runtime.loop", "{version}: {patch:?}");
        }

        self.executor.apply(version, &batch)?;
        self.version = version;
        Ok(())
    }

    fn install(&mut self, frame: Frame<P::Message>) -> Result<(), RuntimeError> {
        self.registry
            .sync(&frame.patches, &frame.body, self.config.strict_handler_removal)?;
        self.tree = Some(frame.body);
        self.title = Some(frame.title);
        Ok(())
    }

    fn reconcile_subscriptions(&mut self) -> Result<(), RuntimeError> {
        let declared = self.program.subscriptions(&self.model);
        let sender = self.queue.sender();
        let stats = self.subscriptions.reconcile(declared, &sender)?;
        if stats.started + stats.stopped > 0 {
            log::debug!(target: "runtime.subs", "{stats:?}");
        }
        Ok(())
    }

    fn run_command(&mut self, command: Command<P::Message, P::Effect>) {
        match command {
            Command::None => {}
            Command::Batch(commands) => {
                for command in commands {
                    self.run_command(command);
                }
            }
            Command::Message(message) => self.queue.push(RuntimeEvent::Message(message)),
            Command::Perform(effect) => {
                let sender = self.queue.sender();
                self.interpreter.interpret(effect, &sender);
            }
            Command::Navigate(navigation) => self.navigate(navigation),
        }
    }

    fn navigate(&mut self, navigation: Navigation) {
        log::debug!(target: "runtime.nav", "{navigation:?}");
        match navigation {
            Navigation::PushUrl(href) => self.relocate(&href, LocationChange::Push),
            Navigation::ReplaceUrl(href) => self.relocate(&href, LocationChange::Replace),
            Navigation::Back(steps) => {
                match isize::try_from(steps).ok().and_then(isize::checked_neg) {
                    Some(delta) => self.traverse(delta),
                    None => log::warn!(target: "runtime.nav", "cannot go back {steps} entries"),
                }
            }
            Navigation::Forward(steps) => match isize::try_from(steps) {
                Ok(delta) => self.traverse(delta),
                Err(_) => log::warn!(target: "runtime.nav", "cannot go forward {steps} entries"),
            },
            Navigation::Load(href) => self.executor.load(&href),
        }
    }

    fn relocate(&mut self, href: &str, change: LocationChange) {
        let url = match self.history.resolve(href) {
            Ok(url) => url,
            Err(err) => {
                log::warn!(target: "runtime.nav", "cannot resolve {href}: {err}");
                return;
            }
        };
        match change {
            LocationChange::Push => self.history.push(url.clone()),
            LocationChange::Replace => self.history.replace(url.clone()),
        }
        self.executor.set_location(&url, change);
        self.queue.push(RuntimeEvent::UrlChanged(url));
    }

    fn traverse(&mut self, delta: isize) {
        match self.history.go(delta).cloned() {
            Some(url) => {
                self.executor.go(delta);
                self.queue.push(RuntimeEvent::UrlChanged(url));
            }
            None => log::debug!(target: "runtime.nav", "history cannot move by {delta}"),
        }
    }

    // -- Inspection ---

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn model(&self) -> &P::Model {
        &self.model
    }

    pub fn version(&self) -> RenderVersion {
        self.version
    }

    /// The tree the executor currently shows.
    pub fn tree(&self) -> Option<&Node<P::Message>> {
        self.tree.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn current_url(&self) -> &Url {
        self.history.current()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut X {
        &mut self.executor
    }

    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interpreter
    }

    pub fn registry(&self) -> &HandlerRegistry<P::Message> {
        &self.registry
    }

    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.ids().cloned().collect()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Batches the executor refused since start.
    pub fn rejected_batches(&self) -> usize {
        self.rejected
    }
}
