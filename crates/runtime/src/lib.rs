//! Single-threaded Model-View-Update runtime.
//!
//! One queue, one consumer: every message goes through `update`, the new model through `view`,
//! the new tree is aligned with and diffed against the one the host shows, and the patches
//! cross to the [`PatchExecutor`] as one encoded batch per cycle. Handler bindings, commands and
//! subscriptions are driven from the same loop.

mod command;
mod config;
mod effects;
mod error;
mod executor;
mod nav;
mod program;
mod registry;
mod runtime;
mod subscription;

pub use crate::command::{Command, Navigation};
pub use crate::config::{ConfigError, RuntimeConfig};
pub use crate::effects::{EffectInterpreter, NoEffects, ThreadInterpreter};
pub use crate::error::RuntimeError;
pub use crate::executor::{ExecutorError, PatchExecutor};
pub use crate::nav::{History, LocationChange};
pub use crate::program::{Program, UrlRequest};
pub use crate::registry::{DispatchError, HandlerRegistry, RegistryError};
pub use crate::runtime::{RunState, Runtime};
pub use crate::subscription::{
    ActiveSource, EventSource, ReconcileStats, Source, Subscription, SubscriptionId,
};
pub use bus::{MessageSender, SourcePayload, SourceSink};
pub use url::Url;
