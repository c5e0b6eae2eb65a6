//! Command id to handler action mapping, kept in step with the live document.

use core_types::{CommandId, NodeId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use vdom::walk::collect_handlers;
use vdom::{HandlerAction, Node, Patch, PayloadKind};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("command {0} is already registered")]
    Duplicate(CommandId),
    #[error("command {0} is not registered")]
    Missing(CommandId),
    #[error("command {0} was added but is not in the rendered tree")]
    NotInTree(CommandId),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler for command {0}")]
    NotFound(CommandId),
    #[error("command {command} expects a {expected:?} payload")]
    MissingPayload {
        command: CommandId,
        expected: PayloadKind,
    },
    #[error("payload for command {command} does not decode: {source}")]
    InvalidPayload {
        command: CommandId,
        source: serde_json::Error,
    },
}

struct Entry<M> {
    node: NodeId,
    event: Arc<str>,
    action: HandlerAction<M>,
}

pub struct HandlerRegistry<M> {
    entries: HashMap<CommandId, Entry<M>>,
}

impl<M> HandlerRegistry<M> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        command: CommandId,
        node: NodeId,
        event: Arc<str>,
        action: HandlerAction<M>,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&command) {
            return Err(RegistryError::Duplicate(command));
        }
        log::trace!(target: "runtime.registry", "register {command} ({event} on {node})");
        self.entries.insert(
            command,
            Entry {
                node,
                event,
                action,
            },
        );
        Ok(())
    }

    pub fn unregister(&mut self, command: &CommandId) -> Result<(), RegistryError> {
        match self.entries.remove(command) {
            Some(entry) => {
                log::trace!(
                    target: "runtime.registry",
                    "unregister {command} ({} on {})",
                    entry.event,
                    entry.node
                );
                Ok(())
            }
            None => Err(RegistryError::Missing(command.clone())),
        }
    }

    /// Mirror the handler patches of an applied batch, then point every surviving entry at the
    /// action held by `tree`.
    pub fn sync(
        &mut self,
        patches: &[Patch],
        tree: &Node<M>,
        strict: bool,
    ) -> Result<(), RegistryError>
    where
        M: Clone,
    {
        let mut live = collect_handlers(tree);
        for patch in patches {
            match patch {
                Patch::RemoveHandler { command, .. } => match self.unregister(command) {
                    Ok(()) => {}
                    Err(err) if strict => return Err(err),
                    Err(err) => log::warn!(target: "runtime.registry", "{err}"),
                },
                Patch::AddHandler {
                    node,
                    event,
                    command,
                    ..
                } => {
                    let handler = live
                        .get(command)
                        .ok_or_else(|| RegistryError::NotInTree(command.clone()))?;
                    self.register(
                        command.clone(),
                        node.clone(),
                        Arc::clone(event),
                        handler.action.clone(),
                    )?;
                }
                _ => {}
            }
        }

        for (command, entry) in self.entries.iter_mut() {
            if let Some(handler) = live.remove(command) {
                entry.action = handler.action.clone();
            }
        }
        debug_assert_eq!(
            self.entries.len(),
            collect_handlers(tree).len(),
            "registry out of step with the tree"
        );
        Ok(())
    }

    /// Message for a DOM event on `command`. `Ok(None)` when the decoder chose to ignore it.
    pub fn resolve(
        &self,
        command: &CommandId,
        payload: Option<&str>,
    ) -> Result<Option<M>, DispatchError>
    where
        M: Clone,
    {
        let entry = self
            .entries
            .get(command)
            .ok_or_else(|| DispatchError::NotFound(command.clone()))?;
        match &entry.action {
            HandlerAction::Message(message) => Ok(Some(message.clone())),
            HandlerAction::Decode {
                payload: expected,
                decoder,
            } => {
                let invalid = |source| DispatchError::InvalidPayload {
                    command: command.clone(),
                    source,
                };
                let value = match (expected, payload) {
                    (PayloadKind::None, None) => Value::Null,
                    (_, Some(raw)) => serde_json::from_str(raw).map_err(invalid)?,
                    (expected, None) => {
                        return Err(DispatchError::MissingPayload {
                            command: command.clone(),
                            expected: *expected,
                        });
                    }
                };
                decoder.decode(&value).map_err(invalid)
            }
        }
    }

    pub fn contains(&self, command: &CommandId) -> bool {
        self.entries.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<M> Default for HandlerRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
