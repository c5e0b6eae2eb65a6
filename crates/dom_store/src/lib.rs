//! Headless patch executor.
//!
//! `DomStore` plays the host side of the patch protocol without a browser: it decodes a batch,
//! applies it to an arena document in order and keeps the per-node handler bindings a real
//! executor would attach as DOM listeners. Tests and the demo binary use it to observe what a
//! host would render and to fire events back into the runtime.

use core_types::{CommandId, NodeId, RenderVersion};
use std::collections::HashMap;
use std::sync::Arc;
use vdom::{Patch, PatchAttr, PatchNode, PayloadKind};

mod error;

pub use crate::error::StoreError;

const HOST_TAG: &str = "#host";

/// Listener attached to a node. A node may carry several for the same event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub event: Arc<str>,
    pub command: CommandId,
    pub payload: PayloadKind,
}

pub struct DomStore {
    document: Document,
    version: RenderVersion,
    batches: usize,
}

/// Everything a batch can change.
#[derive(Clone)]
struct Document {
    nodes: HashMap<NodeId, NodeRecord>,
    listeners: HashMap<NodeId, Vec<Binding>>,
    commands: HashMap<CommandId, NodeId>,
    title: String,
}

impl DomStore {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeId::host_root(),
            NodeRecord {
                kind: NodeKind::Element {
                    tag: Arc::from(HOST_TAG),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            document: Document {
                nodes,
                listeners: HashMap::new(),
                commands: HashMap::new(),
                title: String::new(),
            },
            version: RenderVersion::INITIAL,
            batches: 0,
        }
    }

    /// Decode and apply one encoded batch, tagged with the render version it produces.
    ///
    /// A batch applies entirely or not at all: on any error the store keeps the document and
    /// version it had before the call.
    pub fn apply_batch(
        &mut self,
        version: RenderVersion,
        bytes: &[u8],
    ) -> Result<usize, StoreError> {
        let expected = self.version.next();
        if version != expected {
            return Err(StoreError::VersionMismatch {
                expected,
                got: version,
            });
        }
        let patches = wire::decode(bytes)?;
        self.apply(&patches)?;
        self.version = version;
        self.batches += 1;
        log::debug!(
            target: "dom_store",
            "applied {} patches ({} bytes) at {}",
            patches.len(),
            bytes.len(),
            version
        );
        Ok(patches.len())
    }

    /// Apply already-decoded patches in order, all or nothing.
    pub fn apply(&mut self, patches: &[Patch]) -> Result<(), StoreError> {
        let mut staged = self.document.clone();
        for (index, patch) in patches.iter().enumerate() {
            log::trace!(target: "dom_store", "{patch:?}");
            if let Err(err) = staged.apply_one(patch) {
                log::debug!(
                    target: "dom_store",
                    "patch {index} of {} failed, batch discarded: {err}",
                    patches.len()
                );
                return Err(err);
            }
        }
        self.document = staged;
        Ok(())
    }

    // -- Queries ---

    pub fn version(&self) -> RenderVersion {
        self.version
    }

    pub fn title(&self) -> &str {
        &self.document.title
    }

    pub fn batches_applied(&self) -> usize {
        self.batches
    }

    /// Number of live nodes, the host container excluded.
    pub fn len(&self) -> usize {
        self.document.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.document.nodes.contains_key(id)
    }

    /// The document root mounted in the host container.
    pub fn root(&self) -> Option<&NodeId> {
        self.document
            .nodes
            .get(&NodeId::host_root())
            .and_then(|host| host.children.first())
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.document
            .nodes
            .get(id)
            .and_then(|record| record.parent.as_ref())
    }

    /// First listener, in attach order, a DOM `event` on `node` would trigger.
    pub fn binding(&self, node: &NodeId, event: &str) -> Option<&Binding> {
        self.bindings(node, event).next()
    }

    /// Every listener a DOM `event` on `node` would trigger, in attach order.
    pub fn bindings<'a>(
        &'a self,
        node: &NodeId,
        event: &str,
    ) -> impl Iterator<Item = &'a Binding> {
        self.document
            .listeners
            .get(node)
            .into_iter()
            .flatten()
            .filter(move |binding| &*binding.event == event)
    }

    pub fn listener_count(&self) -> usize {
        self.document.commands.len()
    }

    pub fn is_bound(&self, command: &CommandId) -> bool {
        self.document.commands.contains_key(command)
    }

    /// First element, in document order, whose attribute `name` equals `value`.
    pub fn find_element(&self, name: &str, value: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.root().into_iter().cloned().collect();
        while let Some(id) = stack.pop() {
            let record = self.document.nodes.get(&id)?;
            if let NodeKind::Element { attributes, .. } = &record.kind {
                if attributes
                    .iter()
                    .any(|a| &*a.name == name && a.value == value)
                {
                    return Some(id);
                }
            }
            stack.extend(record.children.iter().rev().cloned());
        }
        None
    }

    /// Concatenated text of `id`'s subtree.
    pub fn text_content(&self, id: &NodeId) -> Result<String, StoreError> {
        let mut out = String::new();
        self.collect_text(id, &mut out)?;
        Ok(out)
    }

    fn collect_text(&self, id: &NodeId, out: &mut String) -> Result<(), StoreError> {
        let record = self.document.record(id)?;
        match &record.kind {
            NodeKind::Text { value } => out.push_str(value),
            NodeKind::Element { .. } => {
                for child in &record.children {
                    self.collect_text(child, out)?;
                }
            }
        }
        Ok(())
    }

    /// Rebuild the mounted document as a tree.
    pub fn materialize(&self) -> Result<PatchNode, StoreError> {
        let root = self.root().ok_or(StoreError::MissingRoot)?;
        self.materialize_node(root)
    }

    pub fn materialize_node(&self, id: &NodeId) -> Result<PatchNode, StoreError> {
        let record = self.document.record(id)?;
        Ok(match &record.kind {
            NodeKind::Element { tag, attributes } => PatchNode::Element {
                id: id.clone(),
                tag: Arc::clone(tag),
                attributes: attributes.clone(),
                children: record
                    .children
                    .iter()
                    .map(|child| self.materialize_node(child))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            NodeKind::Text { value } => PatchNode::Text {
                id: id.clone(),
                value: value.clone(),
            },
        })
    }
}

impl Default for DomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    fn apply_one(&mut self, patch: &Patch) -> Result<(), StoreError> {
        match patch {
            Patch::SetAttribute {
                node,
                attr,
                name,
                value,
            } => {
                let attributes = self.attributes_mut(node)?;
                match attributes.iter_mut().find(|a| a.name == *name) {
                    Some(existing) => {
                        existing.id = attr.clone();
                        existing.value.clone_from(value);
                    }
                    None => attributes.push(PatchAttr {
                        id: attr.clone(),
                        name: Arc::clone(name),
                        value: value.clone(),
                    }),
                }
            }
            Patch::RemoveAttribute { node, name, .. } => {
                let attributes = self.attributes_mut(node)?;
                let before = attributes.len();
                attributes.retain(|a| a.name != *name);
                if attributes.len() == before {
                    return Err(StoreError::MissingAttribute {
                        node: node.clone(),
                        name: name.to_string(),
                    });
                }
            }
            Patch::InsertBefore {
                parent,
                before,
                node,
            } => {
                self.ensure_container(parent)?;
                let position = match before {
                    Some(before) => Some(self.child_position(parent, before)?),
                    None => None,
                };
                self.insert_subtree(parent, node)?;
                let siblings = &mut self.record_mut(parent)?.children;
                match position {
                    Some(i) => siblings.insert(i, node.id().clone()),
                    None => siblings.push(node.id().clone()),
                }
            }
            Patch::RemoveChild { parent, child } => {
                let position = self.child_position(parent, child)?;
                self.record_mut(parent)?.children.remove(position);
                self.remove_subtree(child);
            }
            Patch::MoveChild {
                parent,
                child,
                before,
            } => {
                if before.as_ref() == Some(child) {
                    return Err(StoreError::InvalidSibling {
                        parent: parent.clone(),
                        before: child.clone(),
                    });
                }
                let from = self.child_position(parent, child)?;
                self.record_mut(parent)?.children.remove(from);
                let to = match before {
                    Some(before) => self.child_position(parent, before)?,
                    None => self.record(parent)?.children.len(),
                };
                self.record_mut(parent)?.children.insert(to, child.clone());
            }
            Patch::SetText { node, value } => match &mut self.record_mut(node)?.kind {
                NodeKind::Text { value: existing } => existing.clone_from(value),
                NodeKind::Element { .. } => return Err(StoreError::WrongNodeKind(node.clone())),
            },
            Patch::ClearChildren { parent } => {
                self.ensure_container(parent)?;
                let children = std::mem::take(&mut self.record_mut(parent)?.children);
                for child in &children {
                    self.remove_subtree(child);
                }
            }
            Patch::AddHandler {
                node,
                event,
                command,
                payload,
            } => {
                self.ensure_container(node)?;
                if self.commands.contains_key(command) {
                    return Err(StoreError::DuplicateCommand(command.clone()));
                }
                self.commands.insert(command.clone(), node.clone());
                self.listeners.entry(node.clone()).or_default().push(Binding {
                    event: Arc::clone(event),
                    command: command.clone(),
                    payload: *payload,
                });
            }
            Patch::RemoveHandler {
                node,
                event,
                command,
            } => {
                let attached = self.listeners.get_mut(node).and_then(|bindings| {
                    bindings
                        .iter()
                        .position(|b| b.command == *command && b.event == *event)
                        .map(|i| bindings.remove(i))
                });
                if attached.is_none() {
                    return Err(StoreError::MissingListener {
                        node: node.clone(),
                        event: event.to_string(),
                    });
                }
                self.commands.remove(command);
                if self.listeners.get(node).is_some_and(Vec::is_empty) {
                    self.listeners.remove(node);
                }
            }
            Patch::SetTitle { title } => self.title.clone_from(title),
        }
        Ok(())
    }

    fn insert_subtree(&mut self, parent: &NodeId, node: &PatchNode) -> Result<(), StoreError> {
        let id = node.id();
        if self.nodes.contains_key(id) {
            return Err(StoreError::DuplicateNode(id.clone()));
        }
        let kind = match node {
            PatchNode::Element {
                tag, attributes, ..
            } => NodeKind::Element {
                tag: Arc::clone(tag),
                attributes: attributes.clone(),
            },
            PatchNode::Text { value, .. } => NodeKind::Text {
                value: value.clone(),
            },
        };
        self.nodes.insert(
            id.clone(),
            NodeRecord {
                kind,
                parent: Some(parent.clone()),
                children: node.children().iter().map(|c| c.id().clone()).collect(),
            },
        );
        for child in node.children() {
            self.insert_subtree(id, child)?;
        }
        Ok(())
    }

    /// Drop `id` and its descendants. Listeners left on them are dropped too.
    fn remove_subtree(&mut self, id: &NodeId) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(record) = self.nodes.remove(&current) else {
                continue;
            };
            stack.extend(record.children);
            for binding in self.listeners.remove(&current).unwrap_or_default() {
                log::warn!(
                    target: "dom_store",
                    "listener {} on removed node {} was never unbound",
                    binding.event,
                    current
                );
                self.commands.remove(&binding.command);
            }
        }
    }

    fn record(&self, id: &NodeId) -> Result<&NodeRecord, StoreError> {
        self.nodes
            .get(id)
            .ok_or_else(|| StoreError::MissingNode(id.clone()))
    }

    fn record_mut(&mut self, id: &NodeId) -> Result<&mut NodeRecord, StoreError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingNode(id.clone()))
    }

    fn ensure_container(&self, id: &NodeId) -> Result<(), StoreError> {
        match self.record(id)?.kind {
            NodeKind::Element { .. } => Ok(()),
            NodeKind::Text { .. } => Err(StoreError::WrongNodeKind(id.clone())),
        }
    }

    fn attributes_mut(&mut self, id: &NodeId) -> Result<&mut Vec<PatchAttr>, StoreError> {
        match &mut self.record_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            NodeKind::Text { .. } => Err(StoreError::WrongNodeKind(id.clone())),
        }
    }

    fn child_position(&self, parent: &NodeId, child: &NodeId) -> Result<usize, StoreError> {
        self.record(parent)?
            .children
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| StoreError::NotAChild {
                parent: parent.clone(),
                child: child.clone(),
            })
    }
}

#[derive(Clone)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone)]
enum NodeKind {
    Element {
        tag: Arc<str>,
        attributes: Vec<PatchAttr>,
    },
    Text {
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::AttrId;

    fn text(id: &str, value: &str) -> PatchNode {
        PatchNode::Text {
            id: NodeId::from(id),
            value: value.to_string(),
        }
    }

    fn element(id: &str, tag: &str, children: Vec<PatchNode>) -> PatchNode {
        PatchNode::Element {
            id: NodeId::from(id),
            tag: Arc::from(tag),
            attributes: Vec::new(),
            children,
        }
    }

    fn mounted() -> DomStore {
        let mut store = DomStore::new();
        store
            .apply(&[Patch::InsertBefore {
                parent: NodeId::host_root(),
                before: None,
                node: element(
                    "ul",
                    "ul",
                    vec![
                        element("a", "li", vec![text("ta", "A")]),
                        element("b", "li", vec![text("tb", "B")]),
                        element("c", "li", vec![text("tc", "C")]),
                    ],
                ),
            }])
            .unwrap();
        store
    }

    fn order(store: &DomStore) -> String {
        store.text_content(&NodeId::from("ul")).unwrap()
    }

    #[test]
    fn insert_move_and_remove() {
        let mut store = mounted();
        assert_eq!(order(&store), "ABC");
        assert_eq!(store.len(), 7);
        assert_eq!(store.parent(&NodeId::from("a")), Some(&NodeId::from("ul")));

        store
            .apply(&[
                Patch::MoveChild {
                    parent: NodeId::from("ul"),
                    child: NodeId::from("c"),
                    before: Some(NodeId::from("a")),
                },
                Patch::InsertBefore {
                    parent: NodeId::from("ul"),
                    before: Some(NodeId::from("b")),
                    node: element("d", "li", vec![text("td", "D")]),
                },
                Patch::RemoveChild {
                    parent: NodeId::from("ul"),
                    child: NodeId::from("a"),
                },
            ])
            .unwrap();
        assert_eq!(order(&store), "CDB");
        assert!(!store.contains(&NodeId::from("ta")));
    }

    #[test]
    fn move_to_end() {
        let mut store = mounted();
        store
            .apply(&[Patch::MoveChild {
                parent: NodeId::from("ul"),
                child: NodeId::from("a"),
                before: None,
            }])
            .unwrap();
        assert_eq!(order(&store), "BCA");
    }

    #[test]
    fn set_attribute_updates_in_place() {
        let mut store = mounted();
        let set = |value: &str| Patch::SetAttribute {
            node: NodeId::from("a"),
            attr: AttrId::from("x1"),
            name: Arc::from("class"),
            value: value.to_string(),
        };
        store.apply(&[set("on"), set("off")]).unwrap();
        assert_eq!(store.find_element("class", "off"), Some(NodeId::from("a")));
        assert_eq!(store.find_element("class", "on"), None);

        store
            .apply(&[Patch::RemoveAttribute {
                node: NodeId::from("a"),
                attr: AttrId::from("x1"),
                name: Arc::from("class"),
            }])
            .unwrap();
        assert_eq!(store.find_element("class", "off"), None);
    }

    #[test]
    fn clear_children_drops_the_subtrees() {
        let mut store = mounted();
        store
            .apply(&[Patch::ClearChildren {
                parent: NodeId::from("ul"),
            }])
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(order(&store), "");
    }

    #[test]
    fn handler_bindings_follow_patches() {
        let mut store = mounted();
        let command = CommandId::from("c1");
        store
            .apply(&[Patch::AddHandler {
                node: NodeId::from("b"),
                event: Arc::from("click"),
                command: command.clone(),
                payload: PayloadKind::None,
            }])
            .unwrap();
        assert_eq!(
            store.binding(&NodeId::from("b"), "click").map(|b| &b.command),
            Some(&command)
        );

        let again = store.apply(&[Patch::AddHandler {
            node: NodeId::from("a"),
            event: Arc::from("click"),
            command: command.clone(),
            payload: PayloadKind::None,
        }]);
        assert!(matches!(again, Err(StoreError::DuplicateCommand(_))));

        store
            .apply(&[Patch::RemoveHandler {
                node: NodeId::from("b"),
                event: Arc::from("click"),
                command: command.clone(),
            }])
            .unwrap();
        assert!(!store.is_bound(&command));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn removing_a_node_drops_stale_listeners() {
        let mut store = mounted();
        store
            .apply(&[
                Patch::AddHandler {
                    node: NodeId::from("c"),
                    event: Arc::from("click"),
                    command: CommandId::from("c9"),
                    payload: PayloadKind::Pointer,
                },
                Patch::RemoveChild {
                    parent: NodeId::from("ul"),
                    child: NodeId::from("c"),
                },
            ])
            .unwrap();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn structural_errors() {
        let mut store = mounted();
        let err = store
            .apply(&[Patch::RemoveChild {
                parent: NodeId::from("a"),
                child: NodeId::from("b"),
            }])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAChild { .. }));

        let err = store
            .apply(&[Patch::SetText {
                node: NodeId::from("a"),
                value: "x".into(),
            }])
            .unwrap_err();
        assert!(matches!(err, StoreError::WrongNodeKind(_)));

        let err = store
            .apply(&[Patch::InsertBefore {
                parent: NodeId::from("ul"),
                before: None,
                node: text("ta", "dup"),
            }])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateNode(_)));
    }

    #[test]
    fn failed_batch_leaves_the_document_untouched() {
        let mut store = DomStore::new();
        store
            .apply(&[Patch::InsertBefore {
                parent: NodeId::host_root(),
                before: None,
                node: element("p", "p", vec![text("t", "old")]),
            }])
            .unwrap();
        let batch = wire::encode(&[
            Patch::SetText {
                node: NodeId::from("t"),
                value: "new".into(),
            },
            Patch::SetTitle {
                title: "changed".into(),
            },
            Patch::RemoveChild {
                parent: NodeId::from("p"),
                child: NodeId::from("missing"),
            },
        ]);

        let err = store.apply_batch(RenderVersion(1), &batch).unwrap_err();
        assert!(matches!(err, StoreError::NotAChild { .. }));
        assert_eq!(store.text_content(&NodeId::from("p")).unwrap(), "old");
        assert_eq!(store.title(), "");
        assert_eq!(store.version(), RenderVersion::INITIAL);
        assert_eq!(store.batches_applied(), 0);

        // The same version can be retried once the batch is fixed.
        let batch = wire::encode(&[Patch::SetText {
            node: NodeId::from("t"),
            value: "new".into(),
        }]);
        assert_eq!(store.apply_batch(RenderVersion(1), &batch).unwrap(), 1);
        assert_eq!(store.text_content(&NodeId::from("p")).unwrap(), "new");
    }

    #[test]
    fn failed_batch_keeps_listeners() {
        let mut store = mounted();
        let add = |node: &str, command: &str| Patch::AddHandler {
            node: NodeId::from(node),
            event: Arc::from("click"),
            command: CommandId::from(command),
            payload: PayloadKind::None,
        };
        store.apply(&[add("a", "c1")]).unwrap();
        let err = store
            .apply(&[
                Patch::RemoveHandler {
                    node: NodeId::from("a"),
                    event: Arc::from("click"),
                    command: CommandId::from("c1"),
                },
                add("b", "c2"),
                add("c", "c2"),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCommand(_)));
        assert!(store.is_bound(&CommandId::from("c1")));
        assert!(!store.is_bound(&CommandId::from("c2")));
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn one_node_can_listen_twice_to_an_event() {
        let mut store = mounted();
        let add = |command: &str| Patch::AddHandler {
            node: NodeId::from("a"),
            event: Arc::from("click"),
            command: CommandId::from(command),
            payload: PayloadKind::None,
        };
        store.apply(&[add("first"), add("second")]).unwrap();
        let node = NodeId::from("a");
        let commands: Vec<_> = store
            .bindings(&node, "click")
            .map(|b| b.command.as_str())
            .collect();
        assert_eq!(commands, ["first", "second"]);
        assert_eq!(
            store.binding(&node, "click").map(|b| &b.command),
            Some(&CommandId::from("first"))
        );

        store
            .apply(&[Patch::RemoveHandler {
                node: node.clone(),
                event: Arc::from("click"),
                command: CommandId::from("first"),
            }])
            .unwrap();
        assert_eq!(
            store.binding(&node, "click").map(|b| &b.command),
            Some(&CommandId::from("second"))
        );
        assert_eq!(store.listener_count(), 1);

        let err = store
            .apply(&[Patch::RemoveHandler {
                node: node.clone(),
                event: Arc::from("input"),
                command: CommandId::from("second"),
            }])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingListener { .. }));
    }

    #[test]
    fn batches_must_arrive_in_version_order() {
        let mut store = DomStore::new();
        let batch = wire::encode(&[Patch::SetTitle {
            title: "Hi".into(),
        }]);
        let err = store.apply_batch(RenderVersion(2), &batch).unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { .. }));

        assert_eq!(store.apply_batch(RenderVersion(1), &batch).unwrap(), 1);
        assert_eq!(store.title(), "Hi");
        assert_eq!(store.version(), RenderVersion(1));
        assert_eq!(store.batches_applied(), 1);
    }

    #[test]
    fn malformed_batches_touch_nothing() {
        let mut store = mounted();
        let err = store.apply_batch(RenderVersion(1), &[0, 99]).unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)));
        assert_eq!(store.version(), RenderVersion::INITIAL);
        assert_eq!(order(&store), "ABC");
    }
}
