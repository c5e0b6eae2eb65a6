//! Patch model shared by the diff engine, the wire codec and patch executors.
//!
//! Invariants:
//! - Patches are applied in order.
//! - Every id referenced by a patch is live at the time the patch is applied, except the ids
//!   introduced by the `InsertBefore` subtree itself.
//! - `before: None` means "append as last child".
//! - An attribute change on a live node is a single `SetAttribute` (create-or-update).
//! - Handlers never travel inside an inserted subtree; each one gets its own `AddHandler`
//!   after the insert, and its own `RemoveHandler` before the subtree goes away.
//! - Patches carry no messages: the handler registry, not the host, knows what a
//!   command produces.

use crate::types::{Attribute, Node, PayloadKind};
use core_types::{AttrId, CommandId, NodeId};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch {
    SetAttribute {
        node: NodeId,
        attr: AttrId,
        name: Arc<str>,
        value: String,
    },
    RemoveAttribute {
        node: NodeId,
        attr: AttrId,
        name: Arc<str>,
    },
    InsertBefore {
        parent: NodeId,
        before: Option<NodeId>,
        node: PatchNode,
    },
    /// Remove `child` and its subtree from `parent`.
    RemoveChild {
        parent: NodeId,
        child: NodeId,
    },
    /// Reposition an already-attached `child` of `parent`.
    MoveChild {
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    },
    SetText {
        node: NodeId,
        value: String,
    },
    /// Remove every child of `parent` in one step.
    ClearChildren {
        parent: NodeId,
    },
    AddHandler {
        node: NodeId,
        event: Arc<str>,
        command: CommandId,
        payload: PayloadKind,
    },
    RemoveHandler {
        node: NodeId,
        event: Arc<str>,
        command: CommandId,
    },
    /// Replace the document title.
    SetTitle {
        title: String,
    },
}

impl Patch {
    pub fn opcode(&self) -> Opcode {
        match self {
            Patch::SetAttribute { .. } => Opcode::SetAttribute,
            Patch::RemoveAttribute { .. } => Opcode::RemoveAttribute,
            Patch::InsertBefore { .. } => Opcode::InsertBefore,
            Patch::RemoveChild { .. } => Opcode::RemoveChild,
            Patch::MoveChild { .. } => Opcode::MoveChild,
            Patch::SetText { .. } => Opcode::SetText,
            Patch::ClearChildren { .. } => Opcode::ClearChildren,
            Patch::AddHandler { .. } => Opcode::AddHandler,
            Patch::RemoveHandler { .. } => Opcode::RemoveHandler,
            Patch::SetTitle { .. } => Opcode::SetTitle,
        }
    }
}

/// One-byte record tag of each patch kind on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Opcode {
    SetAttribute = 1,
    RemoveAttribute = 2,
    InsertBefore = 3,
    RemoveChild = 4,
    MoveChild = 5,
    SetText = 6,
    ClearChildren = 7,
    AddHandler = 8,
    RemoveHandler = 9,
    SetTitle = 10,
}

impl Opcode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Opcode::SetAttribute,
            2 => Opcode::RemoveAttribute,
            3 => Opcode::InsertBefore,
            4 => Opcode::RemoveChild,
            5 => Opcode::MoveChild,
            6 => Opcode::SetText,
            7 => Opcode::ClearChildren,
            8 => Opcode::AddHandler,
            9 => Opcode::RemoveHandler,
            10 => Opcode::SetTitle,
            _ => return None,
        })
    }
}

/// Message-free copy of a subtree, as carried by `InsertBefore`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchNode {
    Element {
        id: NodeId,
        tag: Arc<str>,
        attributes: Vec<PatchAttr>,
        children: Vec<PatchNode>,
    },
    Text {
        id: NodeId,
        value: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchAttr {
    pub id: AttrId,
    pub name: Arc<str>,
    pub value: String,
}

impl PatchNode {
    pub fn id(&self) -> &NodeId {
        match self {
            PatchNode::Element { id, .. } | PatchNode::Text { id, .. } => id,
        }
    }

    /// Strip handlers from `node`, keeping ids, plain attributes and structure.
    pub fn from_node<M>(node: &Node<M>) -> Self {
        match node {
            Node::Element {
                id,
                tag,
                attributes,
                children,
            } => PatchNode::Element {
                id: id.clone(),
                tag: Arc::clone(tag),
                attributes: attributes
                    .iter()
                    .filter_map(|attr| match attr {
                        Attribute::Plain { id, name, value } => Some(PatchAttr {
                            id: id.clone(),
                            name: Arc::clone(name),
                            value: value.clone(),
                        }),
                        Attribute::Handler(_) => None,
                    })
                    .collect(),
                children: children.iter().map(PatchNode::from_node).collect(),
            },
            Node::Text { id, value } => PatchNode::Text {
                id: id.clone(),
                value: value.clone(),
            },
        }
    }

    pub fn children(&self) -> &[PatchNode] {
        match self {
            PatchNode::Element { children, .. } => children,
            PatchNode::Text { .. } => &[],
        }
    }
}
