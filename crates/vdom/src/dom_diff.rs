//! Keyed tree diffing to ordered patch lists.
//!
//! Contract:
//! - Both trees are expected to be aligned (see `align`): a node in `next` that is the same
//!   logical node as one in `previous` carries the same id. Ids are the diffing keys; positional
//!   matching of unkeyed children is already encoded by the aligner.
//! - Two nodes match when they have the same id and the same shape. Matching elements are
//!   patched in place; matching texts get `SetText` when the value changed.
//! - Children are reconciled by skipping matching heads and tails, then running a longest
//!   increasing subsequence over the middle span so the fewest children move.
//! - A child list that becomes empty is cleared with one `ClearChildren`.
//! - Attributes are compared by name. Every set (create-or-update) is emitted before any
//!   remove on the same node, and a preserved attribute is never removed and re-added.
//! - Handlers are compared by (command, event, payload kind); removals come first so a command
//!   id is never registered twice while one of its bindings is replaced.
//! - Subtrees leaving the document emit `RemoveHandler` for every handler they hold before the
//!   structural patch; inserted subtrees emit `AddHandler` after it.
//!
//! Complexity: O(n) for unchanged or edge-modified child lists, O(m log m) for a reordered
//! middle span of m children.

use crate::dom_patch::{Patch, PatchNode};
use crate::lis::longest_increasing_subsequence;
use crate::types::{Attribute, Handler, Node};
use core_types::{AttrId, NodeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Patches turning `previous` into `next`; the roots live in the host container.
pub fn diff<M>(previous: &Node<M>, next: &Node<M>) -> Vec<Patch> {
    let mut patches = Vec::new();
    diff_node(&NodeId::host_root(), previous, next, &mut patches);
    log::trace!(target: "vdom.diff", "diff produced {} patches", patches.len());
    patches
}

/// Patches mounting `next` into an empty host container.
pub fn diff_from_empty<M>(next: &Node<M>) -> Vec<Patch> {
    let mut patches = Vec::new();
    emit_insert(&NodeId::host_root(), None, next, &mut patches);
    patches
}

pub fn diff_optional<M>(previous: Option<&Node<M>>, next: &Node<M>) -> Vec<Patch> {
    match previous {
        Some(previous) => diff(previous, next),
        None => diff_from_empty(next),
    }
}

fn is_match<M>(a: &Node<M>, b: &Node<M>) -> bool {
    a.id() == b.id() && a.same_shape(b)
}

fn diff_node<M>(parent: &NodeId, prev: &Node<M>, next: &Node<M>, out: &mut Vec<Patch>) {
    if !is_match(prev, next) {
        replace(parent, prev, next, out);
        return;
    }
    match (prev, next) {
        (Node::Text { value: old, .. }, Node::Text { id, value }) => {
            if old != value {
                out.push(Patch::SetText {
                    node: id.clone(),
                    value: value.clone(),
                });
            }
        }
        (
            Node::Element {
                attributes: prev_attributes,
                children: prev_children,
                ..
            },
            Node::Element {
                id,
                attributes,
                children,
                ..
            },
        ) => {
            diff_attributes(id, prev_attributes, attributes, out);
            diff_handlers(id, prev, next, out);
            diff_children(id, prev_children, children, out);
        }
        _ => replace(parent, prev, next, out),
    }
}

/// Only reachable for roots: matched children are never replaced in place.
fn replace<M>(parent: &NodeId, prev: &Node<M>, next: &Node<M>, out: &mut Vec<Patch>) {
    emit_remove(parent, prev, out);
    emit_insert(parent, None, next, out);
}

/// Last occurrence wins, as it would when the host sets attributes in order.
fn effective_plain<M>(attributes: &[Attribute<M>]) -> Vec<(&AttrId, &Arc<str>, &str)> {
    let mut seen = HashSet::new();
    let mut out: Vec<_> = attributes
        .iter()
        .rev()
        .filter_map(|attr| match attr {
            Attribute::Plain { id, name, value } => Some((id, name, value.as_str())),
            Attribute::Handler(_) => None,
        })
        .filter(|(_, name, _)| seen.insert(Arc::clone(name)))
        .collect();
    out.reverse();
    out
}

fn diff_attributes<M>(
    node: &NodeId,
    prev: &[Attribute<M>],
    next: &[Attribute<M>],
    out: &mut Vec<Patch>,
) {
    let prev_plain = effective_plain(prev);
    let next_plain = effective_plain(next);
    let prev_values: HashMap<&str, &str> = prev_plain
        .iter()
        .map(|(_, name, value)| (&***name, *value))
        .collect();
    let next_names: HashSet<&str> = next_plain.iter().map(|(_, name, _)| &***name).collect();

    for (id, name, value) in &next_plain {
        if prev_values.get(&***name) != Some(value) {
            out.push(Patch::SetAttribute {
                node: node.clone(),
                attr: (*id).clone(),
                name: Arc::clone(name),
                value: (*value).to_owned(),
            });
        }
    }
    for (id, name, _) in &prev_plain {
        if !next_names.contains(&***name) {
            out.push(Patch::RemoveAttribute {
                node: node.clone(),
                attr: (*id).clone(),
                name: Arc::clone(name),
            });
        }
    }
}

fn handler_signature<M>(handler: &Handler<M>) -> (&str, &str, u8) {
    (
        handler.command.as_str(),
        &*handler.event,
        handler.action.payload_kind() as u8,
    )
}

fn diff_handlers<M>(node: &NodeId, prev: &Node<M>, next: &Node<M>, out: &mut Vec<Patch>) {
    let prev_set: HashSet<_> = prev.handlers().map(handler_signature).collect();
    let next_set: HashSet<_> = next.handlers().map(handler_signature).collect();

    for handler in prev.handlers() {
        if !next_set.contains(&handler_signature(handler)) {
            out.push(remove_handler_patch(node, handler));
        }
    }
    for handler in next.handlers() {
        if !prev_set.contains(&handler_signature(handler)) {
            out.push(add_handler_patch(node, handler));
        }
    }
}

fn diff_children<M>(parent: &NodeId, prev: &[Node<M>], next: &[Node<M>], out: &mut Vec<Patch>) {
    if next.is_empty() {
        if !prev.is_empty() {
            for child in prev {
                emit_remove_handlers(child, out);
            }
            out.push(Patch::ClearChildren {
                parent: parent.clone(),
            });
        }
        return;
    }
    if prev.is_empty() {
        for child in next {
            emit_insert(parent, None, child, out);
        }
        return;
    }

    let mut start = 0;
    let mut prev_end = prev.len();
    let mut next_end = next.len();

    while start < prev_end && start < next_end && is_match(&prev[start], &next[start]) {
        diff_node(parent, &prev[start], &next[start], out);
        start += 1;
    }
    while prev_end > start
        && next_end > start
        && is_match(&prev[prev_end - 1], &next[next_end - 1])
    {
        diff_node(parent, &prev[prev_end - 1], &next[next_end - 1], out);
        prev_end -= 1;
        next_end -= 1;
    }

    // First node after the middle span; everything in the span goes before it.
    let tail_anchor = next.get(next_end).map(|n| n.id().clone());

    if start == prev_end {
        for child in &next[start..next_end] {
            emit_insert(parent, tail_anchor.clone(), child, out);
        }
        return;
    }
    if start == next_end {
        for child in &prev[start..prev_end] {
            emit_remove(parent, child, out);
        }
        return;
    }

    diff_middle(
        parent,
        &prev[start..prev_end],
        &next[start..next_end],
        tail_anchor,
        out,
    );
}

fn diff_middle<M>(
    parent: &NodeId,
    prev: &[Node<M>],
    next: &[Node<M>],
    tail_anchor: Option<NodeId>,
    out: &mut Vec<Patch>,
) {
    let positions: HashMap<&NodeId, usize> = prev
        .iter()
        .enumerate()
        .map(|(i, child)| (child.id(), i))
        .collect();

    let mut claimed = vec![false; prev.len()];
    let sources: Vec<Option<usize>> = next
        .iter()
        .map(|child| {
            let source = positions
                .get(child.id())
                .copied()
                .filter(|&j| !claimed[j] && prev[j].same_shape(child))?;
            claimed[source] = true;
            Some(source)
        })
        .collect();

    for (j, child) in prev.iter().enumerate() {
        if !claimed[j] {
            emit_remove(parent, child, out);
        }
    }
    for (k, child) in next.iter().enumerate() {
        if let Some(j) = sources[k] {
            diff_node(parent, &prev[j], child, out);
        }
    }

    let matched: Vec<(usize, usize)> = sources
        .iter()
        .enumerate()
        .filter_map(|(k, source)| source.map(|j| (k, j)))
        .collect();
    let previous_order: Vec<usize> = matched.iter().map(|&(_, j)| j).collect();
    let mut stable = vec![false; next.len()];
    for i in longest_increasing_subsequence(&previous_order) {
        stable[matched[i].0] = true;
    }
    log::trace!(
        target: "vdom.diff",
        "middle span: {} previous, {} next, {} matched, {} stay in place",
        prev.len(),
        next.len(),
        matched.len(),
        stable.iter().filter(|s| **s).count()
    );

    let mut before = tail_anchor;
    for k in (0..next.len()).rev() {
        let child = &next[k];
        match sources[k] {
            None => emit_insert(parent, before.clone(), child, out),
            Some(_) if !stable[k] => out.push(Patch::MoveChild {
                parent: parent.clone(),
                child: child.id().clone(),
                before: before.clone(),
            }),
            Some(_) => {}
        }
        before = Some(child.id().clone());
    }
}

fn emit_insert<M>(parent: &NodeId, before: Option<NodeId>, node: &Node<M>, out: &mut Vec<Patch>) {
    out.push(Patch::InsertBefore {
        parent: parent.clone(),
        before,
        node: PatchNode::from_node(node),
    });
    emit_add_handlers(node, out);
}

fn emit_remove<M>(parent: &NodeId, node: &Node<M>, out: &mut Vec<Patch>) {
    emit_remove_handlers(node, out);
    out.push(Patch::RemoveChild {
        parent: parent.clone(),
        child: node.id().clone(),
    });
}

fn emit_add_handlers<M>(node: &Node<M>, out: &mut Vec<Patch>) {
    for handler in node.handlers() {
        out.push(add_handler_patch(node.id(), handler));
    }
    for child in node.children() {
        emit_add_handlers(child, out);
    }
}

fn emit_remove_handlers<M>(node: &Node<M>, out: &mut Vec<Patch>) {
    for handler in node.handlers() {
        out.push(remove_handler_patch(node.id(), handler));
    }
    for child in node.children() {
        emit_remove_handlers(child, out);
    }
}

fn add_handler_patch<M>(node: &NodeId, handler: &Handler<M>) -> Patch {
    Patch::AddHandler {
        node: node.clone(),
        event: Arc::clone(&handler.event),
        command: handler.command.clone(),
        payload: handler.action.payload_kind(),
    }
}

fn remove_handler_patch<M>(node: &NodeId, handler: &Handler<M>) -> Patch {
    Patch::RemoveHandler {
        node: node.clone(),
        event: Arc::clone(&handler.event),
        command: handler.command.clone(),
    }
}
