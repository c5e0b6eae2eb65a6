//! Identity alignment of a freshly rendered tree against the previous one.
//!
//! `view` rebuilds the whole tree every cycle with newly minted ids. Before diffing, every node,
//! plain attribute and handler of `next` that sits at the same logical position as something in
//! `previous` takes over that thing's identity:
//! - roots match when they have the same shape (kind, and tag for elements);
//! - keyed children match the previous sibling with the same key and shape;
//! - unkeyed children match the unkeyed previous child at the same index with the same shape;
//! - plain attributes match by name, handlers by event name;
//! - a previous node or attribute is claimed at most once.
//!
//! Anything unmatched keeps its fresh identity, which the diff engine turns into a
//! remove + insert. Alignment never fails.

use crate::types::{Attribute, DOM_ID_ATTRIBUTE, Node};
use core_types::NodeId;
use std::collections::HashMap;

pub fn align<M>(previous: Option<&Node<M>>, next: Node<M>) -> Node<M> {
    match previous {
        Some(prev) if prev.same_shape(&next) => align_matched(prev, next),
        Some(prev) => {
            log::trace!(
                target: "vdom.align",
                "root shape changed ({:?} -> {:?}), keeping fresh identity",
                prev.tag(),
                next.tag()
            );
            next
        }
        None => next,
    }
}

fn align_matched<M>(prev: &Node<M>, next: Node<M>) -> Node<M> {
    match (prev, next) {
        (Node::Text { id, .. }, Node::Text { value, .. }) => Node::Text {
            id: id.clone(),
            value,
        },
        (
            Node::Element {
                id: prev_id,
                attributes: prev_attributes,
                children: prev_children,
                ..
            },
            Node::Element {
                id: fresh_id,
                tag,
                attributes,
                children,
            },
        ) => Node::Element {
            id: prev_id.clone(),
            tag,
            attributes: align_attributes(prev_attributes, attributes, &fresh_id, prev_id),
            children: align_children(prev_children, children),
        },
        (_, next) => next,
    }
}

fn align_attributes<M>(
    prev: &[Attribute<M>],
    next: Vec<Attribute<M>>,
    fresh_id: &NodeId,
    aligned_id: &NodeId,
) -> Vec<Attribute<M>> {
    let mut claimed = vec![false; prev.len()];
    next.into_iter()
        .map(|attribute| match attribute {
            Attribute::Plain { id, name, value } => {
                let matched = claim(prev, &mut claimed, |candidate| match candidate {
                    Attribute::Plain { name: prev_name, .. } => *prev_name == name,
                    Attribute::Handler(_) => false,
                });
                let id = match matched {
                    Some(Attribute::Plain { id: prev_id, .. }) => prev_id.clone(),
                    _ => id,
                };
                let value = if &*name == DOM_ID_ATTRIBUTE && value == fresh_id.as_str() {
                    aligned_id.as_str().to_owned()
                } else {
                    value
                };
                Attribute::Plain { id, name, value }
            }
            Attribute::Handler(mut handler) => {
                let matched = claim(prev, &mut claimed, |candidate| match candidate {
                    Attribute::Handler(prev_handler) => prev_handler.event == handler.event,
                    Attribute::Plain { .. } => false,
                });
                if let Some(Attribute::Handler(prev_handler)) = matched {
                    handler.command = prev_handler.command.clone();
                }
                Attribute::Handler(handler)
            }
        })
        .collect()
}

fn claim<'a, M>(
    prev: &'a [Attribute<M>],
    claimed: &mut [bool],
    mut matches: impl FnMut(&Attribute<M>) -> bool,
) -> Option<&'a Attribute<M>> {
    let index = prev
        .iter()
        .enumerate()
        .position(|(i, candidate)| !claimed[i] && matches(candidate))?;
    claimed[index] = true;
    Some(&prev[index])
}

fn align_children<M>(prev: &[Node<M>], next: Vec<Node<M>>) -> Vec<Node<M>> {
    if prev.is_empty() {
        return next;
    }

    let mut keyed: HashMap<&str, usize> = HashMap::new();
    for (i, child) in prev.iter().enumerate() {
        if let Some(key) = child.key() {
            keyed.entry(key).or_insert(i);
        }
    }
    let mut claimed = vec![false; prev.len()];

    next.into_iter()
        .enumerate()
        .map(|(i, child)| {
            let candidate = match child.key() {
                Some(key) => keyed.get(key).copied(),
                None => prev.get(i).filter(|p| p.key().is_none()).map(|_| i),
            };
            match candidate {
                Some(j) if !claimed[j] && prev[j].same_shape(&child) => {
                    claimed[j] = true;
                    align_matched(&prev[j], child)
                }
                _ => child,
            }
        })
        .collect()
}
