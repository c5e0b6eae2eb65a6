use crate::types::{Handler, Node};
use core_types::{CommandId, NodeId};
use std::collections::HashMap;

pub fn find_node_by_id<'a, M>(node: &'a Node<M>, id: &NodeId) -> Option<&'a Node<M>> {
    if node.id() == id {
        return Some(node);
    }
    node.children()
        .iter()
        .find_map(|child| find_node_by_id(child, id))
}

/// Every handler in the tree, keyed by command id.
pub fn collect_handlers<M>(root: &Node<M>) -> HashMap<CommandId, &Handler<M>> {
    fn walk<'a, M>(node: &'a Node<M>, out: &mut HashMap<CommandId, &'a Handler<M>>) {
        for handler in node.handlers() {
            out.insert(handler.command.clone(), handler);
        }
        for child in node.children() {
            walk(child, out);
        }
    }

    let mut out = HashMap::new();
    walk(root, &mut out);
    out
}

pub fn count_nodes<M>(root: &Node<M>) -> usize {
    1 + root.children().iter().map(count_nodes).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_nodes_and_handlers() {
        let leaf: Node<u8> = Node::element("button").on("click", 1);
        let leaf_id = leaf.id().clone();
        let command = leaf.handlers().next().map(|h| h.command.clone()).unwrap();
        let tree = Node::element("div")
            .on("focus", 2)
            .child(Node::element("p").child(leaf));

        assert_eq!(find_node_by_id(&tree, &leaf_id).and_then(Node::tag), Some("button"));
        assert!(find_node_by_id(&tree, &NodeId::from("missing")).is_none());

        let handlers = collect_handlers(&tree);
        assert_eq!(handlers.len(), 2);
        assert_eq!(&*handlers[&command].event, "click");
        assert_eq!(count_nodes(&tree), 3);
    }
}
