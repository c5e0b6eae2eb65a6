use vdom::{Node, Opcode, align, diff, diff_from_empty};

fn list(keys: &[&str]) -> Node<u32> {
    Node::element("ul").with_children(keys.iter().enumerate().map(|(i, k)| {
        Node::element("li")
            .with_key(*k)
            .on("click", i as u32)
            .child(Node::text(*k))
    }))
}

#[test]
fn diff_batches_survive_the_wire() {
    let first = list(&["a", "b", "c", "d"]);
    let second = align(Some(&first), list(&["d", "b", "e", "a"]));

    for patches in [diff_from_empty(&first), diff(&first, &second)] {
        let bytes = wire::encode(&patches);
        assert_eq!(wire::decode(&bytes).unwrap(), patches);
    }
}

#[test]
fn keyed_reorder_is_smaller_than_a_rebuild() {
    let first = list(&["a", "b", "c", "d", "e", "f"]);
    let second = align(Some(&first), list(&["f", "a", "b", "c", "d", "e"]));

    let patches = diff(&first, &second);
    assert!(patches.iter().all(|p| p.opcode() == Opcode::MoveChild));

    let (moved, _) = wire::encode_with_stats(&patches);
    let (rebuilt, _) = wire::encode_with_stats(&diff_from_empty(&second));
    assert!(moved.len() < rebuilt.len());
}
