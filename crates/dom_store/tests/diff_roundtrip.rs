//! Applying `diff(a, b)` to a document showing `a` must yield `b`.

use core_types::RenderVersion;
use dom_store::DomStore;
use std::path::Path;
use vdom::walk::collect_handlers;
use vdom::{Node, PatchNode, align, diff, diff_from_empty};
use vdom_test_support::load_scenarios;

fn normalized(node: PatchNode) -> PatchNode {
    match node {
        PatchNode::Element {
            id,
            tag,
            mut attributes,
            children,
        } => {
            attributes.sort_by(|a, b| a.name.cmp(&b.name));
            PatchNode::Element {
                id,
                tag,
                attributes,
                children: children.into_iter().map(normalized).collect(),
            }
        }
        text => text,
    }
}

struct Mirror {
    store: DomStore,
    version: RenderVersion,
}

impl Mirror {
    fn mount<M>(tree: &Node<M>) -> Self {
        let mut mirror = Mirror {
            store: DomStore::new(),
            version: RenderVersion::INITIAL,
        };
        mirror.ship(&diff_from_empty(tree));
        mirror
    }

    fn ship(&mut self, patches: &[vdom::Patch]) {
        self.version = self.version.next();
        self.store
            .apply_batch(self.version, &wire::encode(patches))
            .unwrap();
    }

    fn assert_shows<M>(&self, tree: &Node<M>) {
        let shown = normalized(self.store.materialize().unwrap());
        assert_eq!(shown, normalized(PatchNode::from_node(tree)));
        assert_eq!(self.store.listener_count(), collect_handlers(tree).len());
        for command in collect_handlers(tree).keys() {
            assert!(self.store.is_bound(command), "{command} not bound");
        }
    }
}

#[test]
fn fixture_scenarios_converge() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../vdom/tests/fixtures/scenarios.toml");
    for scenario in load_scenarios(Path::new(path)).unwrap() {
        let before = scenario.before.build().unwrap();
        let after = align(Some(&before), scenario.after.build().unwrap());

        let mut mirror = Mirror::mount(&before);
        mirror.assert_shows(&before);
        mirror.ship(&diff(&before, &after));
        mirror.assert_shows(&after);
    }
}

fn row(key: &str, label: &str, done: bool) -> Node<&'static str> {
    let mut li = Node::element("li")
        .with_key(key)
        .child(Node::text(label.to_string()))
        .on("click", "toggle");
    if done {
        li = li.attr("class", "done");
    }
    li
}

#[test]
fn successive_renders_converge() {
    let frames: Vec<Vec<(&str, &str, bool)>> = vec![
        vec![("a", "Alpha", false), ("b", "Beta", false), ("c", "Gamma", false)],
        vec![("c", "Gamma", true), ("a", "Alpha", false), ("b", "Beta!", false)],
        vec![("d", "Delta", false), ("b", "Beta!", true)],
        vec![],
        vec![("e", "Epsilon", false), ("a", "Alpha", true)],
    ];

    let render = |rows: &[(&str, &str, bool)]| {
        Node::element("ul")
            .attr("class", "todos")
            .with_children(rows.iter().map(|(k, l, d)| row(k, l, *d)))
    };

    let mut previous = render(&frames[0]);
    let mut mirror = Mirror::mount(&previous);
    mirror.assert_shows(&previous);

    for rows in &frames[1..] {
        let next = align(Some(&previous), render(rows));
        mirror.ship(&diff(&previous, &next));
        mirror.assert_shows(&next);
        previous = next;
    }
    assert_eq!(mirror.store.batches_applied(), frames.len());
}

#[test]
fn root_replacement_swaps_the_mounted_document() {
    let before: Node<()> = Node::element("div").child(Node::text("old"));
    let after = align(Some(&before), Node::element("section").child(Node::text("new")));

    let mut mirror = Mirror::mount(&before);
    mirror.ship(&diff(&before, &after));
    mirror.assert_shows(&after);
    assert_eq!(mirror.store.root(), Some(after.id()));
    assert_eq!(mirror.store.text_content(after.id()).unwrap(), "new");
}
