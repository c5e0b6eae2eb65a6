use crate::string_table::StringTable;
use crate::{NODE_ELEMENT, NODE_TEXT};
use tools::leb128;
use vdom::{Patch, PatchNode};

/// Size accounting for one encoded batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub patches: usize,
    /// Distinct strings in the header table.
    pub strings: usize,
    /// String operands written; `string_refs - strings` lookups were deduplicated.
    pub string_refs: usize,
    pub bytes: usize,
}

pub fn encode(patches: &[Patch]) -> Vec<u8> {
    encode_with_stats(patches).0
}

pub fn encode_with_stats(patches: &[Patch]) -> (Vec<u8>, BatchStats) {
    let mut writer = Writer {
        table: StringTable::new(),
        body: Vec::with_capacity(patches.len() * 8),
    };
    for patch in patches {
        writer.patch(patch);
    }

    let Writer { table, body } = writer;
    let mut out = Vec::with_capacity(body.len() + 64);
    table.write_header(&mut out);
    out.extend_from_slice(&body);

    let stats = BatchStats {
        patches: patches.len(),
        strings: table.len(),
        string_refs: table.lookups(),
        bytes: out.len(),
    };
    log::trace!(target: "wire", "encoded batch: {stats:?}");
    (out, stats)
}

struct Writer {
    table: StringTable,
    body: Vec<u8>,
}

impl Writer {
    fn patch(&mut self, patch: &Patch) {
        self.body.push(patch.opcode() as u8);
        match patch {
            Patch::SetAttribute {
                node,
                attr,
                name,
                value,
            } => {
                self.str(node.as_str());
                self.str(attr.as_str());
                self.str(name);
                self.str(value);
            }
            Patch::RemoveAttribute { node, attr, name } => {
                self.str(node.as_str());
                self.str(attr.as_str());
                self.str(name);
            }
            Patch::InsertBefore {
                parent,
                before,
                node,
            } => {
                self.str(parent.as_str());
                self.opt(before.as_ref().map(|id| id.as_str()));
                self.node(node);
            }
            Patch::RemoveChild { parent, child } => {
                self.str(parent.as_str());
                self.str(child.as_str());
            }
            Patch::MoveChild {
                parent,
                child,
                before,
            } => {
                self.str(parent.as_str());
                self.str(child.as_str());
                self.opt(before.as_ref().map(|id| id.as_str()));
            }
            Patch::SetText { node, value } => {
                self.str(node.as_str());
                self.str(value);
            }
            Patch::ClearChildren { parent } => {
                self.str(parent.as_str());
            }
            Patch::AddHandler {
                node,
                event,
                command,
                payload,
            } => {
                self.str(node.as_str());
                self.str(event);
                self.str(command.as_str());
                self.body.push(*payload as u8);
            }
            Patch::RemoveHandler {
                node,
                event,
                command,
            } => {
                self.str(node.as_str());
                self.str(event);
                self.str(command.as_str());
            }
            Patch::SetTitle { title } => {
                self.str(title);
            }
        }
    }

    fn node(&mut self, node: &PatchNode) {
        match node {
            PatchNode::Element {
                id,
                tag,
                attributes,
                children,
            } => {
                self.body.push(NODE_ELEMENT);
                self.str(id.as_str());
                self.str(tag);
                leb128::write_usize(&mut self.body, attributes.len());
                for attr in attributes {
                    self.str(attr.id.as_str());
                    self.str(&attr.name);
                    self.str(&attr.value);
                }
                leb128::write_usize(&mut self.body, children.len());
                for child in children {
                    self.node(child);
                }
            }
            PatchNode::Text { id, value } => {
                self.body.push(NODE_TEXT);
                self.str(id.as_str());
                self.str(value);
            }
        }
    }

    fn str(&mut self, s: &str) {
        let index = self.table.intern(s);
        leb128::write_usize(&mut self.body, index);
    }

    fn opt(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                let index = self.table.intern(s);
                leb128::write_usize(&mut self.body, index + 1);
            }
            None => self.body.push(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::NodeId;
    use std::sync::Arc;

    #[test]
    fn repeated_ids_are_stored_once() {
        let patches: Vec<Patch> = (0..5)
            .map(|i| Patch::SetText {
                node: NodeId::from("n7"),
                value: if i % 2 == 0 { "on" } else { "off" }.to_string(),
            })
            .collect();
        let (bytes, stats) = encode_with_stats(&patches);
        assert_eq!(stats.patches, 5);
        assert_eq!(stats.strings, 3);
        assert_eq!(stats.string_refs, 10);
        assert_eq!(stats.bytes, bytes.len());
    }

    #[test]
    fn record_layout() {
        let bytes = encode(&[Patch::RemoveChild {
            parent: NodeId::from("p"),
            child: NodeId::from("c"),
        }]);
        assert_eq!(bytes, vec![2, 1, b'p', 1, b'c', 4, 0, 1]);
    }

    #[test]
    fn missing_anchor_is_zero_and_present_anchor_is_shifted() {
        let append = encode(&[Patch::MoveChild {
            parent: NodeId::from("p"),
            child: NodeId::from("c"),
            before: None,
        }]);
        assert_eq!(append.last(), Some(&0));

        let before = encode(&[Patch::MoveChild {
            parent: NodeId::from("p"),
            child: NodeId::from("c"),
            before: Some(NodeId::from("p")),
        }]);
        assert_eq!(before.last(), Some(&1));
    }

    #[test]
    fn attribute_names_share_the_table_with_values() {
        let (_, stats) = encode_with_stats(&[Patch::SetAttribute {
            node: NodeId::from("n1"),
            attr: core_types::AttrId::from("a1"),
            name: Arc::from("title"),
            value: "title".to_string(),
        }]);
        assert_eq!(stats.strings, 3);
    }
}
