use crate::error::ProtocolError;
use crate::{NODE_ELEMENT, NODE_TEXT};
use core_types::{AttrId, CommandId, NodeId};
use std::sync::Arc;
use tools::leb128::{self, VarintError};
use vdom::{Opcode, Patch, PatchAttr, PatchNode, PayloadKind};

/// Deepest inserted subtree a batch may carry.
pub const MAX_NESTING: usize = 512;

/// Decode a whole batch. Never panics on malformed input.
pub fn decode(bytes: &[u8]) -> Result<Vec<Patch>, ProtocolError> {
    let mut reader = Reader {
        bytes,
        pos: 0,
        strings: Vec::new(),
    };
    reader.header()?;
    let mut patches = Vec::new();
    while reader.pos < bytes.len() {
        patches.push(reader.patch()?);
    }
    log::trace!(
        target: "wire",
        "decoded {} patches, {} strings, {} bytes",
        patches.len(),
        reader.strings.len(),
        bytes.len()
    );
    Ok(patches)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    strings: Vec<Arc<str>>,
}

impl<'a> Reader<'a> {
    fn header(&mut self) -> Result<(), ProtocolError> {
        let count = self.usize()?;
        // Every entry takes at least its length byte.
        if count > self.remaining() {
            return Err(ProtocolError::UnexpectedEof {
                offset: self.bytes.len(),
            });
        }
        self.strings.reserve(count);
        for index in 0..count {
            let len = self.usize()?;
            let raw = self.take(len)?;
            let s = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8 { index })?;
            self.strings.push(Arc::from(s));
        }
        Ok(())
    }

    fn patch(&mut self) -> Result<Patch, ProtocolError> {
        let offset = self.pos;
        let raw = self.u8()?;
        let opcode =
            Opcode::from_u8(raw).ok_or(ProtocolError::UnknownOpcode { opcode: raw, offset })?;
        Ok(match opcode {
            Opcode::SetAttribute => Patch::SetAttribute {
                node: NodeId::from(self.string()?),
                attr: AttrId::from(self.string()?),
                name: self.string()?,
                value: self.string()?.to_string(),
            },
            Opcode::RemoveAttribute => Patch::RemoveAttribute {
                node: NodeId::from(self.string()?),
                attr: AttrId::from(self.string()?),
                name: self.string()?,
            },
            Opcode::InsertBefore => Patch::InsertBefore {
                parent: NodeId::from(self.string()?),
                before: self.optional()?.map(NodeId::from),
                node: self.node(0)?,
            },
            Opcode::RemoveChild => Patch::RemoveChild {
                parent: NodeId::from(self.string()?),
                child: NodeId::from(self.string()?),
            },
            Opcode::MoveChild => Patch::MoveChild {
                parent: NodeId::from(self.string()?),
                child: NodeId::from(self.string()?),
                before: self.optional()?.map(NodeId::from),
            },
            Opcode::SetText => Patch::SetText {
                node: NodeId::from(self.string()?),
                value: self.string()?.to_string(),
            },
            Opcode::ClearChildren => Patch::ClearChildren {
                parent: NodeId::from(self.string()?),
            },
            Opcode::AddHandler => Patch::AddHandler {
                node: NodeId::from(self.string()?),
                event: self.string()?,
                command: CommandId::from(self.string()?),
                payload: self.payload_kind()?,
            },
            Opcode::RemoveHandler => Patch::RemoveHandler {
                node: NodeId::from(self.string()?),
                event: self.string()?,
                command: CommandId::from(self.string()?),
            },
            Opcode::SetTitle => Patch::SetTitle {
                title: self.string()?.to_string(),
            },
        })
    }

    fn node(&mut self, depth: usize) -> Result<PatchNode, ProtocolError> {
        if depth >= MAX_NESTING {
            return Err(ProtocolError::NestingTooDeep { limit: MAX_NESTING });
        }
        let offset = self.pos;
        match self.u8()? {
            NODE_ELEMENT => {
                let id = NodeId::from(self.string()?);
                let tag = self.string()?;
                let attr_count = self.usize()?;
                let mut attributes = Vec::with_capacity(attr_count.min(self.remaining()));
                for _ in 0..attr_count {
                    attributes.push(PatchAttr {
                        id: AttrId::from(self.string()?),
                        name: self.string()?,
                        value: self.string()?.to_string(),
                    });
                }
                let child_count = self.usize()?;
                let mut children = Vec::with_capacity(child_count.min(self.remaining()));
                for _ in 0..child_count {
                    children.push(self.node(depth + 1)?);
                }
                Ok(PatchNode::Element {
                    id,
                    tag,
                    attributes,
                    children,
                })
            }
            NODE_TEXT => Ok(PatchNode::Text {
                id: NodeId::from(self.string()?),
                value: self.string()?.to_string(),
            }),
            kind => Err(ProtocolError::UnknownNodeKind { kind, offset }),
        }
    }

    fn payload_kind(&mut self) -> Result<PayloadKind, ProtocolError> {
        let offset = self.pos;
        let kind = self.u8()?;
        PayloadKind::from_u8(kind).ok_or(ProtocolError::UnknownPayloadKind { kind, offset })
    }

    fn string(&mut self) -> Result<Arc<str>, ProtocolError> {
        let index = self.usize()?;
        self.lookup(index)
    }

    fn optional(&mut self) -> Result<Option<Arc<str>>, ProtocolError> {
        match self.usize()? {
            0 => Ok(None),
            n => self.lookup(n - 1).map(Some),
        }
    }

    fn lookup(&self, index: usize) -> Result<Arc<str>, ProtocolError> {
        self.strings
            .get(index)
            .cloned()
            .ok_or(ProtocolError::StringIndexOutOfRange {
                index,
                len: self.strings.len(),
            })
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ProtocolError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn usize(&mut self) -> Result<usize, ProtocolError> {
        let offset = self.pos;
        leb128::read_usize(self.bytes, &mut self.pos).map_err(|err| match err {
            VarintError::Truncated => ProtocolError::UnexpectedEof { offset },
            VarintError::Overflow => ProtocolError::VarintOverflow { offset },
        })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let bytes: &'a [u8] = self.bytes;
        if len > self.remaining() {
            return Err(ProtocolError::UnexpectedEof {
                offset: bytes.len(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&bytes[start..self.pos])
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    fn sample() -> Vec<Patch> {
        vec![
            Patch::InsertBefore {
                parent: NodeId::from("root"),
                before: None,
                node: PatchNode::Element {
                    id: NodeId::from("n1"),
                    tag: Arc::from("ul"),
                    attributes: vec![PatchAttr {
                        id: AttrId::from("a1"),
                        name: Arc::from("class"),
                        value: "list".to_string(),
                    }],
                    children: vec![PatchNode::Text {
                        id: NodeId::from("n2"),
                        value: "héllo".to_string(),
                    }],
                },
            },
            Patch::AddHandler {
                node: NodeId::from("n1"),
                event: Arc::from("click"),
                command: CommandId::from("c1"),
                payload: PayloadKind::Pointer,
            },
            Patch::MoveChild {
                parent: NodeId::from("n1"),
                child: NodeId::from("n2"),
                before: Some(NodeId::from("n1")),
            },
            Patch::SetTitle {
                title: "Todos".to_string(),
            },
        ]
    }

    #[test]
    fn decodes_what_was_encoded() {
        let patches = sample();
        assert_eq!(decode(&encode(&patches)).unwrap(), patches);
    }

    #[test]
    fn header_strings_resolve_by_index() {
        let bytes = [2, 1, b'p', 2, b'h', b'i', Opcode::SetText as u8, 0, 1];
        assert_eq!(
            decode(&bytes).unwrap(),
            vec![Patch::SetText {
                node: NodeId::from("p"),
                value: "hi".to_string(),
            }]
        );
    }

    #[test]
    fn empty_batch_is_a_zero_string_header() {
        let bytes = encode(&[]);
        assert_eq!(bytes, vec![0]);
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            decode(&[]),
            Err(ProtocolError::UnexpectedEof { offset: 0 })
        );
    }

    #[test]
    fn truncated_batches_never_decode_to_the_full_list() {
        let patches = sample();
        let bytes = encode(&patches);
        for cut in 0..bytes.len() {
            // A cut on a record boundary is a shorter valid batch.
            match decode(&bytes[..cut]) {
                Ok(decoded) => assert!(decoded.len() < patches.len(), "cut at {cut}"),
                Err(_) => {}
            }
        }
    }

    #[test]
    fn out_of_range_string_index() {
        // One string, then ClearChildren pointing at index 3.
        let bytes = [1, 1, b'x', 7, 3];
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::StringIndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn unknown_opcode_reports_its_offset() {
        let bytes = [0, 42];
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::UnknownOpcode {
                opcode: 42,
                offset: 1
            })
        );
    }

    #[test]
    fn invalid_utf8_in_header() {
        let bytes = [1, 2, 0xC3, 0x28];
        assert_eq!(decode(&bytes), Err(ProtocolError::InvalidUtf8 { index: 0 }));
    }

    #[test]
    fn unknown_payload_kind() {
        // strings: "n", "e", "c"; AddHandler n e c <9>
        let bytes = [3, 1, b'n', 1, b'e', 1, b'c', 8, 0, 1, 2, 9];
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::UnknownPayloadKind { kind: 9, offset: 11 })
        );
    }

    #[test]
    fn unknown_node_kind() {
        // strings: "p"; InsertBefore p none <kind 7>
        let bytes = [1, 1, b'p', 3, 0, 0, 7];
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::UnknownNodeKind { kind: 7, offset: 6 })
        );
    }

    #[test]
    fn overlong_varint_is_rejected() {
        let mut bytes = vec![0xFF; 10];
        bytes.push(0x01);
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::VarintOverflow { offset: 0 })
        );
    }

    #[test]
    fn huge_string_count_does_not_allocate() {
        let mut bytes = Vec::new();
        tools::leb128::write_usize(&mut bytes, usize::MAX >> 8);
        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let mut node = PatchNode::Text {
            id: NodeId::from("leaf"),
            value: String::new(),
        };
        for _ in 0..MAX_NESTING {
            node = PatchNode::Element {
                id: NodeId::from("d"),
                tag: Arc::from("div"),
                attributes: Vec::new(),
                children: vec![node],
            };
        }
        let bytes = encode(&[Patch::InsertBefore {
            parent: NodeId::from("root"),
            before: None,
            node,
        }]);
        assert_eq!(
            decode(&bytes),
            Err(ProtocolError::NestingTooDeep { limit: MAX_NESTING })
        );
    }
}
