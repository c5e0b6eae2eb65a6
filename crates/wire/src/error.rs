/// A batch that cannot be decoded. Always fatal for the cycle: it means the producer and the
/// consumer disagree about the format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("batch ended unexpectedly at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("varint at byte {offset} does not fit")]
    VarintOverflow { offset: usize },
    #[error("string table entry {index} is not valid utf-8")]
    InvalidUtf8 { index: usize },
    #[error("string index {index} out of range (table has {len} entries)")]
    StringIndexOutOfRange { index: usize, len: usize },
    #[error("unknown opcode {opcode} at byte {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("unknown node kind {kind} at byte {offset}")]
    UnknownNodeKind { kind: u8, offset: usize },
    #[error("unknown payload kind {kind} at byte {offset}")]
    UnknownPayloadKind { kind: u8, offset: usize },
    #[error("inserted subtree nests deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}
