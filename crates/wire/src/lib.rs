//! Binary batching of patch lists.
//!
//! One render cycle becomes one buffer:
//!
//! ```text
//! header:  uleb128 string_count, then string_count x (uleb128 byte_len, utf-8 bytes)
//! records: (opcode: u8, operands...)*   until end of buffer
//! ```
//!
//! String operands (ids, names, values, events, commands) are uleb128 indexes into the header
//! table; each distinct string is stored once. Optional ids are `0` for none and `index + 1`
//! otherwise. Inserted subtrees are encoded inline, depth first.

mod decode;
mod encode;
mod error;
mod string_table;

pub use crate::decode::{MAX_NESTING, decode};
pub use crate::encode::{BatchStats, encode, encode_with_stats};
pub use crate::error::ProtocolError;
pub use crate::string_table::StringTable;

/// Kind byte of an encoded `PatchNode`.
pub(crate) const NODE_ELEMENT: u8 = 1;
pub(crate) const NODE_TEXT: u8 = 2;
