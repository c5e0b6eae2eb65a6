//! Virtual tree model, identity alignment and keyed diffing.
//!
//! Pipeline per render: `view` builds a fresh [`Node`] tree, [`align`] maps it onto the previous
//! tree's identities, [`diff`] turns the pair into an ordered [`Patch`] list.

pub mod align;
pub mod dom_diff;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
pub mod events;
pub mod lis;
pub mod walk;

mod builder;
mod dom_patch;
mod types;

pub use crate::align::align;
pub use crate::dom_diff::{diff, diff_from_empty, diff_optional};
pub use crate::dom_patch::{Opcode, Patch, PatchAttr, PatchNode};
pub use crate::types::{
    Attribute, DOM_ID_ATTRIBUTE, Decoder, Document, Handler, HandlerAction, KEY_ATTRIBUTE, Node,
    PayloadKind,
};
pub use core_types::{AttrId, CommandId, NodeId};
