use core_types::{AttrId, CommandId, NodeId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Attribute name whose value keys a child among its siblings.
pub const KEY_ATTRIBUTE: &str = "key";

/// Browser-visible id attribute; see [`Node::mirror_id`](crate::Node::mirror_id).
pub const DOM_ID_ATTRIBUTE: &str = "id";

/// Immutable virtual node. `M` is the hosting program's message type.
#[derive(Clone, Debug)]
pub enum Node<M> {
    Element {
        id: NodeId,
        tag: Arc<str>,
        attributes: Vec<Attribute<M>>,
        children: Vec<Node<M>>,
    },
    Text {
        id: NodeId,
        value: String,
    },
}

#[derive(Clone, Debug)]
pub enum Attribute<M> {
    Plain {
        id: AttrId,
        name: Arc<str>,
        value: String,
    },
    Handler(Handler<M>),
}

/// Binding of a DOM event name to the message it produces.
#[derive(Clone, Debug)]
pub struct Handler<M> {
    pub event: Arc<str>,
    pub command: CommandId,
    pub action: HandlerAction<M>,
}

#[derive(Clone, Debug)]
pub enum HandlerAction<M> {
    /// Dispatching the handler always yields this message.
    Message(M),
    /// The host extracts a payload of `payload` kind; `decoder` turns it into a message.
    Decode {
        payload: PayloadKind,
        decoder: Decoder<M>,
    },
}

impl<M> HandlerAction<M> {
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            HandlerAction::Message(_) => PayloadKind::None,
            HandlerAction::Decode { payload, .. } => *payload,
        }
    }
}

/// What the host extracts from a DOM event before calling `dispatchWithData`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadKind {
    None = 0,
    /// `{"value": string}` of the event target.
    Value = 1,
    /// `{"checked": bool}` of the event target.
    Checked = 2,
    Keyboard = 3,
    Pointer = 4,
    /// Whatever JSON the host chooses to forward.
    Json = 5,
}

impl PayloadKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => PayloadKind::None,
            1 => PayloadKind::Value,
            2 => PayloadKind::Checked,
            3 => PayloadKind::Keyboard,
            4 => PayloadKind::Pointer,
            5 => PayloadKind::Json,
            _ => return None,
        })
    }
}

type DecodeFn<M> = dyn Fn(&Value) -> Result<Option<M>, serde_json::Error> + Send + Sync;

/// Payload-to-message function of a handler.
///
/// `Ok(None)` means the event is deliberately ignored (e.g. a key filter).
pub struct Decoder<M>(Arc<DecodeFn<M>>);

impl<M> Decoder<M> {
    pub fn new(
        f: impl Fn(&Value) -> Result<Option<M>, serde_json::Error> + Send + Sync + 'static,
    ) -> Self {
        Decoder(Arc::new(f))
    }

    pub fn decode(&self, payload: &Value) -> Result<Option<M>, serde_json::Error> {
        (self.0)(payload)
    }
}

impl<M> Clone for Decoder<M> {
    fn clone(&self) -> Self {
        Decoder(Arc::clone(&self.0))
    }
}

impl<M> fmt::Debug for Decoder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decoder(..)")
    }
}

/// Output of a program's `view`.
#[derive(Clone, Debug)]
pub struct Document<M> {
    pub title: String,
    pub body: Node<M>,
}

impl<M> Node<M> {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Element { id, .. } | Node::Text { id, .. } => id,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element { tag, .. } => Some(tag),
            Node::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node<M>] {
        match self {
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    pub fn attributes(&self) -> &[Attribute<M>] {
        match self {
            Node::Element { attributes, .. } => attributes,
            Node::Text { .. } => &[],
        }
    }

    /// Value of the plain `key` attribute, if the node carries one.
    pub fn key(&self) -> Option<&str> {
        self.plain_attribute(KEY_ATTRIBUTE)
    }

    pub fn plain_attribute(&self, wanted: &str) -> Option<&str> {
        self.attributes().iter().find_map(|attr| match attr {
            Attribute::Plain { name, value, .. } if &**name == wanted => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Handler<M>> {
        self.attributes().iter().filter_map(|attr| match attr {
            Attribute::Handler(handler) => Some(handler),
            Attribute::Plain { .. } => None,
        })
    }

    /// Same kind and, for elements, same tag.
    pub fn same_shape(&self, other: &Node<M>) -> bool {
        match (self, other) {
            (Node::Element { tag: a, .. }, Node::Element { tag: b, .. }) => a == b,
            (Node::Text { .. }, Node::Text { .. }) => true,
            _ => false,
        }
    }
}
