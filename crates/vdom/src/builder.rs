//! Minimal constructors for virtual trees.
//!
//! Every constructor mints fresh identities; the aligner maps them back onto the previous
//! render's ids before diffing.

use crate::types::{
    Attribute, DOM_ID_ATTRIBUTE, Decoder, Handler, HandlerAction, KEY_ATTRIBUTE, Node, PayloadKind,
};
use core_types::{AttrId, CommandId, NodeId};
use std::sync::Arc;

impl<M> Node<M> {
    pub fn element(tag: &str) -> Self {
        Node::Element {
            id: NodeId::fresh(),
            tag: Arc::from(tag),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            id: NodeId::fresh(),
            value: value.into(),
        }
    }

    pub fn attr(self, name: &str, value: impl Into<String>) -> Self {
        self.with_attribute(Attribute::Plain {
            id: AttrId::fresh(),
            name: Arc::from(name),
            value: value.into(),
        })
    }

    /// Key this node among its siblings so it keeps its identity when reordered.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.attr(KEY_ATTRIBUTE, key)
    }

    /// Set the DOM `id` attribute to this node's identity.
    ///
    /// The aligner keeps the attribute in step with the node id across renders, so external
    /// references (anchors, labels) keep pointing at the same element.
    pub fn mirror_id(self) -> Self {
        let id = self.id().as_str().to_owned();
        self.attr(DOM_ID_ATTRIBUTE, id)
    }

    pub fn child(mut self, child: Node<M>) -> Self {
        if let Node::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, extra: impl IntoIterator<Item = Node<M>>) -> Self {
        if let Node::Element { children, .. } = &mut self {
            children.extend(extra);
        }
        self
    }

    /// Dispatching `event` yields `message`.
    pub fn on(self, event: &str, message: M) -> Self {
        self.handler(event, HandlerAction::Message(message))
    }

    /// Dispatching `event` decodes a `payload`-kind payload through `decoder`.
    pub fn on_decode(self, event: &str, payload: PayloadKind, decoder: Decoder<M>) -> Self {
        self.handler(event, HandlerAction::Decode { payload, decoder })
    }

    fn handler(self, event: &str, action: HandlerAction<M>) -> Self {
        self.with_attribute(Attribute::Handler(Handler {
            event: Arc::from(event),
            command: CommandId::fresh(),
            action,
        }))
    }

    fn with_attribute(mut self, attribute: Attribute<M>) -> Self {
        if let Node::Element { attributes, .. } = &mut self {
            attributes.push(attribute);
        }
        self
    }
}
