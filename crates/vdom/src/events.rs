//! Typed event payloads and the handler constructors that decode them.
//!
//! The host extracts a payload according to the handler's [`PayloadKind`] and forwards it as
//! JSON; the shapes below are what it is expected to send.

use crate::types::{Decoder, Node, PayloadKind};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InputData {
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CheckedData {
    pub checked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardData {
    pub key: String,
    pub code: String,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
    pub repeat: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointerData {
    pub client_x: f64,
    pub client_y: f64,
    pub button: i16,
}

/// Decoder that deserializes the payload into `T` and hands it to `f`.
pub fn typed<T, M>(f: impl Fn(T) -> Option<M> + Send + Sync + 'static) -> Decoder<M>
where
    T: DeserializeOwned,
{
    Decoder::new(move |payload: &Value| {
        let data = T::deserialize(payload)?;
        Ok(f(data))
    })
}

impl<M: 'static> Node<M> {
    pub fn on_input(self, f: impl Fn(String) -> M + Send + Sync + 'static) -> Self {
        self.on_decode(
            "input",
            PayloadKind::Value,
            typed(move |data: InputData| Some(f(data.value))),
        )
    }

    pub fn on_check(self, f: impl Fn(bool) -> M + Send + Sync + 'static) -> Self {
        self.on_decode(
            "change",
            PayloadKind::Checked,
            typed(move |data: CheckedData| Some(f(data.checked))),
        )
    }

    /// `f` may return `None` to ignore a key.
    pub fn on_keydown(self, f: impl Fn(KeyboardData) -> Option<M> + Send + Sync + 'static) -> Self {
        self.on_decode("keydown", PayloadKind::Keyboard, typed(f))
    }

    pub fn on_pointer(
        self,
        event: &str,
        f: impl Fn(PointerData) -> M + Send + Sync + 'static,
    ) -> Self {
        self.on_decode(
            event,
            PayloadKind::Pointer,
            typed(move |data: PointerData| Some(f(data))),
        )
    }

    pub fn on_json(
        self,
        event: &str,
        f: impl Fn(&Value) -> Option<M> + Send + Sync + 'static,
    ) -> Self {
        self.on_decode(
            event,
            PayloadKind::Json,
            Decoder::new(move |payload: &Value| Ok(f(payload))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerAction;
    use serde_json::json;

    fn only_decoder<M: std::fmt::Debug>(node: &Node<M>) -> (PayloadKind, Decoder<M>) {
        match node.handlers().next().map(|h| &h.action) {
            Some(HandlerAction::Decode { payload, decoder }) => (*payload, decoder.clone()),
            other => panic!("expected decode handler, got {other:?}"),
        }
    }

    #[test]
    fn input_handler_decodes_value() {
        let node = Node::element("input").on_input(|v| v.len());
        let (kind, decoder) = only_decoder(&node);
        assert_eq!(kind, PayloadKind::Value);
        assert_eq!(decoder.decode(&json!({"value": "abc"})).unwrap(), Some(3));
    }

    #[test]
    fn keydown_filter_can_ignore_events() {
        let node = Node::element("input")
            .on_keydown(|k| (k.key == "Enter").then_some("submit"));
        let (_, decoder) = only_decoder(&node);
        assert_eq!(
            decoder.decode(&json!({"key": "Enter", "ctrlKey": true})).unwrap(),
            Some("submit")
        );
        assert_eq!(decoder.decode(&json!({"key": "a"})).unwrap(), None);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let node = Node::element("input").on_check(|c| c);
        let (_, decoder) = only_decoder(&node);
        assert!(decoder.decode(&json!({"checked": "yes"})).is_err());
    }

    #[test]
    fn pointer_defaults_missing_fields() {
        let node = Node::element("div").on_pointer("click", |p| p.button);
        let (kind, decoder) = only_decoder(&node);
        assert_eq!(kind, PayloadKind::Pointer);
        assert_eq!(decoder.decode(&json!({"clientX": 3.0})).unwrap(), Some(0));
    }
}
