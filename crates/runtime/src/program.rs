use crate::command::Command;
use crate::subscription::Subscription;
use url::Url;
use vdom::Document;

/// A link the user followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UrlRequest {
    /// Same application; usually answered with `Command::push_url`.
    Internal(Url),
    External(String),
}

/// The application hosted by a [`Runtime`](crate::Runtime).
///
/// `update` and `view` are pure: they see the current model by reference and return a new one
/// (or a tree) instead of mutating anything. Panics in them propagate to the caller driving
/// the runtime.
pub trait Program {
    type Model;
    type Message: Clone + Send + 'static;
    /// Opaque effect payload handed to the interpreter.
    type Effect;
    type Flags;

    fn init(
        &self,
        url: &Url,
        flags: Self::Flags,
    ) -> (Self::Model, Command<Self::Message, Self::Effect>);

    fn update(
        &self,
        message: Self::Message,
        model: &Self::Model,
    ) -> (Self::Model, Command<Self::Message, Self::Effect>);

    fn view(&self, model: &Self::Model) -> Document<Self::Message>;

    fn subscriptions(&self, _model: &Self::Model) -> Vec<Subscription<Self::Message>> {
        Vec::new()
    }

    /// Message for a location change. `None` ignores it.
    fn on_url_change(&self, _url: &Url) -> Option<Self::Message> {
        None
    }

    fn on_url_request(&self, _request: UrlRequest) -> Option<Self::Message> {
        None
    }
}
