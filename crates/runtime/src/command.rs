/// Work requested by `init`/`update`, run after the cycle's batch has been applied.
#[derive(Debug)]
pub enum Command<M, E> {
    None,
    Batch(Vec<Command<M, E>>),
    /// Enqueue `M` behind whatever is already waiting.
    Message(M),
    /// Hand an opaque effect to the interpreter.
    Perform(E),
    Navigate(Navigation),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    PushUrl(String),
    ReplaceUrl(String),
    Back(usize),
    Forward(usize),
    /// Leave the application.
    Load(String),
}

impl<M, E> Command<M, E> {
    pub fn none() -> Self {
        Command::None
    }

    pub fn batch(commands: impl IntoIterator<Item = Command<M, E>>) -> Self {
        Command::Batch(commands.into_iter().collect())
    }

    pub fn message(message: M) -> Self {
        Command::Message(message)
    }

    pub fn perform(effect: E) -> Self {
        Command::Perform(effect)
    }

    pub fn push_url(url: impl Into<String>) -> Self {
        Command::Navigate(Navigation::PushUrl(url.into()))
    }

    pub fn replace_url(url: impl Into<String>) -> Self {
        Command::Navigate(Navigation::ReplaceUrl(url.into()))
    }

    pub fn back(steps: usize) -> Self {
        Command::Navigate(Navigation::Back(steps))
    }

    pub fn forward(steps: usize) -> Self {
        Command::Navigate(Navigation::Forward(steps))
    }

    pub fn load(url: impl Into<String>) -> Self {
        Command::Navigate(Navigation::Load(url.into()))
    }

    pub fn is_none(&self) -> bool {
        match self {
            Command::None => true,
            Command::Batch(commands) => commands.iter().all(Command::is_none),
            _ => false,
        }
    }
}

impl<M, E> Default for Command<M, E> {
    fn default() -> Self {
        Command::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_empty_batches_are_none() {
        let cmd: Command<(), ()> = Command::batch([Command::none(), Command::batch([])]);
        assert!(cmd.is_none());
        assert!(!Command::<u8, ()>::batch([Command::message(1)]).is_none());
    }
}
