use bus::MessageSender;
use std::convert::Infallible;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs `Command::Perform` payloads. Results come back as messages through `sender`.
pub trait EffectInterpreter<M, E> {
    fn interpret(&mut self, effect: E, sender: &MessageSender<M>);
}

impl<M, E, F> EffectInterpreter<M, E> for F
where
    F: FnMut(E, &MessageSender<M>),
{
    fn interpret(&mut self, effect: E, sender: &MessageSender<M>) {
        self(effect, sender)
    }
}

/// Interpreter for programs without effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEffects;

impl<M> EffectInterpreter<M, Infallible> for NoEffects {
    fn interpret(&mut self, effect: Infallible, _sender: &MessageSender<M>) {
        match effect {}
    }
}

/// Runs each effect on its own thread; the returned message, if any, is enqueued.
pub struct ThreadInterpreter<E, M> {
    run: Arc<dyn Fn(E) -> Option<M> + Send + Sync>,
    workers: Vec<JoinHandle<()>>,
}

impl<E, M> ThreadInterpreter<E, M>
where
    E: Send + 'static,
    M: Send + 'static,
{
    pub fn new(run: impl Fn(E) -> Option<M> + Send + Sync + 'static) -> Self {
        Self {
            run: Arc::new(run),
            workers: Vec::new(),
        }
    }

    /// Effects still running.
    pub fn in_flight(&mut self) -> usize {
        self.workers.retain(|worker| !worker.is_finished());
        self.workers.len()
    }

    /// Wait for every running effect.
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!(target: "runtime.loop", "effect thread panicked");
            }
        }
    }
}

impl<E, M> EffectInterpreter<M, E> for ThreadInterpreter<E, M>
where
    E: Send + 'static,
    M: Send + 'static,
{
    fn interpret(&mut self, effect: E, sender: &MessageSender<M>) {
        let run = Arc::clone(&self.run);
        let sender = sender.clone();
        let spawned = thread::Builder::new()
            .name("effect".into())
            .spawn(move || {
                if let Some(message) = run(effect) {
                    sender.send(message);
                }
            });
        match spawned {
            Ok(worker) => {
                self.workers.retain(|worker| !worker.is_finished());
                self.workers.push(worker);
            }
            Err(err) => log::error!(target: "runtime.loop", "could not spawn effect thread: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::{Queue, RuntimeEvent};

    #[test]
    fn thread_interpreter_reports_back_through_the_queue() {
        let queue: Queue<u32> = Queue::new();
        let mut interpreter = ThreadInterpreter::new(|n: u32| (n % 2 == 0).then_some(n * 10));
        interpreter.interpret(2, &queue.sender());
        interpreter.interpret(3, &queue.sender());
        interpreter.join();
        assert_eq!(interpreter.in_flight(), 0);

        let got: Vec<u32> = std::iter::from_fn(|| queue.try_next())
            .filter_map(|event| match event {
                RuntimeEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(got, vec![20]);
    }

    #[test]
    fn closures_are_interpreters() {
        let queue: Queue<String> = Queue::new();
        let mut log = Vec::new();
        let mut interpreter = |effect: &'static str, sender: &MessageSender<String>| {
            log.push(effect);
            sender.send(effect.to_uppercase());
        };
        interpreter.interpret("save", &queue.sender());
        assert_eq!(log, vec!["save"]);
        assert!(matches!(queue.try_next(), Some(RuntimeEvent::Message(m)) if m == "SAVE"));
    }
}
