use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::registry::RegistryError;

/// Failures that stop the runtime. Rejected batches after the first render are not among
/// them: those are logged and the previous tree is kept.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("initial render was rejected: {0}")]
    InitialRender(#[source] ExecutorError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("could not start subscription source: {0}")]
    Spawn(#[from] std::io::Error),
}
