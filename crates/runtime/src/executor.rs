use crate::nav::LocationChange;
use core_types::RenderVersion;
use dom_store::{DomStore, StoreError};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("host rejected batch: {0}")]
    Rejected(String),
}

/// Host side of the patch protocol.
///
/// `apply` receives one encoded batch per render cycle and must apply it completely, in order,
/// before returning. The navigation hooks mirror history changes made by the runtime.
pub trait PatchExecutor {
    fn apply(&mut self, version: RenderVersion, batch: &[u8]) -> Result<(), ExecutorError>;

    fn set_location(&mut self, _url: &Url, _change: LocationChange) {}

    fn go(&mut self, _delta: isize) {}

    fn load(&mut self, _url: &str) {}
}

impl PatchExecutor for DomStore {
    fn apply(&mut self, version: RenderVersion, batch: &[u8]) -> Result<(), ExecutorError> {
        self.apply_batch(version, batch)?;
        Ok(())
    }
}
