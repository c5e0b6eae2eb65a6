use core_types::{CommandId, NodeId, RenderVersion};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Protocol(#[from] wire::ProtocolError),
    #[error("batch for {got} does not follow the store's version (expected {expected})")]
    VersionMismatch {
        expected: RenderVersion,
        got: RenderVersion,
    },
    #[error("no live node {0}")]
    MissingNode(NodeId),
    #[error("node {0} is already live")]
    DuplicateNode(NodeId),
    #[error("node {0} has the wrong kind for this patch")]
    WrongNodeKind(NodeId),
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("{before} cannot anchor a move under {parent}")]
    InvalidSibling { parent: NodeId, before: NodeId },
    #[error("node {node} has no attribute {name}")]
    MissingAttribute { node: NodeId, name: String },
    #[error("node {node} has no matching {event} listener")]
    MissingListener { node: NodeId, event: String },
    #[error("command {0} is already bound")]
    DuplicateCommand(CommandId),
    #[error("nothing is mounted in the host container")]
    MissingRoot,
}
