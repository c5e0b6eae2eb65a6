//! Identity types shared by the tree model, the wire codec and the runtime.
//!
//! All identities are strings so they can travel through the binary string table unchanged.
//! Fresh ids come from process-wide counters; they only need to be unique, never meaningful.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Mint an id no other live value of this type carries.
            pub fn fresh() -> Self {
                static NEXT: AtomicU64 = AtomicU64::new(1);
                let n = NEXT.fetch_add(1, Ordering::Relaxed);
                Self(Arc::from(format!(concat!($prefix, "{}"), n)))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(Arc::from(raw))
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(Arc::from(raw))
            }
        }

        impl From<Arc<str>> for $name {
            fn from(raw: Arc<str>) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of a virtual node; stable across renders for the same logical node.
    NodeId,
    "n"
);
string_id!(
    /// Identity of a plain attribute on a node.
    AttrId,
    "a"
);
string_id!(
    /// Key of an active event handler in the handler registry.
    CommandId,
    "c"
);

impl NodeId {
    /// Reserved id of the host container the document root is mounted into.
    pub const HOST_ROOT: &'static str = "root";

    pub fn host_root() -> Self {
        Self::from(Self::HOST_ROOT)
    }

    pub fn is_host_root(&self) -> bool {
        &*self.0 == Self::HOST_ROOT
    }
}

/// Render cycle counter; one batch is produced per version step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderVersion(pub u64);

impl RenderVersion {
    pub const INITIAL: RenderVersion = RenderVersion(0);

    pub fn next(self) -> Self {
        RenderVersion(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RenderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
