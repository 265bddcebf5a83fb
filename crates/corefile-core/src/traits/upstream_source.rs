// # Upstream Source Trait
//
// Forwarding settings injected into the root server block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Upstream resolvers for the `forward` directive
///
/// A secondary forwarder only exists alongside a primary one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    /// Primary forwarder
    pub primary: String,
    /// Optional secondary forwarder, emitted after the primary
    pub secondary: Option<String>,
}

impl Upstream {
    /// Create an upstream pair; a blank secondary is treated as absent
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Forwarders in emission order
    pub fn addresses(&self) -> Vec<&str> {
        let mut out = vec![self.primary.as_str()];
        if let Some(secondary) = &self.secondary {
            out.push(secondary.as_str());
        }
        out
    }
}

/// Trait for settings store implementations
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Current forwarding settings, `None` when forwarding is disabled
    async fn upstream(&self) -> Result<Option<Upstream>, crate::Error>;
}
