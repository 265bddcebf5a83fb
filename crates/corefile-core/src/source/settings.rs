// # Upstream Settings
//
// Forwarders for the root server block. The settings store may hold a
// primary and a secondary forwarder; whatever it lacks is taken from the
// configured defaults. A blank primary counts as absent. A secondary that
// was explicitly set to nothing (or blank) disables the default secondary.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::UpstreamDefaults;
use crate::traits::{Upstream, UpstreamSource};
use crate::Error;

#[derive(Debug, Default)]
struct Stored {
    primary: Option<String>,
    /// `None` until set; `Some(None)` means "no secondary"
    secondary: Option<Option<String>>,
}

/// In-memory settings store with configured fallbacks
#[derive(Debug, Clone)]
pub struct SettingsUpstreamSource {
    defaults: UpstreamDefaults,
    stored: Arc<RwLock<Stored>>,
}

impl SettingsUpstreamSource {
    /// Create a source with nothing stored
    pub fn new(defaults: UpstreamDefaults) -> Self {
        Self {
            defaults,
            stored: Arc::new(RwLock::new(Stored::default())),
        }
    }

    /// Store a primary forwarder; `None` falls back to the default
    pub async fn set_primary(&self, primary: Option<String>) {
        self.stored.write().await.primary = primary;
    }

    /// Store a secondary forwarder; `None` or a blank value means none
    pub async fn set_secondary(&self, secondary: Option<String>) {
        self.stored.write().await.secondary = Some(non_blank(secondary.as_deref()));
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl UpstreamSource for SettingsUpstreamSource {
    async fn upstream(&self) -> Result<Option<Upstream>, Error> {
        let stored = self.stored.read().await;
        let primary = non_blank(stored.primary.as_deref())
            .or_else(|| non_blank(Some(self.defaults.primary.as_str())));
        let secondary = match &stored.secondary {
            Some(secondary) => secondary.clone(),
            None => non_blank(self.defaults.secondary.as_deref()),
        };

        Ok(primary.map(|p| Upstream::new(p, secondary)))
    }
}

/// Fixed forwarding settings
#[derive(Debug, Clone, Default)]
pub struct StaticUpstream(Option<Upstream>);

impl StaticUpstream {
    /// Always forward to `upstream`
    pub fn new(upstream: Upstream) -> Self {
        Self(Some(upstream))
    }

    /// Never forward
    pub fn disabled() -> Self {
        Self(None)
    }
}

#[async_trait]
impl UpstreamSource for StaticUpstream {
    async fn upstream(&self) -> Result<Option<Upstream>, Error> {
        Ok(self.0.clone())
    }
}
