//! Impersonation boundary.
//!
//! When a delegation callback is configured, every data-plane operation is
//! bracketed by the authorization context the callback establishes for
//! the authenticated remote user. The session store never caches
//! credentials, only connection identifiers.

use async_trait::async_trait;
use portico_commons::Result;

/// Identity of the caller as seen by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub remote_user: Option<String>,
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new(remote_user: Option<String>, remote_addr: Option<String>) -> Self {
        Self {
            remote_user,
            remote_addr,
        }
    }
}

/// Scope guard for an established authorization context. Dropping it
/// releases the context.
pub trait DelegationContext: Send {}

/// Callback invoked around every data-plane engine operation. A failure
/// to authorize surfaces as an engine-class error, never as a protocol
/// error.
#[async_trait]
pub trait DelegationCallback: Send + Sync {
    async fn enter(
        &self,
        remote_user: &str,
        remote_addr: &str,
        action: &str,
    ) -> Result<Box<dyn DelegationContext>>;
}
