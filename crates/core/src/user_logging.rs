//! Attaches the caller's username and client address to the diagnostic
//! context for exactly the duration of one request.

use crate::config::{UserLoggingConfig, UsernameSource};
use crate::identity::RequestIdentity;
use crate::mdc::{self, MdcGuard};
use std::sync::Arc;

/// Values captured from a request before it is handed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub username: Option<String>,
    pub client_addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserLogging {
    config: Arc<UserLoggingConfig>,
    source: UsernameSource,
}

impl UserLogging {
    pub fn new(config: Arc<UserLoggingConfig>) -> Self {
        let source = config.username_source();
        Self { config, source }
    }

    pub fn config(&self) -> &UserLoggingConfig {
        &self.config
    }

    pub fn username<R: RequestIdentity + ?Sized>(&self, request: &R) -> Option<String> {
        match &self.source {
            UsernameSource::Principal => request.principal().map(|p| p.name),
            UsernameSource::SessionAttribute(name) => {
                request.session().and_then(|s| s.attribute_str(name))
            }
        }
    }

    pub fn capture<R: RequestIdentity + ?Sized>(&self, request: &R) -> UserContext {
        UserContext {
            username: self.username(request),
            client_addr: request.remote_addr(),
        }
    }

    /// Await `next` with the user and ip keys set, then remove them.
    ///
    /// The output of `next` (including any `Err`) is returned as is. The keys
    /// are removed on every exit path, including panics and cancellation.
    /// A task scope is opened when the caller is not already inside one.
    pub async fn enrich<F: Future>(&self, ctx: UserContext, next: F) -> F::Output {
        if mdc::is_scoped() {
            self.run_enriched(ctx, next).await
        } else {
            mdc::scope(self.run_enriched(ctx, next)).await
        }
    }

    async fn run_enriched<F: Future>(&self, ctx: UserContext, next: F) -> F::Output {
        let mut guard = MdcGuard::new();
        guard.put(&self.config.user_key, ctx.username);
        guard.put(&self.config.ip_key, ctx.client_addr);
        tracing::debug!(keys = ?guard.keys(), "User logging context entered");

        let output = next.await;
        drop(guard);
        output
    }
}
