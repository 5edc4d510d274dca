//! Process lifecycle around the HTTP listener.
//!
//! The server reports two transitions: listening, and draining before exit.
//! Under systemd (`NOTIFY_SOCKET` set) they are forwarded as `READY=1` and
//! `STOPPING=1`; otherwise they only show up in the log.

pub mod logging;
pub mod notify;
pub mod signal;

pub trait Lifecycle: Send + Sync {
    fn on_ready(&self);
    fn on_stopping(&self);
}

pub struct ForegroundLifecycle;

impl Lifecycle for ForegroundLifecycle {
    fn on_ready(&self) {
        tracing::info!("Listening for requests");
    }

    fn on_stopping(&self) {
        tracing::info!("Draining in-flight requests");
    }
}

/// Mirrors each transition to the service manager.
pub struct SystemdLifecycle;

impl Lifecycle for SystemdLifecycle {
    fn on_ready(&self) {
        notify::sd_ready();
        tracing::info!("Listening for requests (systemd notified)");
    }

    fn on_stopping(&self) {
        notify::sd_stopping();
        tracing::info!("Draining in-flight requests (systemd notified)");
    }
}

pub fn detect_lifecycle() -> Box<dyn Lifecycle> {
    match std::env::var_os("NOTIFY_SOCKET") {
        Some(_) => Box::new(SystemdLifecycle),
        None => Box::new(ForegroundLifecycle),
    }
}
