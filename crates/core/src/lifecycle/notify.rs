//! sd-notify wrappers for the systemd readiness protocol.

pub fn sd_ready() {
    if let Err(e) = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]) {
        tracing::debug!("sd_notify READY failed: {e}");
    }
}

pub fn sd_stopping() {
    if let Err(e) = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]) {
        tracing::debug!("sd_notify STOPPING failed: {e}");
    }
}
