//! Executes the effects a transition leaves after its persistent part has
//! been committed.

use tracing::{info, warn};

use sk_portal_core::{Effect, LogLevel};

/// Runs every non-persistent effect. History entries are skipped; the
/// repository has already written them with the request update.
pub fn execute_effects(effects: &[Effect]) {
    for effect in effects.iter().filter(|e| !e.is_persistent()) {
        if let Effect::Log { level, message } = effect {
            match level {
                LogLevel::Info => info!("{}", message),
                LogLevel::Warn => warn!("{}", message),
            }
        }
    }
}
