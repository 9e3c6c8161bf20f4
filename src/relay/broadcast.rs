//! Command fan-out to every registered client.

use super::registry::ConnectionRegistry;
use crate::protocol::Command;
use log::{debug, info, warn};

/// Send `command` to every connection in `registry`.
///
/// Each client gets its own message: the command's global parameters merged
/// with that client's entry from the command's parameter map.  A failed
/// send (closed connection) or a failed serialisation is logged and
/// skipped; it never aborts the remaining sends and is not retried.
///
/// Returns the number of messages attempted, i.e. the number of registered
/// connections at the time of the call.
pub fn broadcast(registry: &ConnectionRegistry, command: &Command) -> usize {
    let kind = command.kind();
    let mut attempted = 0;
    let mut delivered = 0;

    for (identifier, handle) in registry.iter() {
        attempted += 1;
        let message = command.message_for(identifier);
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialise {} for {}: {}", kind, identifier, e);
                continue;
            }
        };
        match handle.send(json) {
            Ok(()) => {
                debug!("queued {} for {}: {:?}", kind, identifier, message);
                delivered += 1;
            }
            Err(e) => warn!("skipping {} for {}: {}", kind, identifier, e),
        }
    }

    info!("broadcast {}: {}/{} queued", kind, delivered, attempted);
    attempted
}
