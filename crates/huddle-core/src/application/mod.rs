pub mod disconnect;
pub mod hub;
pub mod join_chat;
pub mod leave_chat;
pub mod ports;
pub mod registry;
pub mod relay;

#[cfg(test)]
mod testing;

use tracing::warn;

use crate::domain::error::HubError;
use crate::domain::identity::ChannelName;

/// Log per-recipient send failures. A failed recipient never aborts a batch.
pub(crate) fn report_delivery_failures(callback: &str, channel: &ChannelName, failures: Vec<HubError>) {
    for failure in failures {
        warn!(%channel, callback, "{failure}");
    }
}
