//! Startup sync
//!
//! After every successful connect the receiver is asked for the current value
//! of each exposed control. The answers come back later as ordinary receiver
//! events and are published like any other state change.

use tracing::debug;

use crate::receiver::{Command, Control, ReceiverClient, ReceiverError, ZoneId};

/// The fixed query battery: main zone controls first, then the zone controls of `zone`
pub fn startup_queries(zone: ZoneId) -> Vec<Command> {
    Control::ALL_MAIN
        .into_iter()
        .chain(Control::zone_controls(zone))
        .map(Command::query)
        .collect()
}

/// Writes every startup query without waiting for answers.
/// Returns the number of queries issued.
pub async fn run_startup_sync(
    receiver: &dyn ReceiverClient,
    zone: ZoneId,
) -> Result<usize, ReceiverError> {
    let queries = startup_queries(zone);
    let count = queries.len();

    for query in queries {
        debug!("Startup query: {}", query.control);
        receiver.send_command(query).await?;
    }
    Ok(count)
}
