//! Network quiescence
//!
//! A page counts as settled once no more than [`IDLE_MAX_INFLIGHT`] requests
//! have been outstanding for [`IDLE_WINDOW`]. The browser adapter feeds this
//! from the CDP Network events of the page being captured.

use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;

/// How long the network must stay quiet
pub const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Requests allowed to stay open while the network counts as quiet
pub const IDLE_MAX_INFLIGHT: usize = 2;

/// Start or end of one request, keyed by request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    Done(String),
}

pub type NetworkEvents = BoxStream<'static, NetworkEvent>;

/// Waits until at most `max_inflight` requests have been open for `window`
///
/// Returns early if the event stream ends. The caller bounds the total wait.
pub async fn wait_for_quiet(mut events: NetworkEvents, window: Duration, max_inflight: usize) {
    let mut inflight: HashSet<String> = HashSet::new();

    loop {
        let next = if inflight.len() <= max_inflight {
            match tokio::time::timeout(window, events.next()).await {
                Ok(event) => event,
                Err(_) => {
                    tracing::trace!("Network quiet ({} requests open)", inflight.len());
                    return;
                }
            }
        } else {
            events.next().await
        };

        match next {
            Some(NetworkEvent::Started(id)) => {
                inflight.insert(id);
            }
            Some(NetworkEvent::Done(id)) => {
                inflight.remove(&id);
            }
            None => return,
        }
    }
}
