use crate::peers::PeerStore;
use crate::shutdown::{next_or_shutdown, Wake};
use crate::types::GenericBoxedStream;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// `now - max_age`, saturating at the earliest representable instant.
pub fn cutoff_before(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Prune every peer not seen within `max_age` and return the dropped ids.
pub fn sweep_once(store: &PeerStore, max_age: Duration) -> Vec<String> {
    let cutoff = cutoff_before(Utc::now(), max_age);
    let dropped = store.prune_older_than(cutoff);
    if dropped.is_empty() {
        debug!(remaining = store.len(), "sweep found no stale peers");
    } else {
        info!(
            dropped_count = dropped.len(),
            remaining = store.len(),
            "dropped stale peers: {}",
            dropped.join(", ")
        );
    }
    dropped
}

/// Yields once per `interval`, starting one full interval from now.
pub fn sweep_ticks(interval: Duration) -> impl Stream<Item = Instant> {
    stream! {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let at = ticker.tick().await;
            yield at;
        }
    }
}

/// Sweep the store on every tick until `shutdown` is cancelled.
pub async fn run_sweeper(
    store: PeerStore,
    max_age: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(
        max_age_secs = max_age.as_secs(),
        interval_secs = interval.as_secs(),
        "Sweeper started"
    );

    let mut ticks: GenericBoxedStream<Instant> = Box::pin(sweep_ticks(interval));
    loop {
        match next_or_shutdown(ticks.as_mut(), &shutdown).await {
            Wake::Item(_) => {
                sweep_once(&store, max_age);
            }
            Wake::Ended => {
                info!("Sweeper tick stream ended");
                break;
            }
            Wake::Shutdown => {
                info!("Sweeper: shutdown signal received");
                break;
            }
        }
    }

    info!("Sweeper exited");
}
