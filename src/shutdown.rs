use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// What woke a loop waiting on [`next_or_shutdown`].
#[derive(Debug, PartialEq, Eq)]
pub enum Wake<T> {
    Item(T),
    Ended,
    Shutdown,
}

/// Await the next item from a stream or shutdown, whichever comes first.
///
/// Cancellation is sticky: a token cancelled while the caller was busy with
/// the previous item still stops the next wait, before the stream is polled.
pub async fn next_or_shutdown<T>(
    mut stream: Pin<&mut (dyn Stream<Item = T> + Send)>,
    shutdown: &CancellationToken,
) -> Wake<T> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Wake::Shutdown,
        item = stream.next() => match item {
            Some(item) => Wake::Item(item),
            None => Wake::Ended,
        },
    }
}

/// Cancel `shutdown` once ctrl-c is received.
pub async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

/// Log how a spawned task ended. Returns `true` if it completed normally.
pub fn report_task_exit(name: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.is_panic() => {
            tracing::error!(task = name, "task panicked: {}", e);
            false
        }
        Err(e) => {
            tracing::error!(task = name, "task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenericBoxedStream;
    use futures_util::stream;
    use std::time::Duration;

    #[tokio::test]
    async fn yields_items_then_ended() {
        let shutdown = CancellationToken::new();
        let mut items: GenericBoxedStream<u32> = Box::pin(stream::iter(vec![1, 2]));

        assert_eq!(next_or_shutdown(items.as_mut(), &shutdown).await, Wake::Item(1));
        assert_eq!(next_or_shutdown(items.as_mut(), &shutdown).await, Wake::Item(2));
        assert_eq!(next_or_shutdown(items.as_mut(), &shutdown).await, Wake::Ended);
    }

    #[tokio::test]
    async fn shutdown_wins_over_pending_stream() {
        let shutdown = CancellationToken::new();
        let mut pending: GenericBoxedStream<u32> = Box::pin(stream::pending());

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        assert_eq!(next_or_shutdown(pending.as_mut(), &shutdown).await, Wake::Shutdown);
    }

    #[tokio::test]
    async fn shutdown_between_waits_is_not_lost() {
        let shutdown = CancellationToken::new();
        let mut items: GenericBoxedStream<u32> =
            Box::pin(stream::iter(vec![1]).chain(stream::pending()));

        assert_eq!(next_or_shutdown(items.as_mut(), &shutdown).await, Wake::Item(1));
        // cancelled while the caller is handling the item, with nobody waiting
        shutdown.cancel();

        let woke = tokio::time::timeout(
            Duration::from_millis(500),
            next_or_shutdown(items.as_mut(), &shutdown),
        )
        .await
        .expect("cancellation made while busy was dropped");
        assert_eq!(woke, Wake::Shutdown);
    }

    #[tokio::test]
    async fn shutdown_preempts_ready_items() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mut items: GenericBoxedStream<u32> = Box::pin(stream::iter(vec![1, 2]));

        assert_eq!(next_or_shutdown(items.as_mut(), &shutdown).await, Wake::Shutdown);
    }

    #[tokio::test]
    async fn task_exit_reports_panics() {
        let clean = tokio::spawn(async {});
        assert!(report_task_exit("clean", clean.await));

        let panicking = tokio::spawn(async { panic!("sweep blew up") });
        assert!(!report_task_exit("panicking", panicking.await));

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(!report_task_exit("aborted", aborted.await));
    }
}
