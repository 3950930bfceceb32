use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

/// One chat message as delivered by the server feed.
///
/// Messages are immutable once delivered; the feed never edits or deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub id: String,
    pub author: String,
    pub content: String,
}

impl FeedMessage {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            content: content.into(),
        }
    }
}

/// Lifecycle events emitted by the feed worker, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Full replacement snapshot of the message list. Each snapshot
    /// supersedes every prior one; the consumer renders the latest.
    Snapshot(Vec<FeedMessage>),
    /// The connection dropped and a reconnect attempt is scheduled.
    Reconnecting { attempt: u32, details: String },
    /// Terminal event: the feed delivers nothing further.
    Closed { details: Option<String> },
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type FeedWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Consumer half of a running feed subscription.
///
/// Dropping the stream signals cancellation to the worker, so abandoning
/// the feed (window close) needs no explicit teardown call.
pub struct FeedEventStream {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// A feed subscription split into its consumer stream and the IO worker
/// future the caller must spawn on the async runtime.
pub struct FeedHandle {
    pub stream: FeedEventStream,
    pub worker: FeedWorker,
}

impl FeedEventStream {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<FeedEvent>,
        cancel_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.events.try_recv().ok()
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for FeedEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub(crate) fn make_feed_stream() -> (
    mpsc::UnboundedSender<FeedEvent>,
    FeedEventStream,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (event_tx, FeedEventStream::new(event_rx, cancel_tx), cancel_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_the_stream_fires_the_cancel_signal() {
        let (_event_tx, stream, mut cancel_rx) = make_feed_stream();
        assert!(cancel_rx.try_recv().is_err());

        drop(stream);
        assert!(cancel_rx.try_recv().is_ok());
    }

    #[test]
    fn events_drain_in_delivery_order() {
        let (event_tx, mut stream, _cancel_rx) = make_feed_stream();

        let first = vec![FeedMessage::new("1", "A", "hello")];
        let second = vec![
            FeedMessage::new("1", "A", "hello"),
            FeedMessage::new("2", "B", "hi"),
        ];
        event_tx.send(FeedEvent::Snapshot(first.clone())).unwrap();
        event_tx.send(FeedEvent::Snapshot(second.clone())).unwrap();

        assert_eq!(stream.try_recv(), Some(FeedEvent::Snapshot(first)));
        assert_eq!(stream.try_recv(), Some(FeedEvent::Snapshot(second)));
        assert_eq!(stream.try_recv(), None);
    }
}
