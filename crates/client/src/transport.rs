use std::sync::Arc;
use std::time::Duration;

use async_tungstenite::tungstenite::client::IntoClientRequest;
use async_tungstenite::tungstenite::http::HeaderValue;
use futures::StreamExt;
use graphql_ws_client::Client;
use graphql_ws_client::graphql::StreamingOperation;
use snafu::{OptionExt, ResultExt, ensure};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::config::TransportConfig;
use crate::error::{
    ClientResult, ConnectSnafu, EmptyEndpointSnafu, EmptyResponseSnafu, HandshakeSnafu,
    InvalidEndpointSnafu, OperationRejectedSnafu, OperationStartSnafu, OperationStreamSnafu,
};
use crate::feed::{BoxFuture, FeedEvent, FeedHandle, FeedWorker, make_feed_stream};
use crate::operations::{
    MessagesSubscription, PostMessage, messages_subscription, post_message, snapshot_from_response,
};

pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-transport-ws";

const MESSAGES_OPERATION: &str = "messages";
const POST_MESSAGE_OPERATION: &str = "postMessage";

const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff schedule for feed reconnects: doubles per attempt, capped.
pub(crate) fn reconnect_delay(attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(5);
    RECONNECT_BASE_DELAY
        .saturating_mul(1u32 << doublings)
        .min(RECONNECT_MAX_DELAY)
}

/// Seam between the UI and the GraphQL wire stack.
///
/// One transport instance lives for the whole process; the subscription
/// feed and the post path share its underlying connection.
pub trait ChatTransport: Send + Sync {
    /// Endpoint this transport talks to, for display purposes.
    fn endpoint(&self) -> &str;

    /// Opens the live message feed. The returned worker future must be
    /// spawned on the Tokio runtime; events arrive on the stream half.
    fn subscribe_messages(&self) -> FeedHandle;

    /// Posts one message, resolving to the server acknowledgement id.
    /// Callers may detach the future for fire-and-forget semantics.
    fn post_message(
        &self,
        author: String,
        content: String,
    ) -> BoxFuture<'static, ClientResult<String>>;
}

type SharedClient = Arc<Mutex<Option<Client>>>;

pub struct GraphqlWsTransport {
    config: TransportConfig,
    shared: SharedClient,
}

impl GraphqlWsTransport {
    pub fn new(config: TransportConfig) -> ClientResult<Self> {
        ensure!(
            !config.endpoint.is_empty(),
            EmptyEndpointSnafu {
                stage: "transport-new",
            }
        );

        // Validate eagerly so a bad endpoint fails at startup, not on the
        // first send.
        config
            .endpoint
            .as_str()
            .into_client_request()
            .context(InvalidEndpointSnafu {
                stage: "transport-new",
                endpoint: config.endpoint.clone(),
            })?;

        Ok(Self {
            config,
            shared: Arc::new(Mutex::new(None)),
        })
    }

    async fn connect(endpoint: &str) -> ClientResult<Client> {
        let mut request = endpoint
            .into_client_request()
            .context(InvalidEndpointSnafu {
                stage: "connect-request",
                endpoint: endpoint.to_string(),
            })?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(GRAPHQL_WS_PROTOCOL),
        );

        let (connection, _response) = async_tungstenite::tokio::connect_async(request)
            .await
            .context(ConnectSnafu {
                stage: "connect-websocket",
                endpoint: endpoint.to_string(),
            })?;

        let (client, actor) = Client::build(connection).await.context(HandshakeSnafu {
            stage: "connection-init",
        })?;

        // The actor owns the socket and multiplexes every operation this
        // client handle starts; it ends when the connection drops.
        tokio::spawn(actor.into_future());

        tracing::debug!(endpoint, "chat transport connected");
        Ok(client)
    }

    /// Returns the process-wide client handle, dialing once on demand.
    async fn acquire_client(
        config: &TransportConfig,
        shared: &SharedClient,
    ) -> ClientResult<Client> {
        let mut guard = shared.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = Self::connect(&config.endpoint).await?;
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn drop_shared_client(shared: &SharedClient) {
        *shared.lock().await = None;
    }

    /// Forwards feed snapshots until the connection ends one way or another.
    async fn pump_feed(
        config: &TransportConfig,
        shared: &SharedClient,
        event_tx: &mpsc::UnboundedSender<FeedEvent>,
    ) -> ClientResult<()> {
        let client = Self::acquire_client(config, shared).await?;
        let mut stream = client
            .subscribe(StreamingOperation::<MessagesSubscription>::new(
                messages_subscription::Variables,
            ))
            .await
            .context(OperationStartSnafu {
                stage: "subscribe-messages",
                operation: MESSAGES_OPERATION,
            })?;

        while let Some(item) = stream.next().await {
            let response = item.context(OperationStreamSnafu {
                stage: "read-feed-event",
                operation: MESSAGES_OPERATION,
            })?;

            if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
                return OperationRejectedSnafu {
                    stage: "feed-event-errors",
                    operation: MESSAGES_OPERATION,
                    details: join_graphql_errors(&errors),
                }
                .fail();
            }

            // Frames without data carry nothing renderable; skip them.
            let Some(data) = response.data else { continue };

            if event_tx
                .send(FeedEvent::Snapshot(snapshot_from_response(data)))
                .is_err()
            {
                // Consumer dropped the stream; nothing left to feed.
                return Ok(());
            }
        }

        Ok(())
    }

    async fn run_feed_worker(
        config: TransportConfig,
        shared: SharedClient,
        event_tx: mpsc::UnboundedSender<FeedEvent>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let mut attempt: u32 = 0;

        loop {
            let outcome = tokio::select! {
                _ = &mut cancel_rx => return,
                outcome = Self::pump_feed(&config, &shared, &event_tx) => outcome,
            };

            // Whatever ended the pump, the connection behind the shared
            // handle is no longer trustworthy.
            Self::drop_shared_client(&shared).await;

            let details = match outcome {
                Ok(()) => "server closed the message feed".to_string(),
                Err(error) => {
                    tracing::warn!(
                        endpoint = %config.endpoint,
                        error = %error,
                        "message feed interrupted"
                    );
                    error.to_string()
                }
            };

            if !config.reconnect {
                let _ = event_tx.send(FeedEvent::Closed {
                    details: Some(details),
                });
                return;
            }

            attempt = attempt.saturating_add(1);
            if event_tx
                .send(FeedEvent::Reconnecting { attempt, details })
                .is_err()
            {
                return;
            }

            tokio::select! {
                _ = &mut cancel_rx => return,
                _ = tokio::time::sleep(reconnect_delay(attempt)) => {}
            }
        }
    }
}

impl ChatTransport for GraphqlWsTransport {
    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn subscribe_messages(&self) -> FeedHandle {
        let (event_tx, stream, cancel_rx) = make_feed_stream();
        let worker: FeedWorker = Box::pin(Self::run_feed_worker(
            self.config.clone(),
            self.shared.clone(),
            event_tx,
            cancel_rx,
        ));

        FeedHandle { stream, worker }
    }

    fn post_message(
        &self,
        author: String,
        content: String,
    ) -> BoxFuture<'static, ClientResult<String>> {
        let config = self.config.clone();
        let shared = self.shared.clone();

        Box::pin(async move {
            let client = Self::acquire_client(&config, &shared).await?;

            // graphql-transport-ws carries one-shot operations as streams
            // that yield a single payload before completing.
            let operation = StreamingOperation::<PostMessage>::new(post_message::Variables {
                user: author,
                content,
            });
            let mut stream = client.subscribe(operation).await.context(OperationStartSnafu {
                stage: "post-message",
                operation: POST_MESSAGE_OPERATION,
            })?;

            let item = stream.next().await.context(EmptyResponseSnafu {
                stage: "post-message-response",
                operation: POST_MESSAGE_OPERATION,
            })?;
            let response = item.context(OperationStreamSnafu {
                stage: "read-post-response",
                operation: POST_MESSAGE_OPERATION,
            })?;

            if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
                return OperationRejectedSnafu {
                    stage: "post-response-errors",
                    operation: POST_MESSAGE_OPERATION,
                    details: join_graphql_errors(&errors),
                }
                .fail();
            }

            response
                .data
                .map(|data| data.post_message)
                .context(EmptyResponseSnafu {
                    stage: "post-message-payload",
                    operation: POST_MESSAGE_OPERATION,
                })
        })
    }
}

/// Builds the process-wide transport from config.
pub fn create_transport(config: TransportConfig) -> ClientResult<Arc<dyn ChatTransport>> {
    Ok(Arc::new(GraphqlWsTransport::new(config)?))
}

fn join_graphql_errors(errors: &[graphql_client::Error]) -> String {
    errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_doubles_until_the_cap() {
        assert_eq!(reconnect_delay(1), Duration::from_secs(1));
        assert_eq!(reconnect_delay(2), Duration::from_secs(2));
        assert_eq!(reconnect_delay(3), Duration::from_secs(4));
        assert_eq!(reconnect_delay(5), Duration::from_secs(16));
        assert_eq!(reconnect_delay(6), RECONNECT_MAX_DELAY);
        assert_eq!(reconnect_delay(u32::MAX), RECONNECT_MAX_DELAY);
    }

    #[test]
    fn reconnect_delay_is_monotonic() {
        let mut previous = Duration::ZERO;
        for attempt in 1..=10 {
            let delay = reconnect_delay(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn transport_rejects_an_empty_endpoint() {
        let result = GraphqlWsTransport::new(TransportConfig::new("  "));
        assert!(result.is_err());
    }

    #[test]
    fn transport_rejects_a_malformed_endpoint() {
        let result = GraphqlWsTransport::new(TransportConfig::new("not a url"));
        assert!(result.is_err());
    }

    #[test]
    fn transport_accepts_a_websocket_endpoint() {
        let transport = GraphqlWsTransport::new(TransportConfig::default()).unwrap();
        assert_eq!(transport.endpoint(), crate::config::DEFAULT_ENDPOINT);
    }
}
