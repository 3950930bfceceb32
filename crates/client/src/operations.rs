use graphql_client::GraphQLQuery;

use crate::feed::FeedMessage;

/// Server-pushed full snapshots of the message list. The server re-sends
/// the whole list on every change; there are no filter parameters.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "src/graphql/schema.graphql",
    query_path = "src/graphql/operations.graphql",
    response_derives = "Debug, Clone, PartialEq, Eq"
)]
pub struct MessagesSubscription;

/// One-shot write returning the new message id as acknowledgement.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "src/graphql/schema.graphql",
    query_path = "src/graphql/operations.graphql",
    response_derives = "Debug, Clone, PartialEq, Eq"
)]
pub struct PostMessage;

/// Maps one subscription payload onto the wire-agnostic feed model,
/// preserving delivery order.
pub(crate) fn snapshot_from_response(
    data: messages_subscription::ResponseData,
) -> Vec<FeedMessage> {
    data.messages
        .into_iter()
        .map(|row| FeedMessage::new(row.id, row.user, row.content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::messages_subscription::{MessagesSubscriptionMessages, ResponseData};
    use super::*;

    fn row(id: &str, user: &str, content: &str) -> MessagesSubscriptionMessages {
        MessagesSubscriptionMessages {
            id: id.to_string(),
            user: user.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn snapshot_mapping_preserves_delivery_order() {
        let data = ResponseData {
            messages: vec![row("1", "A", "hello"), row("2", "B", "hi")],
        };

        let snapshot = snapshot_from_response(data);
        assert_eq!(
            snapshot,
            vec![
                FeedMessage::new("1", "A", "hello"),
                FeedMessage::new("2", "B", "hi"),
            ]
        );
    }

    #[test]
    fn empty_payload_maps_to_empty_snapshot() {
        let data = ResponseData { messages: vec![] };
        assert!(snapshot_from_response(data).is_empty());
    }
}
