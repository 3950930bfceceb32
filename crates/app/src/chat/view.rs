use std::sync::Arc;

use banter_client::{ChatTransport, FeedEvent, FeedEventStream, FeedMessage};
use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;

use crate::chat::events::{ConnectionStatus, NameChanged, Submit};
use crate::chat::message::ChatMessage;
use crate::chat::{Composer, MessageList};

/// Parent coordinator for the composer/message-list pair and the shared
/// transport handle.
pub struct ChatView {
    transport: Arc<dyn ChatTransport>,
    message_list: Entity<MessageList>,
    composer: Entity<Composer>,
    connection_status: ConnectionStatus,
    feed_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    feed_reader_task: Option<Task<()>>,
}

impl ChatView {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        initial_name: &str,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(|cx| MessageList::new(initial_name, cx));
        let composer = cx.new(|cx| Composer::new(initial_name, window, cx));

        cx.subscribe(&composer, |this, _, event: &Submit, cx| {
            this.handle_submit(event.clone(), cx);
        })
        .detach();

        cx.subscribe(&composer, |this, _, event: &NameChanged, cx| {
            this.handle_name_changed(event, cx);
        })
        .detach();

        let mut this = Self {
            transport,
            message_list,
            composer,
            connection_status: ConnectionStatus::Connecting,
            feed_worker_task: None,
            feed_reader_task: None,
        };

        this.spawn_feed_pipeline(cx);
        this
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Starts the process-lifetime feed: transport IO runs on Tokio, the
    /// reader applies events on the UI thread in delivery order.
    fn spawn_feed_pipeline(&mut self, cx: &mut Context<Self>) {
        let handle = self.transport.subscribe_messages();
        self.feed_worker_task = Some(Tokio::spawn(cx, handle.worker));
        self.spawn_feed_reader(handle.stream, cx);
    }

    fn spawn_feed_reader(&mut self, mut stream: FeedEventStream, cx: &mut Context<Self>) {
        self.feed_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = stream.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.handle_feed_event(event, cx);
                });
            }
        }));
    }

    fn handle_feed_event(&mut self, event: FeedEvent, cx: &mut Context<Self>) {
        match event {
            FeedEvent::Snapshot(messages) => {
                self.connection_status = ConnectionStatus::Live;
                let snapshot = messages.into_iter().map(feed_message_to_chat).collect();
                self.message_list.update(cx, |list, cx| {
                    list.apply_snapshot(snapshot, cx);
                });
            }
            FeedEvent::Reconnecting { attempt, details } => {
                self.connection_status = ConnectionStatus::Reconnecting;
                tracing::info!(attempt, details = %details, "chat feed reconnecting");
            }
            FeedEvent::Closed { details } => {
                self.connection_status = ConnectionStatus::Closed;
                tracing::warn!(?details, "chat feed closed");
            }
        }

        cx.notify();
    }

    /// Fire-and-forget: the post neither blocks the composer nor reports
    /// back to it; the sent message only reappears via the feed.
    fn handle_submit(&mut self, event: Submit, cx: &mut Context<Self>) {
        let post = self.transport.post_message(event.author, event.content);

        Tokio::spawn(cx, async move {
            match post.await {
                Ok(ack) => tracing::debug!(ack = %ack, "message posted"),
                Err(error) => tracing::warn!(error = %error, "failed to post message"),
            }
        })
        .detach();
    }

    fn handle_name_changed(&mut self, event: &NameChanged, cx: &mut Context<Self>) {
        self.message_list.update(cx, |list, cx| {
            list.set_viewer_name(&event.name, cx);
        });
    }
}

/// Wire rows and domain rows are structurally identical today; the
/// mapping stays explicit so the crates can drift independently.
fn feed_message_to_chat(message: FeedMessage) -> ChatMessage {
    ChatMessage::new(message.id, message.author, message.content)
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-composer")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.composer.clone()),
            )
    }
}
