/// Composer draft model and input component.
pub mod composer;
/// Event contracts for chat module wiring.
pub mod events;
/// Domain entities: messages, viewer identity, feed phases.
pub mod message;
pub mod message_list;
pub mod view;

pub use composer::{Composer, Draft};
pub use events::{ConnectionStatus, NameChanged, Submit};
pub use message::{ChatMessage, FeedPhase, RowAlignment, Viewer, avatar_label};
pub use message_list::MessageList;
pub use view::ChatView;
