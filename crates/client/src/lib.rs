pub mod config;
pub mod error;
pub mod feed;
pub mod operations;
pub mod transport;

pub use config::{DEFAULT_ENDPOINT, TransportConfig};
pub use error::{ClientError, ClientResult};
pub use feed::{BoxFuture, FeedEvent, FeedEventStream, FeedHandle, FeedMessage, FeedWorker};
pub use transport::{ChatTransport, GraphqlWsTransport, create_transport};
