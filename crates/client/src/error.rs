use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("chat endpoint '{endpoint}' is not a valid websocket URL"))]
    InvalidEndpoint {
        stage: &'static str,
        endpoint: String,
        source: async_tungstenite::tungstenite::Error,
    },
    #[snafu(display("chat endpoint is empty"))]
    EmptyEndpoint { stage: &'static str },
    #[snafu(display("failed to connect to '{endpoint}' on `{stage}`: {source}"))]
    Connect {
        stage: &'static str,
        endpoint: String,
        source: async_tungstenite::tungstenite::Error,
    },
    #[snafu(display("graphql-transport-ws handshake failed on `{stage}`: {source}"))]
    Handshake {
        stage: &'static str,
        source: graphql_ws_client::Error,
    },
    #[snafu(display("failed to start operation '{operation}' on `{stage}`: {source}"))]
    OperationStart {
        stage: &'static str,
        operation: &'static str,
        source: graphql_ws_client::Error,
    },
    #[snafu(display("operation '{operation}' stream failed on `{stage}`: {source}"))]
    OperationStream {
        stage: &'static str,
        operation: &'static str,
        source: graphql_ws_client::Error,
    },
    #[snafu(display("server rejected operation '{operation}': {details}"))]
    OperationRejected {
        stage: &'static str,
        operation: &'static str,
        details: String,
    },
    #[snafu(display("operation '{operation}' completed without a payload"))]
    EmptyResponse {
        stage: &'static str,
        operation: &'static str,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;
