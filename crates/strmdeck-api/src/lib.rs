// strmdeck-api: wire layer for the STRM Poller service (command surface + push channel)

pub mod command;
pub mod error;
pub mod models;
pub mod push;
pub mod routes;
pub mod transport;
pub mod websocket;

pub use command::{CommandClient, CommandRequest};
pub use error::Error;
pub use push::{EventKind, PushEvent};
pub use transport::TransportConfig;
pub use websocket::{PushChannel, PushFrame, PushTransport, WsTransport};
