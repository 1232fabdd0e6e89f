//! Push-channel transport.
//!
//! [`PushTransport`] opens one connection; [`PushChannel`] reads and writes
//! frames on it. Reconnection is not handled here: the connection manager
//! in `strmdeck-core` owns the lifecycle and decides when to open again.
//! [`WsTransport`] is the production implementation on top of
//! `tokio-tungstenite`; tests substitute scripted transports.
//!
//! # Example
//!
//! ```rust,ignore
//! use strmdeck_api::websocket::{PushFrame, PushTransport, WsTransport, push_url};
//! use url::Url;
//!
//! let base = Url::parse("http://nas.local:8000")?;
//! let transport = WsTransport::new(push_url(&base, "/ws")?);
//! let mut channel = transport.open().await?;
//!
//! while let Some(Ok(PushFrame::Text(text))) = channel.next_frame().await {
//!     println!("{text}");
//! }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;

// ── Frames ───────────────────────────────────────────────────────────

/// A frame surfaced to the reader. Control frames stay inside the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    Text(String),
    /// The peer sent a close frame (code 1005 when it carried no payload).
    Close { code: u16, reason: String },
}

// ── Traits ───────────────────────────────────────────────────────────

/// One open push connection.
#[async_trait]
pub trait PushChannel: Send {
    /// Next data or close frame. `None` when the stream ended without a
    /// close frame; `Some(Err(_))` on a protocol or I/O failure.
    async fn next_frame(&mut self) -> Option<Result<PushFrame, Error>>;

    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), Error>;

    /// Start the closing handshake. Idempotent.
    async fn close(&mut self) -> Result<(), Error>;
}

/// Factory for push connections.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PushChannel>, Error>;
}

// ── URL derivation ───────────────────────────────────────────────────

/// Derive the push URL from the command base URL: `http → ws`,
/// `https → wss`, path replaced by `path`.
pub fn push_url(base: &Url, path: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive push URL from {base}")))?;

    let prefix = base.path().trim_end_matches('/');
    let suffix = path.trim_start_matches('/');
    url.set_path(&format!("{prefix}/{suffix}"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// ── WebSocket implementation ─────────────────────────────────────────

/// Opens `tokio-tungstenite` connections to a fixed URL.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl PushTransport for WsTransport {
    async fn open(&self) -> Result<Box<dyn PushChannel>, Error> {
        tracing::info!(url = %self.url, "connecting push channel");

        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::debug!("push channel handshake complete");
        Ok(Box::new(WsChannel { stream }))
    }
}

struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn next_frame(&mut self) -> Option<Result<PushFrame, Error>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(Ok(PushFrame::Text(text.as_str().to_owned())));
                }
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(PushFrame::Text(text))),
                    Err(_) => tracing::debug!(len = bytes.len(), "ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame.map_or((1005, String::new()), |cf| {
                        (u16::from(cf.code), cf.reason.as_str().to_owned())
                    });
                    tracing::info!(code, reason = %reason, "push channel close frame received");
                    return Some(Ok(PushFrame::Close { code, reason }));
                }
                // tungstenite answers pings itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(Error::WebSocketConnect(e.to_string()))),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), Error> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), Error> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(Error::WebSocketConnect(e.to_string())),
        }
    }
}
