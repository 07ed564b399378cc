//! Hub subscriber client
//!
//! High-level API for receiving broadcasts from a hub server.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::LEAVE_PAYLOAD;

use super::config::ClientConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events from the hub client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A text payload arrived from the server
    Message(String),

    /// Shutdown requested, leave notification on its way
    Leaving,

    /// The read loop has finished
    Disconnected,
}

/// How the client's session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// Shutdown requested and leave sent (or attempted)
    Left,
    /// Read loop did not finish within `leave_timeout` after shutdown
    LeaveTimedOut,
    /// Server closed the connection
    ServerClosed,
    /// Reading from the server failed
    ReadFailed,
}

/// Hub subscriber
///
/// # Example
/// ```no_run
/// use ws_hub::client::{ClientConfig, HubClient};
///
/// # async fn example() -> ws_hub::error::Result<()> {
/// let (client, mut events) = HubClient::connect(ClientConfig::new("localhost:8080")).await?;
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// client.run_until(ws_hub::shutdown::shutdown_signal()).await;
/// # Ok(())
/// # }
/// ```
pub struct HubClient {
    config: ClientConfig,
    stream: WsStream,
    event_tx: mpsc::Sender<ClientEvent>,
}

impl HubClient {
    /// Connect to the server
    ///
    /// Returns the client and a receiver for events. A failed handshake is
    /// returned as [`Error::Handshake`]; there is no retry.
    pub async fn connect(config: ClientConfig) -> Result<(Self, mpsc::Receiver<ClientEvent>)> {
        let url = config.url();
        tracing::info!(url = %url, "Connecting");

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Handshake(Box::new(e)))?;
        tracing::info!(url = %url, "Connected");

        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let client = Self {
            config,
            stream,
            event_tx: tx,
        };

        Ok((client, rx))
    }

    /// Read until the server goes away or `shutdown` resolves
    ///
    /// On shutdown the read loop sends `"leave"` once, closes the socket and
    /// stops. Either way the session ends when the read loop finishes, and
    /// this returns within `leave_timeout` of `shutdown` resolving.
    pub async fn run_until<F>(self, shutdown: F) -> ClientExit
    where
        F: std::future::Future<Output = ()>,
    {
        let HubClient {
            config,
            stream,
            event_tx,
        } = self;

        let cancel = CancellationToken::new();
        let mut reader = tokio::spawn(read_loop(stream, cancel.clone(), event_tx.clone()));
        tokio::pin!(shutdown);

        let joined = tokio::select! {
            result = &mut reader => result,
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, leaving");
                if let Err(mpsc::error::TrySendError::Full(_)) =
                    event_tx.try_send(ClientEvent::Leaving)
                {
                    tracing::debug!("Event channel full, dropping leaving event");
                }
                cancel.cancel();

                match tokio::time::timeout(config.leave_timeout, &mut reader).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!("Read loop did not finish in time, aborting");
                        reader.abort();
                        Ok(ClientExit::LeaveTimedOut)
                    }
                }
            }
        };

        let exit = joined.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Read loop task failed");
            ClientExit::ReadFailed
        });

        let _ = event_tx.try_send(ClientEvent::Disconnected);
        tracing::info!(exit = ?exit, "Client finished");
        exit
    }
}

async fn read_loop(
    mut stream: WsStream,
    cancel: CancellationToken,
    events: mpsc::Sender<ClientEvent>,
) -> ClientExit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = stream.send(Message::text(LEAVE_PAYLOAD)).await {
                    tracing::warn!(error = %e, "Failed to send leave");
                }
                if let Err(e) = stream.close(None).await {
                    tracing::debug!(error = %e, "Close after leave failed");
                }
                tracing::info!("Read loop finished");
                return ClientExit::Left;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::info!(payload = text.as_str(), "Received");
                    if let Err(mpsc::error::TrySendError::Full(_)) =
                        events.try_send(ClientEvent::Message(text.to_string()))
                    {
                        tracing::debug!("Event channel full, dropping message");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(frame = ?frame, "Server closed connection");
                    return ClientExit::ServerClosed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to read");
                    return ClientExit::ReadFailed;
                }
                None => {
                    tracing::info!("Server stream ended");
                    return ClientExit::ServerClosed;
                }
            }
        }
    }
}
