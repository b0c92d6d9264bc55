use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_stream::{
    wrappers::{LinesStream, ReceiverStream},
    StreamExt,
};

use super::{
    errors::ApiError,
    gateway::{
        protocol::{ClientEvent, ServerEvent},
        Connected, Gateway,
    },
};

/// Accept clients forever, one task per connection
pub async fn serve(tcp_listener: TcpListener, gateway: Arc<Gateway>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = tcp_listener.accept().await?;
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { handle_connection(stream, peer, gateway).await });
    }
}

/// Read newline delimited events until the client goes away or is evicted
async fn handle_connection(stream: TcpStream, peer: SocketAddr, gateway: Arc<Gateway>) {
    let (read_half, write_half) = stream.into_split();
    let Connected {
        connection_id,
        events,
        evicted,
    } = gateway.connect();
    tracing::debug!(%connection_id, %peer, "client connected");

    let writer = tokio::spawn(write_events(write_half, events));
    let mut lines = LinesStream::new(BufReader::new(read_half).lines());
    let mut was_evicted = false;

    loop {
        let line = tokio::select! {
            line = lines.next() => line,
            _ = evicted.notified() => {
                was_evicted = true;
                None
            }
        };

        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(io_error)) => {
                tracing::debug!(%connection_id, ?io_error, "read failed");
                break;
            }
            None => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ClientEvent>(&line) {
            Ok(event) => gateway.handle(&connection_id, event).await,
            Err(parse_error) => gateway.reject(
                &connection_id,
                ApiError::BadRequest {
                    message: format!("Malformed event: {parse_error}"),
                },
            ),
        }
    }

    gateway.disconnect(&connection_id).await;

    // An evicted client is not reading, its writer may be stuck on a full socket
    if was_evicted {
        writer.abort();
        return;
    }

    // Dropping the channel ends the writer once it has flushed what is queued
    if let Err(join_error) = writer.await {
        tracing::error!(%connection_id, ?join_error, "writer task failed");
    }
}

async fn write_events(mut write_half: OwnedWriteHalf, receiver: mpsc::Receiver<ServerEvent>) {
    let mut events = ReceiverStream::new(receiver);

    while let Some(event) = events.next().await {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(serialize_error) => {
                tracing::error!(?serialize_error);
                continue;
            }
        };
        line.push('\n');

        if let Err(io_error) = write_half.write_all(line.as_bytes()).await {
            tracing::debug!(?io_error, "client stream closed");
            break;
        }
    }
}
