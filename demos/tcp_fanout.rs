//! TCP push server built on the subscriber registry
//!
//! Run with: cargo run --example tcp_fanout [BIND_ADDR]
//!
//! Every client that connects gets a welcome line, then one tick line per
//! second. Slow clients that fall more than the backlog behind lose ticks
//! instead of stalling the others.
//!
//! Try it with:
//!   nc localhost 7400

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use streamfan::{
    ChannelTransport, FinishStatus, Registry, RegistryConfig, SubscriberHandle, WriteEvent,
};

type LineRegistry = Registry<Bytes, ChannelTransport<Bytes>>;

#[tokio::main]
async fn main() -> streamfan::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,streamfan=debug".into()),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .as_deref()
        .map(|s| if s == "localhost" { "127.0.0.1:7400" } else { s })
        .unwrap_or("0.0.0.0:7400")
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let config = RegistryConfig::default().backlog_capacity(8);
    let registry = Arc::new(LineRegistry::with_config(config)?);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Fan-out server listening");

    let ticker = tokio::spawn(tick(Arc::clone(&registry)));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        result = accept_loop(&listener, &registry) => result?,
    }

    ticker.abort();
    registry.abort_all();

    // Give connection tasks a moment to flush their finish
    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!(remaining = registry.len(), stats = ?registry.stats(), "Stopped");

    Ok(())
}

async fn accept_loop(listener: &TcpListener, registry: &Arc<LineRegistry>) -> streamfan::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        socket.set_nodelay(true)?;

        let (transport, events) = ChannelTransport::new();
        let welcome = Bytes::from(format!("welcome {}\n", peer));
        let handle = registry.add_with_initial(
            transport,
            welcome,
            Some(Box::new(move || {
                tracing::info!(peer = %peer, "Client cancelled");
            })),
        );

        tracing::info!(peer = %peer, subscriber = %handle.id(), "Client connected");
        tokio::spawn(serve(socket, events, handle));
    }
}

/// Drive one connection: perform writes and report their outcome
async fn serve(
    mut socket: TcpStream,
    mut events: mpsc::UnboundedReceiver<WriteEvent<Bytes>>,
    handle: SubscriberHandle<Bytes, ChannelTransport<Bytes>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WriteEvent::InitialMetadata => {}
            WriteEvent::Write(line) => {
                let ok = socket.write_all(&line).await.is_ok();
                if !ok {
                    tracing::debug!(subscriber = %handle.id(), "Write failed");
                }
                handle.on_write_complete(ok);
            }
            WriteEvent::Finish(status) => {
                if status != FinishStatus::Ok {
                    let _ = socket
                        .write_all(format!("closing: {}\n", status).as_bytes())
                        .await;
                }
                break;
            }
        }
    }

    let _ = socket.shutdown().await;
    handle.on_done();
}

async fn tick(registry: Arc<LineRegistry>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut n = 0u64;
    loop {
        interval.tick().await;
        n += 1;
        let accepted = registry.broadcast(Bytes::from(format!("tick {}\n", n)));
        tracing::debug!(tick = n, accepted = accepted, members = registry.len(), "Broadcast");
    }
}
