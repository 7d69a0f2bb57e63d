/// Session driver: interactive input loop, send path, and receive loop
use crate::{console::Console, display, net::ChatSockets};
use anyhow::Result;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use mcast_protocol::{ChatCodec, ChatMessage, Error as ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::UdpSocket,
    signal,
    sync::mpsc,
};
use tokio_util::{sync::CancellationToken, udp::UdpFramed};

/// Messages queued between the receive loop and the display sink; a full
/// channel stalls further reads, which preserves arrival order.
const DELIVERY_DEPTH: usize = 32;

/// Stable identity of one running session.
///
/// The id tells this session's own messages apart from everyone else's on
/// the group. It identifies a process instance, not a person, and is never
/// persisted.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

impl Identity {
    pub fn generate(name: impl Into<String>) -> Self {
        Self {
            id: hex::encode(rand::random::<[u8; 8]>()),
            name: name.into(),
        }
    }
}

/// Run the session until stdin ends or the user interrupts.
///
/// Two tasks run alongside the input loop: the receive loop and the display
/// sink, linked by the delivery channel. Cancelling the token stops the
/// receive loop, which drops its channel sender and lets the sink drain to
/// completion, so shutdown leaves no task behind.
pub async fn run(sockets: ChatSockets, identity: Identity, console: Arc<Console>) -> Result<()> {
    let ChatSockets { recv, send, dest } = sockets;
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(DELIVERY_DEPTH);

    let receiver = tokio::spawn(receive_loop(recv, tx, cancel.clone()));
    let sink = tokio::spawn(display::run(rx, identity.id.clone(), Arc::clone(&console)));

    let mut writer = UdpFramed::new(send, ChatCodec);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        console.prompt();
                    } else {
                        send_line(&mut writer, dest, &identity, text, &console).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    console.warn(format_args!("input error: {e}"));
                    break;
                }
            },
            _ = signal::ctrl_c() => break,
        }
    }

    cancel.cancel();
    let _ = receiver.await;
    let _ = sink.await;

    console.farewell();
    Ok(())
}

/// Turn one line of input into one outbound datagram. Every failure is
/// reported and dropped; the session always continues.
async fn send_line(
    writer: &mut UdpFramed<ChatCodec>,
    dest: SocketAddr,
    identity: &Identity,
    text: &str,
    console: &Console,
) {
    let sent_at = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let msg = ChatMessage::new(identity.id.as_str(), identity.name.as_str(), text, sent_at);
    match writer.send((msg, dest)).await {
        Ok(()) => console.prompt(),
        Err(ProtocolError::Io(e)) => console.error(format_args!("failed to send message: {e}")),
        Err(e) => console.error(e),
    }
}

/// Pull datagrams off the joined socket until cancelled or the socket fails,
/// forwarding decoded messages to the display sink.
async fn receive_loop(socket: UdpSocket, tx: mpsc::Sender<ChatMessage>, cancel: CancellationToken) {
    let mut frames = UdpFramed::new(socket, ChatCodec);
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = frames.next() => item,
        };
        match item {
            Some(Ok((mut msg, _from))) => {
                msg.trim_body();
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
            // The group may carry non-conforming traffic; drop it silently.
            Some(Err(e)) if !e.is_fatal_to_receive() => {
                tracing::debug!("dropping malformed datagram: {e}");
            }
            Some(Err(e)) => {
                tracing::debug!("receive socket error: {e}");
                break;
            }
            None => break,
        }
    }
}
