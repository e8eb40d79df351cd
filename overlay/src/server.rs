//! Loopback listener for finder messages
//!
//! A dedicated acceptor thread takes one message per connection and forwards
//! it to the event loop over the bounded command channel. Malformed input is
//! logged and dropped; it never stops the listener.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;

use clipqa_core::ShutdownFlag;
use clipqa_core::ipc::{self, WireMessage};
use thiserror::Error;

use crate::app::OverlayCommand;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("listener setup failed: {0}")]
    Io(#[from] io::Error),
}

pub struct PayloadServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl PayloadServer {
    /// Bind `127.0.0.1:port`. Port 0 picks a free port.
    pub fn bind(port: u16) -> Result<Self, ServerError> {
        let addr = ipc::overlay_addr(port);
        let listener = TcpListener::bind(addr).map_err(|e| ServerError::Bind { addr, source: e })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "Listening for finder messages");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept connections until `shutdown` is set or the loop hangs up
    pub fn spawn(self, tx: Sender<OverlayCommand>, shutdown: ShutdownFlag) -> JoinHandle<()> {
        thread::spawn(move || {
            while !shutdown.is_requested() {
                match self.listener.accept() {
                    Ok((stream, peer)) => {
                        if !handle_connection(stream, peer, &tx) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                }
            }
            tracing::debug!("Payload listener stopped");
        })
    }
}

/// Read one message and forward it. Returns false once the receiver is gone.
fn handle_connection(stream: TcpStream, peer: SocketAddr, tx: &Sender<OverlayCommand>) -> bool {
    if let Err(e) = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(ipc::IO_TIMEOUT)))
    {
        tracing::warn!(%peer, error = %e, "Failed to configure connection");
        return true;
    }

    let message = match ipc::read_message(&stream) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "Dropping malformed message");
            return true;
        }
    };

    let command = match message {
        WireMessage::Show(payload) => OverlayCommand::Show(payload),
        WireMessage::Hide => OverlayCommand::Hide,
        WireMessage::Ping => {
            tracing::trace!(%peer, "Ping");
            return true;
        }
    };

    match tx.try_send(command) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Overlay command queue full, dropping message");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipqa_core::OverlayPayload;
    use std::io::Write;
    use std::time::Instant;
    use tokio::sync::mpsc;

    fn recv_within(rx: &mut mpsc::Receiver<OverlayCommand>, timeout: Duration) -> Option<OverlayCommand> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(cmd) = rx.try_recv() {
                return Some(cmd);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_messages_are_forwarded() {
        let server = PayloadServer::bind(0).unwrap();
        let addr = server.local_addr();
        let (tx, mut rx) = mpsc::channel(32);
        let shutdown = ShutdownFlag::new();
        let handle = server.spawn(tx, shutdown.clone());

        let payload = OverlayPayload {
            question: "capital of france".to_string(),
            answers: vec!["Paris".to_string()],
        };
        ipc::send_message(addr, &WireMessage::Ping, ipc::IO_TIMEOUT).unwrap();
        ipc::send_message(addr, &WireMessage::Show(payload.clone()), ipc::IO_TIMEOUT).unwrap();
        ipc::send_message(addr, &WireMessage::Hide, ipc::IO_TIMEOUT).unwrap();

        let first = recv_within(&mut rx, Duration::from_secs(2));
        assert!(matches!(first, Some(OverlayCommand::Show(p)) if p == payload));
        let second = recv_within(&mut rx, Duration::from_secs(2));
        assert!(matches!(second, Some(OverlayCommand::Hide)));

        shutdown.request();
        handle.join().unwrap();
    }

    #[test]
    fn test_malformed_input_keeps_listener_alive() {
        let server = PayloadServer::bind(0).unwrap();
        let addr = server.local_addr();
        let (tx, mut rx) = mpsc::channel(32);
        let shutdown = ShutdownFlag::new();
        let handle = server.spawn(tx, shutdown.clone());

        {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"{\"kind\":\"explode\"}\n").unwrap();
        }
        {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"garbage without newline").unwrap();
        }
        ipc::send_message(addr, &WireMessage::Hide, ipc::IO_TIMEOUT).unwrap();

        let cmd = recv_within(&mut rx, Duration::from_secs(3));
        assert!(matches!(cmd, Some(OverlayCommand::Hide)));

        shutdown.request();
        handle.join().unwrap();
    }

    #[test]
    fn test_port_in_use_is_bind_error() {
        let first = PayloadServer::bind(0).unwrap();
        let err = PayloadServer::bind(first.local_addr().port()).err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
