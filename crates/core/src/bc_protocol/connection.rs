use crate::bc::codex::BcCodex;
use crate::bc::model::*;
use crate::{Error, Result};
use futures::sink::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;

type BcConnSink = SplitSink<Framed<TcpStream, BcCodex>, Bc>;

#[derive(Debug)]
struct Pending {
    msg_id: u32,
    reply: oneshot::Sender<Result<Bc>>,
}

/// A single TCP connection to a camera
///
/// Only one request can wait for its reply at a time. Every received frame is matched against
/// that request by its message id, anything else was pushed by the camera and is dropped.
pub(crate) struct BcConnection {
    host: String,
    sink: BcConnSink,
    pending: Arc<Mutex<Option<Pending>>>,
    closed: Arc<AtomicBool>,
    #[allow(dead_code)] // Not dead we just need to hold a reference to keep it alive
    rx_thread: JoinSet<()>,
}

impl BcConnection {
    pub(crate) async fn connect(host: &str, port: u16) -> Result<BcConnection> {
        let stream = match crate::bc_timeout(TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::ConnectionError {
                    host: host.to_string(),
                    why: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::ConnectionError {
                    host: host.to_string(),
                    why: "timeout while connecting".to_string(),
                })
            }
        };
        debug!("Baichuan host {}: opened connection", host);

        let (sink, mut source) = Framed::new(stream, BcCodex::new()).split();
        let pending: Arc<Mutex<Option<Pending>>> = Default::default();
        let closed: Arc<AtomicBool> = Default::default();

        let mut rx_thread = JoinSet::new();
        let rx_pending = pending.clone();
        let rx_closed = closed.clone();
        let rx_host = host.to_string();
        rx_thread.spawn(async move {
            loop {
                match source.next().await {
                    Some(Ok(bc)) => Self::poll(&rx_host, bc, &rx_pending),
                    Some(Err(e)) => {
                        error!("Baichuan host {}: deserialization error: {}", rx_host, e);
                        if let Some(waiting) = take_pending(&rx_pending) {
                            let _ = waiting.reply.send(Err(Error::UnexpectedData {
                                host: rx_host.clone(),
                                why: format!("received an invalid frame: {}", e),
                            }));
                        }
                        break;
                    }
                    None => {
                        if let Some(waiting) = take_pending(&rx_pending) {
                            let _ = waiting.reply.send(Err(Error::ConnectionError {
                                host: rx_host.clone(),
                                why: format!(
                                    "lost connection while waiting for cmd_id {}",
                                    waiting.msg_id
                                ),
                            }));
                        }
                        break;
                    }
                }
            }
            rx_closed.store(true, Ordering::SeqCst);
            debug!("Baichuan host {}: closed connection", rx_host);
        });

        Ok(BcConnection {
            host: host.to_string(),
            sink,
            pending,
            closed,
            rx_thread,
        })
    }

    fn poll(host: &str, bc: Bc, pending: &Mutex<Option<Pending>>) {
        let msg_id = bc.header.msg_id;
        let mut slot = match pending.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.as_ref().map(|p| p.msg_id) {
            Some(expected) if expected == msg_id => {
                if let Some(waiting) = slot.take() {
                    let _ = waiting.reply.send(Ok(bc));
                }
            }
            Some(expected) => {
                debug!(
                    "Baichuan host {}: received unrequested message with cmd_id {}, while waiting on cmd_id {}, ignoring",
                    host, msg_id, expected
                );
            }
            None => {
                debug!(
                    "Baichuan host {}: received unrequested message with cmd_id {}, ignoring",
                    host, msg_id
                );
                trace!("Contents: {:?}", bc);
            }
        }
    }

    /// Claims the reply slot for `msg_id`
    ///
    /// Fails if another request is still waiting for its reply. The slot is freed when the
    /// returned [`PendingReply`] is dropped.
    pub(crate) fn expect_reply(&self, msg_id: u32) -> Result<PendingReply> {
        let mut slot = match self.pending.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return Err(Error::SimultaneousRequest {
                host: self.host.clone(),
                cmd_id: msg_id,
            });
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(Pending { msg_id, reply: tx });
        Ok(PendingReply {
            host: self.host.clone(),
            msg_id,
            pending: self.pending.clone(),
            closed: self.closed.clone(),
            reply: rx,
            answered: false,
        })
    }

    pub(crate) async fn send(&mut self, bc: Bc) -> Result<()> {
        trace!("send Wait: {:?}", bc.header);
        self.sink.send(bc).await?;
        trace!("send Complete");
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) async fn close(mut self) {
        if let Err(e) = self.sink.close().await {
            debug!(
                "Baichuan host {}: connection already reset when trying to close: {}",
                self.host, e
            );
        }
        self.rx_thread.shutdown().await;
    }
}

/// The claimed reply slot of a single request
///
/// Dropping it frees the slot. If that happens before the reply arrived, e.g. because the
/// caller was cancelled mid write, the connection is marked closed so it gets replaced.
#[derive(Debug)]
pub(crate) struct PendingReply {
    host: String,
    msg_id: u32,
    pending: Arc<Mutex<Option<Pending>>>,
    closed: Arc<AtomicBool>,
    reply: oneshot::Receiver<Result<Bc>>,
    answered: bool,
}

impl PendingReply {
    pub(crate) async fn recv(&mut self) -> Result<Bc> {
        let result = match (&mut self.reply).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectionError {
                host: self.host.clone(),
                why: format!("lost connection while waiting for cmd_id {}", self.msg_id),
            }),
        };
        self.answered = true;
        result
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        take_pending(&self.pending);
        if !self.answered {
            debug!(
                "Baichuan host {}: gave up waiting for cmd_id {}, dropping the connection",
                self.host, self.msg_id
            );
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}

fn take_pending(pending: &Mutex<Option<Pending>>) -> Option<Pending> {
    match pending.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_second_request_while_pending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move { listener.accept().await.unwrap() });

        let connection = BcConnection::connect("127.0.0.1", port).await.unwrap();
        let _socket = server.await.unwrap();

        let first = connection.expect_reply(MSG_ID_GET_PORTS).unwrap();
        assert_matches!(
            connection.expect_reply(MSG_ID_DEVICE_INFO),
            Err(Error::SimultaneousRequest { cmd_id: 80, .. })
        );

        drop(first);
        assert!(connection.expect_reply(MSG_ID_DEVICE_INFO).is_ok());
        // Abandoned without a reply
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_connection_lost_fails_pending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move { listener.accept().await.unwrap() });

        let connection = BcConnection::connect("127.0.0.1", port).await.unwrap();
        let mut reply = connection.expect_reply(MSG_ID_GET_PORTS).unwrap();
        let (socket, _) = server.await.unwrap();
        drop(socket);

        assert_matches!(reply.recv().await, Err(Error::ConnectionError { .. }));
    }
}
