//! The single client connection.
//!
//! Owns both halves of the socket: the read loop drives decoded lines
//! through the dispatcher, and one writer task drains the line queue - the
//! only path to the wire, so concurrent producers (dispatcher and Telegram
//! event pump) can never interleave partial lines.
//!
//! Any socket-level failure here is fatal to the whole process. There is
//! one client and no reconnect; the error propagates to `main`.

use crate::cache::Roster;
use crate::config::FeatureFlags;
use crate::error::BridgeError;
use crate::handlers::{self, Context, Dispatch};
use crate::session::Session;
use crate::telegram::Messenger;
use crate::translate::Translator;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tgbridge_proto::{LineCodec, ProtocolError, TokenLine};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

/// Writer queue depth: enough for a greeting burst without stalling the
/// read loop.
const WRITER_QUEUE_DEPTH: usize = 64;

/// Long-poll timeout handed to Telegram.
const POLL_TIMEOUT_SECS: u64 = 25;

/// Pause after a failed poll before retrying.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// One accepted client socket plus the shared bridge state it drives.
pub struct Connection {
    stream: TcpStream,
    roster: Arc<Roster>,
    flags: FeatureFlags,
    messenger: Arc<dyn Messenger>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        roster: Arc<Roster>,
        flags: FeatureFlags,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            stream,
            roster,
            flags,
            messenger,
        }
    }

    /// Run until the socket fails.
    ///
    /// Always returns an error: with a single client and no reconnect,
    /// stream end is process end. Undecodable lines are the one exception
    /// handled in place - each costs only itself.
    pub async fn run(self) -> Result<(), BridgeError> {
        let (read_half, write_half) = self.stream.into_split();

        let (tx, rx) = mpsc::channel::<String>(WRITER_QUEUE_DEPTH);
        let mut writer = tokio::spawn(write_loop(
            FramedWrite::new(write_half, LineCodec::new()),
            rx,
        ));

        let translator = Arc::new(Translator::new(
            Arc::clone(&self.roster),
            self.flags,
            Arc::clone(&self.messenger),
            tx.clone(),
        ));

        let mut framed = FramedRead::new(read_half, LineCodec::new());
        let mut session = Session::new();
        let mut pump: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                next = framed.next() => {
                    let Some(next) = next else {
                        return Err(BridgeError::Socket(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "client closed the connection",
                        )));
                    };
                    let raw = match next {
                        Ok(raw) => raw,
                        Err(e) if e.is_recoverable() => {
                            warn!(error = %e, "Could not decode a line from IRC, dropping it");
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    };
                    let Some(line) = TokenLine::parse(&raw) else {
                        continue;
                    };

                    let mut ctx = Context {
                        session: &mut session,
                        roster: &self.roster,
                        flags: self.flags,
                        writer: &tx,
                        translator: &translator,
                    };
                    match handlers::dispatch(&mut ctx, &line).await? {
                        Dispatch::Handled => {}
                        Dispatch::Welcomed => {
                            if pump.is_none() {
                                info!("Starting Telegram event pump");
                                pump = Some(spawn_event_pump(
                                    Arc::clone(&self.messenger),
                                    Arc::clone(&translator),
                                ));
                            }
                        }
                    }
                }
                finished = &mut writer => {
                    return Err(match finished {
                        Ok(Err(e)) => e.into(),
                        Ok(Ok(())) => BridgeError::WriterClosed,
                        Err(join_err) => BridgeError::Socket(std::io::Error::other(join_err)),
                    });
                }
            }
        }
    }
}

/// The single socket writer: every outbound line funnels through here.
async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, LineCodec>,
    mut rx: mpsc::Receiver<String>,
) -> Result<(), ProtocolError> {
    while let Some(line) = rx.recv().await {
        sink.send(line).await?;
    }
    Ok(())
}

/// Long-poll Telegram and feed events through the translator.
///
/// Started exactly once, on the welcome transition. Poll failures are
/// transient: logged and retried after a short pause. Only the writer queue
/// going away stops the pump - and that means the process is dying anyway.
fn spawn_event_pump(messenger: Arc<dyn Messenger>, translator: Arc<Translator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Telegram interface polling, link established");
        let mut offset = 0i64;
        loop {
            match messenger.poll_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok((next_offset, events)) => {
                    offset = next_offset;
                    for event in events {
                        if let Err(e) = translator.deliver_event(&event).await {
                            error!(error = %e, "Event pump stopping");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Telegram poll failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    })
}
