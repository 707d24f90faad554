//! The native-messaging host loop.
//!
//! Frames are read from stdin on a blocking task and handed to the
//! [`MessageListener`] one at a time; events go out on stdout through a
//! [`PortMessenger`], addressed by tab URL pattern.

use std::io::{Read, Write};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use eventlens_protocol::{FrameReader, InboundFrame, ProtocolError};

use crate::config::RelaySettings;
use crate::error::BackgroundResult;
use crate::handler::MessageListener;
use crate::port::PortMessenger;
use crate::relay::{EventRelay, UrlPattern};
use crate::session::Session;

/// Inbound frames buffered between the reader task and the listener.
const INBOUND_QUEUE: usize = 32;

/// Runs the host until `input` reaches end of stream.
///
/// The calendar map is refreshed once on startup; a failure there is logged
/// and the host keeps serving with whatever map is stored.
///
/// Returns the number of frames handled.
pub async fn run<R, W>(
    session: Arc<Session>,
    relay: &RelaySettings,
    input: R,
    output: W,
) -> BackgroundResult<usize>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let pattern = UrlPattern::new(&relay.tab_url_pattern)?;
    let listener = MessageListener::new(
        session,
        EventRelay::new(
            Arc::new(PortMessenger::new(output)),
            pattern,
            relay.message.clone(),
        ),
    );

    match listener.session().refresh_calendars().await {
        Ok(calendars) => info!("calendar map ready ({} calendars)", calendars.len()),
        Err(e) => warn!(
            retryable = e.is_retryable(),
            "failed to refresh calendar list: {}", e
        ),
    }

    let (tx, mut rx) = mpsc::channel(INBOUND_QUEUE);
    let reader = tokio::task::spawn_blocking(move || read_frames(input, tx));

    let mut handled = 0;
    while let Some(frame) = rx.recv().await {
        if let Some(ref tab) = frame.sender.tab {
            debug!("frame from tab {}", tab.id);
        }
        let summary = listener.on_message(frame).await;
        debug!("handled frame: {:?}", summary);
        handled += 1;
    }

    if let Err(e) = reader.await {
        warn!("frame reader task failed: {}", e);
    }
    info!("input closed after {} frames, exiting", handled);
    Ok(handled)
}

/// Reads frames until end of stream or an unrecoverable error.
///
/// A frame whose JSON does not parse is skipped: its bytes were consumed, so
/// the stream is still aligned on the next length prefix.
fn read_frames<R: Read>(input: R, tx: mpsc::Sender<InboundFrame>) {
    let mut reader = FrameReader::new(input);
    loop {
        match reader.read_message::<InboundFrame>() {
            Ok(Some(frame)) => {
                if tx.blocking_send(frame).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e @ (ProtocolError::Serialization(_) | ProtocolError::EmptyMessage)) => {
                warn!("skipping malformed frame: {}", e);
            }
            Err(e) => {
                warn!("stopping on unreadable input: {}", e);
                return;
            }
        }
    }
}
