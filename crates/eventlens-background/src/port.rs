//! Native-messaging port to the browser extension.
//!
//! The host cannot see the browser's tabs. Each event goes out once as a
//! `{tabUrl, message}` frame; the extension runs the tab query for that URL
//! pattern and posts the message to every tab it returns.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use eventlens_protocol::{FrameWriter, OutboundFrame, OutboundMessage};

use crate::error::BackgroundResult;
use crate::relay::{BoxFuture, Delivery, TabDispatch, UrlPattern};

/// [`TabDispatch`] writing framed messages to the extension.
pub struct PortMessenger<W> {
    writer: Mutex<FrameWriter<W>>,
}

impl<W> std::fmt::Debug for PortMessenger<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortMessenger").finish_non_exhaustive()
    }
}

impl<W: Write> PortMessenger<W> {
    /// Creates a port writing to `writer` (stdout in production).
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(FrameWriter::new(writer)),
        }
    }

    fn write_frame(&self, frame: &OutboundFrame) -> BackgroundResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_message(frame)?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
    }
}

impl<W: Write + Send> TabDispatch for PortMessenger<W> {
    fn dispatch<'a>(
        &'a self,
        pattern: &'a UrlPattern,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, BackgroundResult<Delivery>> {
        Box::pin(async move {
            self.write_frame(&OutboundFrame::new(pattern.as_str(), message.clone()))?;
            debug!("forwarded {:?} for tabs matching {}", message.msg, pattern.as_str());
            Ok(Delivery::Forwarded)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventlens_core::Event;
    use eventlens_protocol::{FrameReader, MAX_MESSAGE_SIZE, ProtocolError};

    use crate::error::BackgroundError;

    fn calendar_pattern() -> UrlPattern {
        UrlPattern::new("https://calendar.google.com/calendar*").unwrap()
    }

    #[tokio::test]
    async fn one_frame_per_event_whatever_the_tab_count() {
        let port = PortMessenger::new(Vec::new());
        let pattern = calendar_pattern();
        let first = OutboundMessage::show_event(Event::new("evt1").with_description("notes"));
        let second = OutboundMessage::show_event(Event::new("evt2").with_description("more"));

        assert_eq!(
            port.dispatch(&pattern, &first).await.unwrap(),
            Delivery::Forwarded
        );
        port.dispatch(&pattern, &second).await.unwrap();

        let bytes = port.into_inner();
        let mut reader = FrameReader::new(bytes.as_slice());
        let frames: Vec<OutboundFrame> = std::iter::from_fn(|| reader.read_message().unwrap())
            .collect();
        assert_eq!(
            frames,
            vec![
                OutboundFrame::new("https://calendar.google.com/calendar*", first),
                OutboundFrame::new("https://calendar.google.com/calendar*", second),
            ]
        );
    }

    #[tokio::test]
    async fn oversized_event_is_an_error_and_writes_nothing() {
        let port = PortMessenger::new(Vec::new());
        let event = Event::new("big").with_description("x".repeat(MAX_MESSAGE_SIZE as usize));

        let err = port
            .dispatch(&calendar_pattern(), &OutboundMessage::show_event(event))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BackgroundError::Protocol(ProtocolError::MessageTooLarge { .. })
        ));
        assert!(port.into_inner().is_empty());
    }
}
