//! Background readers for child stdout (protocol) and stderr (diagnostics)

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

use crate::message::parser::{InboundEvent, parse_line};
use crate::provider::Sentinel;

use super::codec::JsonLineCodec;
use super::phase::PhaseCell;

/// Last diagnostic text seen from a child (stderr line or error event)
pub type LastError = Arc<Mutex<Option<String>>>;

/// Where the stdout reader delivers what it parses
pub(super) struct EventSink {
    pub text_tx: mpsc::UnboundedSender<String>,
    pub ready_tx: watch::Sender<bool>,
    pub last_error: LastError,
    pub phase: PhaseCell,
    pub label: String,
}

/// Spawn the protocol reader
///
/// Runs until stdout reaches EOF or fails. Dropping `text_tx` on exit closes
/// the text queue, which is how a waiting `generate` learns the child is gone.
pub(super) fn spawn_stdout_reader(
    stdout: ChildStdout,
    max_line_length: usize,
    sink: EventSink,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = FramedRead::new(stdout, JsonLineCodec::new(max_line_length));

        while let Some(next) = lines.next().await {
            let line = match next {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("[{}] stdout read failed: {}", sink.label, e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let text = match parse_line(line) {
                Ok(InboundEvent::Ready) => {
                    log::debug!("[{}] child ready", sink.label);
                    sink.ready_tx.send_replace(true);
                    sink.phase.mark_ready();
                    continue;
                }
                Ok(InboundEvent::AssistantFull(text) | InboundEvent::AssistantDelta(text)) => text,
                Ok(InboundEvent::Error(message)) => {
                    log::warn!("[{}] child reported error: {}", sink.label, message);
                    *sink.last_error.lock() = Some(message.clone());
                    Sentinel::ErrorEvent(message).to_string()
                }
                Ok(InboundEvent::Unrecognized) => continue,
                Err(e) => {
                    log::trace!("[{}] skipping malformed line: {}", sink.label, e);
                    continue;
                }
            };

            if text.is_empty() {
                continue;
            }
            if sink.text_tx.send(text).is_err() {
                // Session dropped, stop reading
                break;
            }
        }

        log::debug!("[{}] stdout closed", sink.label);
    })
}

/// Spawn the diagnostic reader
///
/// Stderr is never parsed as protocol; each non-empty line replaces the
/// stored last error.
pub(super) fn spawn_stderr_reader(
    stderr: ChildStderr,
    max_line_length: usize,
    last_error: LastError,
    label: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = FramedRead::new(stderr, JsonLineCodec::new(max_line_length));

        while let Some(Ok(line)) = lines.next().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            log::debug!("[{label}] stderr: {line}");
            *last_error.lock() = Some(line.to_string());
        }
    })
}
