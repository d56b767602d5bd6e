//! Per-connection ASTM stream handling
//!
//! Each accepted socket runs a small state machine: sniff the first bytes
//! for stray HTTP traffic, stream frames through the decoder, flush the
//! buffer when the peer goes idle, then close. The socket is dropped on
//! every exit path. Frames are dispatched strictly in arrival order, and
//! each successfully processed frame is answered with a single ACK byte;
//! a frame that fails processing is answered with silence. No NAK or
//! retransmission is part of this dialect.

use crate::processor::ResultProcessor;
use crate::AnalyzerResult;
use bytes::Bytes;
use labwire_codec::{FrameDecoder, ACK};
use labwire_config::AnalyzerConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Request-line prefixes that identify a browser or health check probing
/// the analyzer port.
const HTTP_PREFIXES: [&[u8]; 3] = [b"GET ", b"POST ", b"HTTP/"];

fn looks_like_http(data: &[u8]) -> bool {
    HTTP_PREFIXES.iter().any(|prefix| data.starts_with(prefix))
}

/// Drive one analyzer connection to completion.
pub(crate) async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: &AnalyzerConfig,
    running: Arc<AtomicBool>,
    processor: Arc<ResultProcessor>,
) -> AnalyzerResult<()> {
    // Sniffing: a non-consuming peek, so HTTP probes never enter the ASTM
    // path and never touch a lab-result document.
    let mut probe = [0u8; 16];
    match timeout(config.idle_timeout(), stream.peek(&mut probe)).await {
        Ok(Ok(n)) if looks_like_http(&probe[..n]) => {
            warn!(%peer, "ignoring HTTP request on analyzer port");
            return Ok(());
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            debug!(%peer, "connection idle before first byte, closing");
            return Ok(());
        }
    }

    let mut decoder = FrameDecoder::with_capacity(config.max_buffer_bytes);
    let mut chunk = vec![0u8; config.max_buffer_bytes];
    let mut frames = 0u64;

    // Streaming: read, reassemble, dispatch in order.
    while running.load(Ordering::SeqCst) {
        match timeout(config.idle_timeout(), stream.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                debug!(%peer, "peer closed connection");
                break;
            }
            Ok(Ok(n)) => {
                if looks_like_http(&chunk[..n]) {
                    warn!(%peer, "HTTP payload mid-stream, closing connection");
                    return Ok(());
                }
                decoder.extend(&chunk[..n]);
                while let Some(frame) = decoder.next_frame() {
                    dispatch_frame(&mut stream, peer, &frame, &processor, &mut frames).await;
                }
            }
            Ok(Err(e)) => {
                error!(%peer, error = %e, "receive failed");
                return Err(e.into());
            }
            Err(_) => {
                // Flushing: an instrument that never sent its closing
                // delimiter still gets its final transmission processed.
                if decoder.buffered() > 0 {
                    debug!(
                        %peer,
                        bytes = decoder.buffered(),
                        "receive timed out, flushing remaining buffer"
                    );
                    if let Some(frame) = decoder.flush() {
                        dispatch_frame(&mut stream, peer, &frame, &processor, &mut frames).await;
                    }
                } else {
                    debug!(%peer, "receive timed out with empty buffer");
                }
                break;
            }
        }
    }

    info!(%peer, frames, "analyzer connection closed");
    Ok(())
}

/// Process one frame and acknowledge it on success.
///
/// Failures are deliberately unacknowledged: the instrument sees silence,
/// and the operator finds the cause in the logs.
async fn dispatch_frame(
    stream: &mut TcpStream,
    peer: SocketAddr,
    frame: &Bytes,
    processor: &ResultProcessor,
    frames: &mut u64,
) {
    match processor.process_frame(frame).await {
        Ok(_) => {
            *frames += 1;
            if let Err(e) = stream.write_all(&[ACK]).await {
                warn!(%peer, error = %e, "failed to write ACK");
            }
        }
        Err(e) => {
            error!(%peer, error = %e, "failed to process frame");
        }
    }
}
