//! Native-messaging host.
//!
//! The browser starts `quickcal` with stdin/stdout wired to the extension.
//! Each request is answered with exactly one response, in order. The loop
//! ends when the browser closes stdin.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{Instrument, debug, info, info_span, warn};

use quickcal_protocol::{
    HEADER_LEN, ProtocolError, Request, Response, decode_payload, encode_message, payload_len,
};

use crate::error::ClientResult;
use crate::flow::EventFlow;

/// Serves requests on the process's stdin/stdout.
pub async fn run(flow: &EventFlow) -> ClientResult<()> {
    info!(timezone = flow.timezone().name(), "native-messaging host started");
    serve(flow, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serves framed requests from `reader` until end of stream.
pub async fn serve<R, W>(flow: &EventFlow, mut reader: R, mut writer: W) -> ClientResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut served = 0u64;

    loop {
        let Some(header) = read_header(&mut reader).await? else {
            info!(served, "browser closed the connection");
            return Ok(());
        };

        let len = match payload_len(header) {
            Ok(len) => len,
            Err(ProtocolError::EmptyMessage) => {
                warn!("ignoring empty frame");
                write_response(&mut writer, &Response::failure("empty message")).await?;
                continue;
            }
            Err(e) => {
                // The payload can't be skipped safely; report and stop.
                warn!("unreadable frame: {}", e);
                write_response(&mut writer, &Response::failure(e.to_string())).await?;
                return Err(e.into());
            }
        };

        let payload = read_payload(&mut reader, len).await?;

        served += 1;
        let response = match decode_payload::<Request>(&payload) {
            Ok(request) => {
                let span = info_span!("request", id = served, action = request.action());
                flow.handle(request).instrument(span).await
            }
            Err(e) => {
                warn!("undecodable request: {}", e);
                Response::failure(format!("invalid request: {e}"))
            }
        };

        write_response(&mut writer, &response).await?;
    }
}

/// Reads a length prefix, or `None` if the stream ended between frames.
async fn read_header<R: AsyncRead + Unpin>(reader: &mut R) -> ClientResult<Option<[u8; HEADER_LEN]>> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]).await {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ProtocolError::IncompleteMessage {
                    expected: HEADER_LEN,
                    received: filled,
                }
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(header))
}

/// Reads exactly `len` payload bytes.
async fn read_payload<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> ClientResult<Vec<u8>> {
    let mut payload = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut payload[filled..]).await {
            Ok(0) => {
                return Err(ProtocolError::IncompleteMessage {
                    expected: HEADER_LEN + len,
                    received: HEADER_LEN + filled,
                }
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(payload)
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> ClientResult<()> {
    let frame = match encode_message(response) {
        Ok(frame) => frame,
        Err(e @ ProtocolError::MessageTooLarge { .. }) => {
            warn!("response dropped: {}", e);
            encode_message(&Response::failure(e.to_string()))?
        }
        Err(e) => return Err(e.into()),
    };

    writer.write_all(&frame).await?;
    writer.flush().await?;
    debug!(bytes = frame.len(), success = response.success, "response sent");
    Ok(())
}
