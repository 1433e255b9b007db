//! Per-stream protocol negotiation.
//!
//! The side that opens a stream proposes a protocol, the accepting side
//! confirms or refuses it:
//!
//! ```text
//! opener                        acceptor
//!   │  "/chat/1.0.0\n"             │
//!   │─────────────────────────────>│  lookup in HandlerRegistry
//!   │  "/chat/1.0.0\n"  or "na\n"  │
//!   │<─────────────────────────────│
//! ```
//!
//! Negotiation reads byte by byte without buffering, so nothing the peer
//! sends after the tag line is consumed here.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{HandlerRegistry, HostError, MAX_TAG_LEN, ProtocolTag, RawStream};

/// Reply sent when no handler exists for the proposed tag.
pub const REJECT: &str = "na";

/// Propose `tag` on a freshly opened stream and wait for the verdict.
pub async fn propose(stream: &mut RawStream, tag: &ProtocolTag) -> Result<(), HostError> {
    write_tag_line(&mut stream.writer, tag.as_str()).await?;

    let reply = read_tag_line(&mut stream.reader).await?;
    if reply == tag.as_str() {
        Ok(())
    } else if reply == REJECT {
        Err(HostError::ProtocolNotSupported(tag.to_string()))
    } else {
        Err(HostError::Negotiation(format!("unexpected reply '{reply}'")))
    }
}

/// Read the proposed tag from an inbound stream and dispatch it.
///
/// On success the stream is handed to the registered handler and the
/// negotiated tag is returned. Unknown tags are refused and the stream is
/// closed.
pub async fn accept(
    mut stream: RawStream,
    handlers: &HandlerRegistry,
) -> Result<ProtocolTag, HostError> {
    let requested = read_tag_line(&mut stream.reader).await?;

    let handler = ProtocolTag::new(requested.as_str())
        .ok()
        .and_then(|tag| handlers.get(&tag).map(|handler| (tag, handler)));

    let Some((tag, handler)) = handler else {
        write_tag_line(&mut stream.writer, REJECT).await?;
        if let Err(e) = stream.writer.shutdown().await {
            tracing::debug!("closing refused stream failed: {e}");
        }
        return Err(HostError::ProtocolNotSupported(requested));
    };

    write_tag_line(&mut stream.writer, tag.as_str()).await?;
    tracing::debug!(%tag, "negotiated inbound stream");
    handler(stream);

    Ok(tag)
}

async fn write_tag_line<W>(writer: &mut W, tag: &str) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut line = Vec::with_capacity(tag.len() + 1);
    line.extend_from_slice(tag.as_bytes());
    line.push(b'\n');

    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_tag_line<R>(reader: &mut R) -> Result<String, HostError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut line = Vec::new();

    loop {
        let mut byte = [0u8; 1];
        if reader.read(&mut byte).await? == 0 {
            return Err(HostError::Negotiation("stream closed during negotiation".to_string()));
        }
        if byte[0] == b'\n' {
            break;
        }
        if line.len() == MAX_TAG_LEN {
            return Err(HostError::Negotiation(format!("tag exceeds {MAX_TAG_LEN} bytes")));
        }
        line.push(byte[0]);
    }

    String::from_utf8(line)
        .map_err(|_| HostError::Negotiation("tag is not valid UTF-8".to_string()))
}
