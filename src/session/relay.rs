use std::io;

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::docker::{CancelToken, EngineError};

const RELAY_BUFFER: usize = 1024;

/// Copy local input into the container until EOF, an error, or `cancel`.
///
/// The writer is handed back so its owner decides when to close it.
pub async fn relay_input<R, W>(mut reader: R, mut writer: W, cancel: CancelToken) -> (W, io::Result<u64>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; RELAY_BUFFER];
    let mut total = 0u64;

    let result = loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => break Ok(total),
            read = reader.read(&mut buf) => match read {
                Ok(0) => break Ok(total),
                Ok(n) => n,
                Err(e) => break Err(e),
            },
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            break Err(e);
        }
        if let Err(e) = writer.flush().await {
            break Err(e);
        }
        total += n as u64;
    };

    (writer, result)
}

/// Copy container output to `out` until the remote end closes.
pub async fn relay_output<S, W>(output: &mut S, out: &mut W) -> io::Result<u64>
where
    S: Stream<Item = Result<Vec<u8>, EngineError>> + Unpin + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut total = 0u64;
    while let Some(chunk) = output.next().await {
        let chunk = chunk.map_err(io::Error::other)?;
        out.write_all(&chunk).await?;
        out.flush().await?;
        total += chunk.len() as u64;
    }
    Ok(total)
}
