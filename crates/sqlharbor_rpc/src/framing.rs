//! `Content-Length` framing as used by language-server style protocols.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::RpcError;

const MAX_MSG_SIZE: usize = 16 * 1024 * 1024;
const CONTENT_LENGTH: &str = "content-length";

pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;

    if body.len() > MAX_MSG_SIZE {
        return Err(RpcError::Protocol("message too large".into()));
    }

    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed message body. Returns `None` on a clean end of stream
/// between messages.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>, RpcError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;

        if read == 0 {
            if saw_header {
                return Err(RpcError::Protocol("stream ended inside headers".into()));
            }
            return Ok(None);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;

        let Some((name, value)) = line.split_once(':') else {
            return Err(RpcError::Protocol(format!("malformed header: {line}")));
        };

        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|e| RpcError::Protocol(format!("bad Content-Length: {e}")))?;
            content_length = Some(length);
        }
    }

    let length =
        content_length.ok_or_else(|| RpcError::Protocol("missing Content-Length".into()))?;

    if length > MAX_MSG_SIZE {
        return Err(RpcError::Protocol("message too large".into()));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn frames_round_trip_through_a_pipe() {
        let (mut writer, server) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(server);

        write_message(&mut writer, &json!({"id": 1})).await.unwrap();
        write_message(&mut writer, &json!({"id": 2})).await.unwrap();

        let first = read_message(&mut reader).await.unwrap().unwrap();
        let second = read_message(&mut reader).await.unwrap().unwrap();
        let first: Value = serde_json::from_slice(&first).unwrap();
        let second: Value = serde_json::from_slice(&second).unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }

    #[tokio::test]
    async fn extra_headers_are_ignored() {
        let raw = b"Content-Type: application/vscode-jsonrpc\r\ncontent-length: 2\r\n\r\n{}";
        let mut reader = BufReader::new(&raw[..]);

        let body = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(body, b"{}");
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_missing_or_oversized_length() {
        let mut missing = BufReader::new(&b"X-Other: 1\r\n\r\n{}"[..]);
        assert!(matches!(
            read_message(&mut missing).await,
            Err(RpcError::Protocol(_))
        ));

        let mut oversized = BufReader::new(&b"Content-Length: 99999999999\r\n\r\n"[..]);
        assert!(matches!(
            read_message(&mut oversized).await,
            Err(RpcError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn truncated_headers_are_an_error() {
        let mut reader = BufReader::new(&b"Content-Length: 10\r\n"[..]);
        assert!(read_message(&mut reader).await.is_err());
    }
}
