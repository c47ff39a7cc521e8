//! Length-prefixed framing: `[len: u32 LE][payload]`, payloads up to [`MAX_FRAME_LEN`].

use crate::network::transport::NetworkError;
use crate::types::encoding::{Decode, Encode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() || payload.len() > MAX_FRAME_LEN {
        return Err(NetworkError::InvalidFrameLen(payload.len()));
    }

    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `None` when the peer closed the connection between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(NetworkError::InvalidFrameLen(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn send<W, T>(writer: &mut W, message: &T) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
    T: Encode,
{
    write_frame(writer, &message.to_bytes()).await
}

pub async fn recv<R, T>(reader: &mut R) -> Result<Option<T>, NetworkError>
where
    R: AsyncRead + Unpin,
    T: Decode,
{
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(T::from_bytes(&payload)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::{Ack, Response};
    use tokio::io::duplex;

    #[tokio::test]
    async fn frames_arrive_in_order() {
        let (mut a, mut b) = duplex(1024);

        write_frame(&mut a, b"first").await.unwrap();
        write_frame(&mut a, b"second").await.unwrap();

        assert_eq!(read_frame(&mut b).await.unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut b).await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn closed_stream_reads_none() {
        let (a, mut b) = duplex(64);
        drop(a);
        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();

        assert!(matches!(
            read_frame(&mut b).await,
            Err(NetworkError::InvalidFrameLen(len)) if len == MAX_FRAME_LEN + 1
        ));
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&10u32.to_le_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        assert!(matches!(read_frame(&mut b).await, Err(NetworkError::Io(_))));
    }

    #[tokio::test]
    async fn typed_messages_round_trip() {
        let (mut a, mut b) = duplex(1024);
        send(&mut a, &Response::Ack(Ack)).await.unwrap();

        let received: Option<Response> = recv(&mut b).await.unwrap();
        assert_eq!(received, Some(Response::Ack(Ack)));
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_decode_error() {
        let (mut a, mut b) = duplex(64);
        write_frame(&mut a, &[42]).await.unwrap();

        let result: Result<Option<Response>, _> = recv(&mut b).await;
        assert!(matches!(result, Err(NetworkError::Decode(_))));
    }
}
