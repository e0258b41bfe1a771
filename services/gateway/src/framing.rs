//! Length-prefixed frames
//!
//! A frame is the payload's byte count in decimal, a `\n`, then exactly that
//! many payload bytes.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame length: {0:?}")]
    BadLength(String),

    #[error("Frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// Read one frame; `None` on a clean end of stream before a header
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = String::new();
    if reader.read_line(&mut header).await? == 0 {
        return Ok(None);
    }

    let digits = header.trim();
    let len: usize = digits
        .parse()
        .map_err(|_| FrameError::BadLength(digits.to_string()))?;
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(format!("{}\n", payload.len()).as_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let input: &[u8] = b"5\nhello3\nabc";
        let mut reader = BufReader::new(input);

        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(read_frame(&mut reader, 64).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_bad_header() {
        let input: &[u8] = b"five\nhello";
        let mut reader = BufReader::new(input);
        assert!(matches!(
            read_frame(&mut reader, 64).await,
            Err(FrameError::BadLength(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_short_frames() {
        let mut big = BufReader::new(&b"100\nx"[..]);
        assert!(matches!(
            read_frame(&mut big, 10).await,
            Err(FrameError::TooLarge { len: 100, max: 10 })
        ));

        let mut short = BufReader::new(&b"10\nabc"[..]);
        assert!(matches!(read_frame(&mut short, 64).await, Err(FrameError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mut out = Vec::new();
        write_frame(&mut out, b"{}").await.unwrap();
        assert_eq!(out, b"2\n{}");
    }
}
