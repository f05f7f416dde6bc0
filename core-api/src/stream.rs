use crate::error::{ApiError, Result};
use futures_util::StreamExt;
use std::fmt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Longest line accepted from a streaming response.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Newline-delimited reader over a streaming response body.
///
/// Blank lines (keep-alives) are skipped. A line longer than the limit ends
/// the stream with [`ApiError::StreamLineTooLong`].
pub struct LineStream {
    frames: FramedRead<Reader, LinesCodec>,
    max_length: usize,
    finished: bool,
}

impl fmt::Debug for LineStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream")
            .field("max_length", &self.max_length)
            .field("finished", &self.finished)
            .finish()
    }
}

impl LineStream {
    pub fn new(body: Reader) -> Self {
        Self::with_max_length(body, MAX_LINE_LENGTH)
    }

    pub fn with_max_length(body: Reader, max_length: usize) -> Self {
        Self {
            frames: FramedRead::new(body, LinesCodec::new_with_max_length(max_length)),
            max_length,
            finished: false,
        }
    }

    /// Next non-empty line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        if self.finished {
            return None;
        }

        loop {
            match self.frames.next().await {
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => return Some(Ok(line)),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    self.finished = true;
                    return Some(Err(ApiError::StreamLineTooLong {
                        max: self.max_length,
                    }));
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    self.finished = true;
                    return Some(Err(ApiError::Io(e)));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(data: &'static [u8], max: usize) -> LineStream {
        LineStream::with_max_length(Box::new(Cursor::new(data)), max)
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let mut lines = stream(b"{\"a\":1}\r\n\r\n{\"b\":2}\n", 64);

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"b\":2}");
        assert!(lines.next_line().await.is_none());
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_returned() {
        let mut lines = stream(b"first\nlast", 64);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "first");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "last");
        assert!(lines.next_line().await.is_none());
    }

    #[tokio::test]
    async fn test_overlong_line_is_fatal() {
        let mut lines = stream(b"ok\n0123456789abcdef\nafter\n", 8);

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "ok");
        assert!(matches!(
            lines.next_line().await,
            Some(Err(ApiError::StreamLineTooLong { max: 8 }))
        ));
        assert!(lines.next_line().await.is_none());
    }
}
