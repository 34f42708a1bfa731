//! Wire codec: framed requests in, tagged replies out.
//!
//! Two request forms are accepted: multi-bulk (`*N\r\n` + N `$len\r\n...\r\n`
//! bulks) and inline (one `\r\n`-terminated line split on spaces). Replies
//! serialize byte-exact per the table in the spec: status, error, integer,
//! bulk (possibly null), and multi-bulk (elements possibly null).

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{RockdisError, Result};

#[derive(Debug, Clone)]
pub struct Request {
    pub command: String,
    pub args: Vec<Vec<u8>>,
}

impl Request {
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    MultiBulk(Vec<Reply>),
}

impl Reply {
    /// Empty byte sequences serialize as null bulks (matches the source's
    /// observable behavior, not a general Redis convention).
    pub fn bulk(data: Vec<u8>) -> Reply {
        if data.is_empty() {
            Reply::Bulk(None)
        } else {
            Reply::Bulk(Some(data))
        }
    }

    pub fn ok() -> Reply {
        Reply::Status("OK".to_string())
    }
}

pub fn encode_reply(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Status(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Error(msg) => {
            out.extend_from_slice(b"-ERROR ");
            out.extend_from_slice(msg.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Integer(n) => {
            out.push(b':');
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
        Reply::Bulk(Some(data)) => {
            out.push(b'$');
            out.extend_from_slice(data.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        Reply::MultiBulk(items) => {
            out.push(b'*');
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

pub async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &Reply) -> Result<()> {
    let mut buf = Vec::new();
    encode_reply(reply, &mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one request. `Ok(None)` means the peer closed the connection
/// cleanly at a frame boundary; anything else is a `Malformed` error that
/// should terminate the connection.
pub async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Request>> {
    let Some(line) = read_crlf_line(reader).await? else { return Ok(None) };

    if line.first() == Some(&b'*') {
        read_multibulk(reader, &line).await.map(Some)
    } else {
        Ok(Some(parse_inline(&line)))
    }
}

async fn read_crlf_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\r\n") {
        return Err(RockdisError::Malformed("line not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - 2);
    Ok(Some(line))
}

async fn read_multibulk<R: AsyncBufRead + Unpin>(reader: &mut R, header: &[u8]) -> Result<Request> {
    let count_str = std::str::from_utf8(&header[1..])
        .map_err(|_| RockdisError::Malformed("non-UTF8 argument count".to_string()))?;
    let count: i64 = count_str
        .parse()
        .map_err(|_| RockdisError::Malformed(format!("bad argument count {count_str:?}")))?;
    if count <= 0 {
        return Ok(Request { command: String::new(), args: Vec::new() });
    }

    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        parts.push(read_bulk_argument(reader).await?);
    }

    let command = String::from_utf8_lossy(&parts[0]).to_lowercase();
    Ok(Request { command, args: parts.into_iter().skip(1).collect() })
}

async fn read_bulk_argument<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let header = read_crlf_line(reader)
        .await?
        .ok_or_else(|| RockdisError::Malformed("connection closed mid-argument".to_string()))?;
    if header.first() != Some(&b'$') {
        return Err(RockdisError::Malformed("expected bulk argument header".to_string()));
    }
    let len_str = std::str::from_utf8(&header[1..])
        .map_err(|_| RockdisError::Malformed("non-UTF8 argument length".to_string()))?;
    let len: usize = len_str
        .parse()
        .map_err(|_| RockdisError::Malformed(format!("bad argument length {len_str:?}")))?;

    let mut data = vec![0u8; len];
    read_exact_or_malformed(reader, &mut data).await?;
    let mut crlf = [0u8; 2];
    read_exact_or_malformed(reader, &mut crlf).await?;
    if crlf != *b"\r\n" {
        return Err(RockdisError::Malformed("argument not terminated by CRLF".to_string()));
    }
    Ok(data)
}

/// A short read here means the declared length didn't match what actually
/// followed — a malformed frame, not a transient I/O failure.
async fn read_exact_or_malformed<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    match tokio::io::AsyncReadExt::read_exact(reader, buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(RockdisError::Malformed("argument shorter than its declared length".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_inline(line: &[u8]) -> Request {
    let mut fields = line.split(|&b| b == b' ').filter(|f| !f.is_empty());
    let Some(command) = fields.next() else {
        return Request { command: String::new(), args: Vec::new() };
    };
    Request {
        command: String::from_utf8_lossy(command).to_lowercase(),
        args: fields.map(|f| f.to_vec()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn parse(bytes: &[u8]) -> Result<Option<Request>> {
        let mut cursor = Cursor::new(bytes.to_vec());
        read_request(&mut cursor).await
    }

    #[tokio::test]
    async fn parses_multibulk() {
        let req = parse(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await.unwrap().unwrap();
        assert_eq!(req.command, "get");
        assert_eq!(req.args, vec![b"foo".to_vec()]);
    }

    #[tokio::test]
    async fn parses_inline() {
        let req = parse(b"PING\r\n").await.unwrap().unwrap();
        assert_eq!(req.command, "ping");
        assert!(req.args.is_empty());
    }

    #[tokio::test]
    async fn inline_with_args() {
        let req = parse(b"SET foo bar\r\n").await.unwrap().unwrap();
        assert_eq!(req.command, "set");
        assert_eq!(req.args, vec![b"foo".to_vec(), b"bar".to_vec()]);
    }

    #[tokio::test]
    async fn rejects_bad_bulk_length() {
        let err = parse(b"*1\r\n$3\r\nab\r\n").await.unwrap_err();
        assert!(matches!(err, RockdisError::Malformed(_)));
    }

    #[tokio::test]
    async fn rejects_missing_crlf() {
        let err = parse(b"*1\r\n$2\r\nabXX").await.unwrap_err();
        assert!(matches!(err, RockdisError::Malformed(_)));
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        assert!(parse(b"").await.unwrap().is_none());
    }

    #[test]
    fn encodes_every_reply_variant_byte_exact() {
        let mut buf = Vec::new();
        encode_reply(&Reply::Status("OK".into()), &mut buf);
        assert_eq!(buf, b"+OK\r\n");

        buf.clear();
        encode_reply(&Reply::Error("bad".into()), &mut buf);
        assert_eq!(buf, b"-ERROR bad\r\n");

        buf.clear();
        encode_reply(&Reply::Integer(42), &mut buf);
        assert_eq!(buf, b":42\r\n");

        buf.clear();
        encode_reply(&Reply::Bulk(Some(b"hi".to_vec())), &mut buf);
        assert_eq!(buf, b"$2\r\nhi\r\n");

        buf.clear();
        encode_reply(&Reply::Bulk(None), &mut buf);
        assert_eq!(buf, b"$-1\r\n");

        buf.clear();
        encode_reply(&Reply::MultiBulk(vec![Reply::Bulk(Some(b"a".to_vec())), Reply::Bulk(None)]), &mut buf);
        assert_eq!(buf, b"*2\r\n$1\r\na\r\n$-1\r\n");
    }

    #[test]
    fn empty_bulk_data_serializes_as_null() {
        assert_eq!(Reply::bulk(Vec::new()), Reply::Bulk(None));
    }
}
