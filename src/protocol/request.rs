//! HTTP request parsing
//!
//! Reads a single HTTP/1.1 request (request line, headers and a
//! `Content-Length` body) from a buffered stream.

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::ProtocolError;

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(raw) => raw,
        }
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Request path without the query string, still percent-encoded.
    pub path: String,
    /// Query parameters, each decoded exactly once.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First query parameter named `name`
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First header named `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The request path with percent-escapes decoded.
    pub fn decoded_path(&self) -> Result<String, ProtocolError> {
        percent_decode_str(&self.path)
            .decode_utf8()
            .map(|p| p.into_owned())
            .map_err(|_| ProtocolError::MalformedRequest("path is not valid UTF-8".into()))
    }
}

/// Reads one request from `reader`.
///
/// The request line and headers together may not exceed `max_header_bytes`;
/// a declared body larger than `max_body_bytes` is refused before any of it
/// is read.
pub async fn read_request<R>(
    reader: &mut R,
    max_header_bytes: usize,
    max_body_bytes: u64,
) -> Result<HttpRequest, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut remaining = max_header_bytes;

    let request_line = match read_head_line(reader, &mut remaining, max_header_bytes).await? {
        Some(line) => line,
        None => return Err(ProtocolError::ConnectionClosed),
    };

    let (method, target) = parse_request_line(&request_line)?;

    let mut headers = Vec::new();
    loop {
        let line = read_head_line(reader, &mut remaining, max_header_bytes)
            .await?
            .ok_or_else(|| ProtocolError::MalformedRequest("headers not terminated".into()))?;

        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedRequest(format!("bad header line: {line}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let (path, query) = split_target(&target);

    let mut request = HttpRequest {
        method,
        path,
        query,
        headers,
        body: Vec::new(),
    };

    if request
        .header("transfer-encoding")
        .is_some_and(|te| !te.eq_ignore_ascii_case("identity"))
    {
        return Err(ProtocolError::MalformedRequest(
            "chunked transfer encoding is not supported".into(),
        ));
    }

    let content_length = match request.header("content-length") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ProtocolError::MalformedRequest(format!("bad Content-Length: {raw}")))?,
        None => 0,
    };

    if content_length > max_body_bytes {
        return Err(ProtocolError::BodyTooLarge {
            size: content_length,
            limit: max_body_bytes,
        });
    }

    if content_length > 0 {
        let mut body = vec![0u8; content_length as usize];
        reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtocolError::MalformedRequest("body shorter than Content-Length".into())
            } else {
                ProtocolError::Io(e)
            }
        })?;
        request.body = body;
    }

    Ok(request)
}

/// Reads one CRLF- or LF-terminated line of the request head, charging its
/// length against `remaining`. Returns `None` on a clean EOF before any byte.
async fn read_head_line<R>(
    reader: &mut R,
    remaining: &mut usize,
    max_header_bytes: usize,
) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(*remaining as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        if *remaining == 0 {
            return Err(ProtocolError::HeadersTooLarge(max_header_bytes));
        }
        return Ok(None);
    }

    *remaining -= n;

    if buf.last() != Some(&b'\n') {
        if *remaining == 0 {
            return Err(ProtocolError::HeadersTooLarge(max_header_bytes));
        }
        return Err(ProtocolError::MalformedRequest("unexpected end of request".into()));
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ProtocolError::MalformedRequest("request head is not valid UTF-8".into()))
}

fn parse_request_line(line: &str) -> Result<(Method, String), ProtocolError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ProtocolError::MalformedRequest(format!(
            "bad request line: {line}"
        )));
    };

    if parts.next().is_some() || !version.starts_with("HTTP/1.") {
        return Err(ProtocolError::MalformedRequest(format!(
            "bad request line: {line}"
        )));
    }

    if !target.starts_with('/') {
        return Err(ProtocolError::MalformedRequest(format!(
            "unsupported request target: {target}"
        )));
    }

    Ok((Method::parse(method), target.to_string()))
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => {
            let pairs = url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (path.to_string(), pairs)
        }
        None => (target.to_string(), Vec::new()),
    }
}
