//! `multipart/form-data` parsing
//!
//! Splits an upload body into its form parts. Field values are taken
//! verbatim; nothing here URL-decodes.

use crate::error::ProtocolError;

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    /// Present for file parts.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    /// Field value as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Extract the boundary from a `Content-Type` header value.
///
/// Fails when the type is not `multipart/form-data` or has no boundary.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, ProtocolError> {
    let mut params = content_type.split(';').map(str::trim);

    let mime = params.next().unwrap_or("");
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return Err(ProtocolError::UnsupportedContentType(content_type.to_string()));
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()).to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| ProtocolError::MalformedRequest("multipart boundary missing".into()))
}

/// Parse a multipart body delimited by `boundary`.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<FormPart>, ProtocolError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = format!("\r\n--{boundary}").into_bytes();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| ProtocolError::MalformedRequest("multipart boundary not found".into()))?
        + delimiter.len();

    let mut parts = Vec::new();

    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }
        if !body[pos..].starts_with(b"\r\n") {
            return Err(malformed("expected CRLF after boundary"));
        }
        pos += 2;

        let head_end = find(body, b"\r\n\r\n", pos).ok_or_else(|| malformed("part headers not terminated"))?;
        let head = std::str::from_utf8(&body[pos..head_end])
            .map_err(|_| malformed("part headers are not valid UTF-8"))?;

        let data_start = head_end + 4;
        let data_end =
            find(body, &separator, data_start).ok_or_else(|| malformed("closing boundary missing"))?;

        parts.push(parse_part(head, body[data_start..data_end].to_vec())?);

        pos = data_end + separator.len();
    }
}

fn parse_part(head: &str, data: Vec<u8>) -> Result<FormPart, ProtocolError> {
    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in head.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };

        if header.trim().eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').map(str::trim).skip(1) {
                let Some((key, raw)) = param.split_once('=') else {
                    continue;
                };
                match key.trim().to_ascii_lowercase().as_str() {
                    "name" => name = Some(unquote(raw.trim()).to_string()),
                    "filename" => file_name = Some(unquote(raw.trim()).to_string()),
                    _ => {}
                }
            }
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name.ok_or_else(|| malformed("form part without a name"))?;

    Ok(FormPart {
        name,
        file_name,
        content_type,
        data,
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

fn malformed(msg: &str) -> ProtocolError {
    ProtocolError::MalformedRequest(format!("multipart: {msg}"))
}
