// Server-Sent Events framing for the relay's output and its consumer

use serde::Deserialize;

/// Payload of the terminal record
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of the relay's output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental text fragment
    Content(String),
    /// Terminal failure
    Error(String),
    /// Terminal end-of-stream sentinel
    Done,
}

#[derive(Debug, Deserialize)]
struct FramePayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Frame {
    /// The text that goes after `data: ` on the wire
    pub fn data(&self) -> String {
        match self {
            Self::Content(text) => serde_json::json!({ "content": text }).to_string(),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
            Self::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Interpret the data of one record.
    ///
    /// Returns `Ok(None)` for payloads carrying neither `content` nor `error`.
    /// An `error` of any non-null shape is terminal; non-string errors keep their JSON text.
    pub fn parse(data: &str) -> Result<Option<Self>, serde_json::Error> {
        if data == DONE_SENTINEL {
            return Ok(Some(Self::Done));
        }

        let payload: FramePayload = serde_json::from_str(data)?;
        match (payload.error, payload.content) {
            (Some(serde_json::Value::String(message)), _) => Ok(Some(Self::Error(message))),
            (Some(error), _) if !error.is_null() => Ok(Some(Self::Error(error.to_string()))),
            (_, Some(content)) => Ok(Some(Self::Content(content))),
            _ => Ok(None),
        }
    }
}

/// Splits a byte stream into SSE records, holding partial records between reads.
///
/// Boundaries are found on raw bytes, so a multi-byte character split across two reads
/// is only decoded once the whole record has arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read and take every record it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some((end, separator_len)) = find_boundary(&self.buffer) {
            let rest = self.buffer.split_off(end + separator_len);
            let mut record = std::mem::replace(&mut self.buffer, rest);
            record.truncate(end);
            records.push(String::from_utf8_lossy(&record).into_owned());
        }
        records
    }

    /// Bytes of an unterminated trailing record, if any
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| (pos, 4));

    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if lf.0 <= crlf.0 { lf } else { crlf }),
        (lf, crlf) => lf.or(crlf),
    }
}

/// Join the `data:` lines of a record. `None` when the record has none (comments, bare events).
pub fn record_data(record: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in record.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(joined) => {
                joined.push('\n');
                joined.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    data
}
