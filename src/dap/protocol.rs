use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct DapMessage {
    pub seq: u64,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub content: DapMessageContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DapMessageContent {
    Request {
        command: String,
        arguments: Option<Value>,
    },
    Response {
        request_seq: u64,
        success: bool,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        body: Option<Value>,
    },
    Event {
        event: String,
        body: Option<Value>,
    },
}

const CONTENT_LENGTH: &str = "Content-Length:";

/// Frames announcing a larger body are rejected before anything is allocated.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Reads one `Content-Length` framed message. `Ok(None)` at end of input.
///
/// A body that is not a valid message is reported as `InvalidData` after it
/// has been consumed, so the stream stays aligned on the next frame.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<DapMessage>> {
    let mut content_length = None;
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 {
            return Ok(None);
        }
        let line = header.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }
        if let Some(value) = line.strip_prefix(CONTENT_LENGTH) {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            if length > MAX_MESSAGE_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("message of {length} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit"),
                ));
            }
            content_length = Some(length);
        }
    }

    let mut body = vec![0u8; content_length.unwrap_or(0)];
    reader.read_exact(&mut body)?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn write_message<W: Write>(writer: &mut W, msg: &DapMessage) -> io::Result<()> {
    let json = serde_json::to_string(msg).map_err(io::Error::other)?;
    write!(writer, "{CONTENT_LENGTH} {}\r\n\r\n{json}", json.len())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip() {
        let msg = DapMessage {
            seq: 3,
            msg_type: "event".into(),
            content: DapMessageContent::Event {
                event: "terminated".into(),
                body: None,
            },
        };
        let mut buf = Vec::new();
        write_message(&mut buf, &msg).unwrap();
        assert!(buf.starts_with(b"Content-Length: "));

        let mut reader = Cursor::new(buf);
        let read = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(read.seq, 3);
        assert!(matches!(
            read.content,
            DapMessageContent::Event { ref event, .. } if event == "terminated"
        ));
        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut reader = Cursor::new(b"Content-Length: 18446744073709551615\r\n\r\n{}".to_vec());
        let err = read_message(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let frame = format!("Content-Length: {}\r\n\r\n", MAX_MESSAGE_SIZE + 1);
        let err = read_message(&mut Cursor::new(frame.into_bytes())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
