//! Wire format
//!
//! Every frame is one JSON object followed by a NUL byte. Inbound frames must
//! look like `{"type": "...", "body": {...}}`.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::traffic::TrafficMonitor;

pub const FRAME_DELIMITER: u8 = 0;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {length} bytes exceeds the {max} byte limit")]
    FrameTooLong { length: usize, max: usize },

    #[error("invalid packet: {0}")]
    InvalidPacket(String),
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: String,
    pub body: Map<String, Value>,
}

impl Packet {
    pub fn new(kind: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    pub fn parse(frame: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(frame)
            .map_err(|_| CodecError::InvalidPacket("frame is not UTF-8".to_string()))?;
        if frame.len() < 2 || !text.starts_with('{') {
            return Err(CodecError::InvalidPacket(format!("not a JSON object: {}", text)));
        }

        let mut object = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                return Err(CodecError::InvalidPacket(format!("not a JSON object: {}", text)))
            }
            Err(e) => return Err(CodecError::InvalidPacket(format!("{}: {}", e, text))),
        };

        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => {
                return Err(CodecError::InvalidPacket(
                    "missing string field 'type'".to_string(),
                ))
            }
        };
        let body = match object.remove("body") {
            Some(Value::Object(body)) => body,
            _ => {
                return Err(CodecError::InvalidPacket(
                    "missing object field 'body'".to_string(),
                ))
            }
        };

        Ok(Self { kind, body })
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.kind.clone()));
        object.insert("body".to_string(), Value::Object(self.body.clone()));
        Value::Object(object)
    }

    /// `body[field]` when it is a string
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }
}

/// NUL-delimited JSON framing
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_frame_length: usize,
    /// Bytes already scanned for a delimiter
    next_index: usize,
    traffic: Option<Arc<TrafficMonitor>>,
}

impl PacketCodec {
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            next_index: 0,
            traffic: None,
        }
    }

    pub fn with_traffic(mut self, traffic: Arc<TrafficMonitor>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
        loop {
            let start = self.next_index.min(src.len());
            let Some(offset) = src[start..].iter().position(|b| *b == FRAME_DELIMITER) else {
                if src.len() > self.max_frame_length {
                    let length = src.len();
                    src.clear();
                    self.next_index = 0;
                    return Err(CodecError::FrameTooLong {
                        length,
                        max: self.max_frame_length,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = start + offset;
            self.next_index = 0;

            if end > self.max_frame_length {
                src.advance(end + 1);
                return Err(CodecError::FrameTooLong {
                    length: end,
                    max: self.max_frame_length,
                });
            }

            let frame = src.split_to(end);
            src.advance(1);
            if let Some(traffic) = &self.traffic {
                traffic.record_read(end + 1);
            }

            // keep-alive NULs carry nothing
            if frame.is_empty() {
                continue;
            }
            return Packet::parse(&frame).map(Some);
        }
    }
}

impl Encoder<Value> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), CodecError> {
        let text = serde_json::to_vec(&item)
            .map_err(|e| CodecError::InvalidPacket(e.to_string()))?;
        dst.reserve(text.len() + 1);
        dst.put_slice(&text);
        dst.put_u8(FRAME_DELIMITER);
        if let Some(traffic) = &self.traffic {
            traffic.record_written(text.len() + 1);
        }
        Ok(())
    }
}
