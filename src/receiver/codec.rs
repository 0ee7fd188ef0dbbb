//! Framing for the receiver's carriage-return terminated lines

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::client::ReceiverError;

const TERMINATOR: u8 = b'\r';

/// Longest line the receiver emits is well below this; anything longer means
/// the stream lost its framing.
const MAX_LINE_LENGTH: usize = 512;

#[derive(Debug, Default, Clone, Copy)]
pub struct CarriageReturnCodec;

impl Decoder for CarriageReturnCodec {
    type Item = String;
    type Error = ReceiverError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(end) = src.iter().position(|b| *b == TERMINATOR) else {
                if src.len() > MAX_LINE_LENGTH {
                    return Err(ReceiverError::Desync(format!(
                        "no line terminator within {} bytes",
                        MAX_LINE_LENGTH
                    )));
                }
                return Ok(None);
            };

            let line = src.split_to(end);
            src.advance(1);

            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            return Ok(Some(text.to_string()));
        }
    }
}

impl Encoder<String> for CarriageReturnCodec {
    type Error = ReceiverError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(TERMINATOR);
        Ok(())
    }
}
