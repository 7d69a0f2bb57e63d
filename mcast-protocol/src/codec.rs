/// Datagram codec for the multicast chat protocol
use crate::{model::MAX_UDP_PAYLOAD, ChatMessage, Error};
use tokio_util::{
    bytes::{BufMut, BytesMut},
    codec::{Decoder, Encoder},
};

/// Codec mapping one datagram to one JSON-encoded [`ChatMessage`].
///
/// Unlike a stream codec there is no framing state: `decode` is handed a
/// complete datagram and consumes it whole, and `encode` emits exactly one
/// payload per message.
#[derive(Debug, Default)]
pub struct ChatCodec;

impl Decoder for ChatCodec {
    type Item = ChatMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A zero-byte datagram is a no-op, not an error.
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split_to(src.len());
        let msg = serde_json::from_slice(&datagram).map_err(Error::Decode)?;
        Ok(Some(msg))
    }
}

impl Encoder<ChatMessage> for ChatCodec {
    type Error = Error;

    fn encode(&mut self, msg: ChatMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&msg).map_err(Error::Encode)?;
        // Oversize messages must never reach the socket, and a failed encode
        // must leave the output buffer untouched.
        if payload.len() > MAX_UDP_PAYLOAD {
            return Err(Error::TooLarge {
                size: payload.len(),
            });
        }
        dst.reserve(payload.len());
        dst.put_slice(&payload);
        Ok(())
    }
}
