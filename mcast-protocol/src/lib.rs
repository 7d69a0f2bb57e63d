/// Wire protocol for serverless multicast chat
///
/// Every datagram on the group carries exactly one JSON-encoded
/// [`ChatMessage`]:
///
/// ```ignore
/// {"id":"f3a81c90d42e77b1","name":"alice","body":"hello","sent_at":1700000000000000000}
/// ```
///
/// The field names are the interop contract; any implementation that emits
/// them can talk to this one. There is no session, no handshake, and no
/// framing beyond the datagram boundary itself.
use thiserror::Error;

mod codec;
mod model;

pub use codec::ChatCodec;
pub use model::{ChatMessage, MAX_UDP_PAYLOAD};

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode datagram: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("message too long ({size} bytes encoded, max payload {MAX_UDP_PAYLOAD} bytes)")]
    TooLarge { size: usize },
}

impl Error {
    /// Decode failures are expected on a shared multicast group and must not
    /// take down the receive path; every other error terminates it.
    pub fn is_fatal_to_receive(&self) -> bool {
        !matches!(self, Error::Decode(_))
    }
}
