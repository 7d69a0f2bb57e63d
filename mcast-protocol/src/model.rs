/// Model definition for the message exchanged over the multicast group
use serde::{Deserialize, Serialize};

/// Largest encoded message that fits a single IPv4 UDP datagram.
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// One chat message, exchanged verbatim over the wire.
///
/// `id` distinguishes a running session, not a person: it is generated once
/// at startup and never changes. `sent_at` is nanoseconds since the Unix
/// epoch; `0` means the sender did not know the time and the receiver should
/// substitute its own.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub id: String,
    pub name: String,
    pub body: String,
    pub sent_at: i64,
}

impl ChatMessage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
        sent_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: body.into(),
            sent_at,
        }
    }

    /// Strip trailing line terminators from the body. Applied on receipt,
    /// never on send.
    pub fn trim_body(&mut self) {
        let trimmed = self.body.trim_end_matches(['\r', '\n']).len();
        self.body.truncate(trimmed);
    }
}
