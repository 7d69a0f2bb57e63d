/// Display sink: renders delivered messages to the console
use crate::console::Console;
use chrono::{DateTime, Local, TimeZone};
use mcast_protocol::ChatMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

const ANON_NAME: &str = "anon";
const SELF_NAME: &str = "you";

/// Consume messages until the delivery channel closes. Sole caller of
/// [`Console::message`], so display order is exactly channel order.
pub async fn run(mut rx: mpsc::Receiver<ChatMessage>, self_id: String, console: Arc<Console>) {
    while let Some(msg) = rx.recv().await {
        console.message(&render(&msg, &self_id, local_time(msg.sent_at)));
    }
}

/// Own messages display as "you" even if the sender set a name; they still
/// round-trip through the network like everyone else's.
fn display_name<'a>(msg: &'a ChatMessage, self_id: &str) -> &'a str {
    if msg.id == self_id {
        SELF_NAME
    } else if msg.name.is_empty() {
        ANON_NAME
    } else {
        &msg.name
    }
}

fn local_time(sent_at: i64) -> DateTime<Local> {
    if sent_at == 0 {
        Local::now()
    } else {
        Local.timestamp_nanos(sent_at)
    }
}

fn render(msg: &ChatMessage, self_id: &str, ts: DateTime<Local>) -> String {
    format!(
        "[{}] <{}> {}",
        ts.format("%H:%M:%S"),
        display_name(msg, self_id),
        msg.body
    )
}

#[cfg(test)]
mod test {
    use super::{display_name, local_time, render};
    use chrono::Local;
    use mcast_protocol::ChatMessage;

    const SELF_ID: &str = "abcd1234";

    #[test]
    fn test_own_id_overrides_name() {
        let msg = ChatMessage::new(SELF_ID, "Alice", "hi", 0);
        assert_eq!(display_name(&msg, SELF_ID), "you");
    }

    #[test]
    fn test_empty_name_falls_back_to_anon() {
        let msg = ChatMessage::new("ffff0000", "", "who dis", 0);
        assert_eq!(display_name(&msg, SELF_ID), "anon");
    }

    #[test]
    fn test_foreign_sender_keeps_name() {
        let msg = ChatMessage::new("ffff0000", "Alice", "hi", 0);
        assert_eq!(display_name(&msg, SELF_ID), "Alice");
    }

    #[test]
    fn test_line_shape() {
        let msg = ChatMessage::new("ffff0000", "Alice", "hi there", 0);
        let ts = local_time(1_700_000_000_000_000_000);
        let line = render(&msg, SELF_ID, ts);
        assert_eq!(line, format!("[{}] <Alice> hi there", ts.format("%H:%M:%S")));
    }

    #[test]
    fn test_known_timestamp_converts_to_local() {
        assert_eq!(
            local_time(1_700_000_000_000_000_000).timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_zero_timestamp_uses_current_time() {
        let before = Local::now();
        let resolved = local_time(0);
        let after = Local::now();
        assert!(resolved >= before && resolved <= after);
    }
}
