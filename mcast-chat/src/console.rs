/// Shared terminal output, guarded by a single lock
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

type Stream = Box<dyn Write + Send>;

/// Sole owner of the terminal streams.
///
/// Chat lines arrive asynchronously while the user is typing at the prompt,
/// so every write (message, prompt, diagnostic) happens under one lock as
/// a single atomic "text plus re-issued prompt" operation. Nothing else in
/// the process writes to stdout or stderr directly.
pub struct Console {
    streams: Mutex<(Stream, Stream)>,
}

impl Console {
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn new(out: Stream, err: Stream) -> Self {
        Self {
            streams: Mutex::new((out, err)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (Stream, Stream)> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Greeting printed once at startup, followed by the first prompt.
    pub fn banner(&self, text: &str) {
        let mut streams = self.lock();
        let _ = write!(streams.0, "{text}\n> ");
        let _ = streams.0.flush();
    }

    /// Re-issue the prompt without printing anything else.
    pub fn prompt(&self) {
        let mut streams = self.lock();
        let _ = write!(streams.0, "> ");
        let _ = streams.0.flush();
    }

    /// Print one complete chat line. The leading carriage return clears the
    /// prompt the user was typing at; the trailing prompt restores it.
    pub fn message(&self, line: &str) {
        let mut streams = self.lock();
        let _ = write!(streams.0, "\r{line}\n> ");
        let _ = streams.0.flush();
    }

    /// Report a non-fatal error and re-issue the prompt.
    pub fn error(&self, text: impl Display) {
        let mut streams = self.lock();
        let _ = writeln!(streams.1, "{text}");
        let _ = streams.1.flush();
        let _ = write!(streams.0, "> ");
        let _ = streams.0.flush();
    }

    /// Report an error without restoring the prompt (used during shutdown).
    pub fn warn(&self, text: impl Display) {
        let mut streams = self.lock();
        let _ = writeln!(streams.1, "{text}");
        let _ = streams.1.flush();
    }

    pub fn farewell(&self) {
        let mut streams = self.lock();
        let _ = writeln!(streams.0, "\nLeaving chat, goodbye!");
        let _ = streams.0.flush();
    }
}

#[cfg(test)]
mod test {
    use super::Console;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_message_clears_and_restores_prompt() {
        let out = SharedBuf::default();
        let console = Console::new(Box::new(out.clone()), Box::new(io::sink()));
        console.message("[12:00:00] <alice> hi");
        assert_eq!(out.contents(), "\r[12:00:00] <alice> hi\n> ");
    }

    #[test]
    fn test_error_goes_to_stderr_then_reprompts() {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let console = Console::new(Box::new(out.clone()), Box::new(err.clone()));
        console.error("failed to send message: boom");
        assert_eq!(err.contents(), "failed to send message: boom\n");
        assert_eq!(out.contents(), "> ");
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let out = SharedBuf::default();
        let console = Arc::new(Console::new(Box::new(out.clone()), Box::new(io::sink())));

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let console = Arc::clone(&console);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        console.message(&format!("[00:00:00] <peer{writer}> burst {n}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every message starts with \r, so splitting on it recovers the
        // individual writes; each must be one whole line plus the prompt.
        let output = out.contents();
        let chunks: Vec<&str> = output.split('\r').filter(|s| !s.is_empty()).collect();
        assert_eq!(chunks.len(), 8 * 50);
        for chunk in chunks {
            assert!(chunk.ends_with("\n> "), "truncated write: {chunk:?}");
            assert_eq!(chunk.matches('\n').count(), 1, "merged write: {chunk:?}");
            assert!(chunk.starts_with("[00:00:00] <peer"));
        }
    }
}
