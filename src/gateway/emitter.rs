//! The transport-agnostic streaming contract agents write through.
//!
//! One async trait with default no-op methods so a caller only overrides
//! what it routes, shared behind `Arc<dyn Emitter>` across agent calls.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ReferenceLink {
    pub title: String,
    pub url: String,
}

/// Where an agent sends its Markdown output. The HTTP transport implements
/// this as an SSE frame writer; the stdio transport implements it as a
/// JSON-RPC progress notification (§4.6).
#[async_trait]
pub trait Emitter: Send + Sync {
    /// Append a chunk of Markdown to the response.
    async fn message(&self, chunk: &str);

    /// Attach reference links (e.g. documentation, catalog entries).
    async fn references(&self, _refs: Vec<ReferenceLink>) {}

    /// Surface a confirmation prompt (used by deploy's promotion gate).
    async fn confirmation(&self, _title: &str, _message: &str) {}

    /// Signal that this turn's output is complete. Transports must see
    /// this called at most once and treat it as the final frame.
    async fn done(&self) {}
}

/// Adapter that forwards every call to an inner `Emitter` while also
/// capturing message chunks into a buffer, so the orchestrator can both
/// stream an agent's output live and later feed the transcript to an
/// executive-summary LLM call (§4.4 "Composed streaming").
///
/// Deliberately a small wrapper rather than global state, per the
/// tee-emitter design note.
pub struct TeeEmitter<'a> {
    inner: &'a (dyn Emitter + Sync),
    buffer: tokio::sync::Mutex<String>,
}

impl<'a> TeeEmitter<'a> {
    pub fn new(inner: &'a (dyn Emitter + Sync)) -> Self {
        Self {
            inner,
            buffer: tokio::sync::Mutex::new(String::new()),
        }
    }

    /// The captured transcript so far, truncated to `max_chars` with an
    /// explicit marker when cut (§4.4: "truncated to ~4000 characters with
    /// an explicit `(truncated)` marker").
    pub async fn transcript(&self, max_chars: usize) -> String {
        let buf = self.buffer.lock().await;
        if buf.chars().count() <= max_chars {
            buf.clone()
        } else {
            let truncated: String = buf.chars().take(max_chars).collect();
            format!("{}\n(truncated)", truncated)
        }
    }
}

#[async_trait]
impl<'a> Emitter for TeeEmitter<'a> {
    async fn message(&self, chunk: &str) {
        self.buffer.lock().await.push_str(chunk);
        self.inner.message(chunk).await;
    }

    async fn references(&self, refs: Vec<ReferenceLink>) {
        self.inner.references(refs).await;
    }

    async fn confirmation(&self, title: &str, message: &str) {
        self.inner.confirmation(title, message).await;
    }

    async fn done(&self) {
        self.inner.done().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingEmitter {
        chunks: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Emitter for RecordingEmitter {
        async fn message(&self, chunk: &str) {
            self.chunks.lock().unwrap().push(chunk.to_string());
        }
    }

    #[tokio::test]
    async fn tee_forwards_and_captures() {
        let recorder = RecordingEmitter {
            chunks: StdMutex::new(Vec::new()),
        };
        let tee = TeeEmitter::new(&recorder);
        tee.message("hello ").await;
        tee.message("world").await;

        assert_eq!(recorder.chunks.lock().unwrap().as_slice(), ["hello ", "world"]);
        assert_eq!(tee.transcript(100).await, "hello world");
    }

    #[tokio::test]
    async fn transcript_truncates_with_marker() {
        let recorder = RecordingEmitter {
            chunks: StdMutex::new(Vec::new()),
        };
        let tee = TeeEmitter::new(&recorder);
        tee.message(&"x".repeat(10)).await;
        let snapshot = tee.transcript(4).await;
        assert_eq!(snapshot, "xxxx\n(truncated)");
    }
}
