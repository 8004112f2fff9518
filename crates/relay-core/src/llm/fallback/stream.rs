//! Streaming dispatch across the chain
//!
//! Chunks from the current adapter are forwarded as they arrive. An `Error`
//! chunk (or a stream that ends without a terminal chunk) fails that adapter
//! and the stream restarts from the next entry. If the failed adapter had
//! already produced output, a `Reset` chunk is emitted before the next
//! adapter's chunks so consumers can discard the abandoned partial output.

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::manager::FallbackChain;
use super::types::FallbackReason;
use crate::error::DispatchError;
use crate::llm::messages::CompletionRequest;
use crate::llm::streaming::{CompletionStream, StreamChunk};
use crate::recovery::BreakerPermit;

struct ActiveAttempt<'a> {
    position: usize,
    id: &'a str,
    stream: CompletionStream<'a>,
    permit: BreakerPermit<'a>,
    produced_output: bool,
}

struct ChainStream<'a> {
    chain: &'a FallbackChain,
    request: &'a CompletionRequest,
    next_position: usize,
    active: Option<ActiveAttempt<'a>>,
    pending_reset: Option<StreamChunk>,
    last_error: Option<String>,
    attempted: usize,
    skipped: usize,
    finished: bool,
}

impl<'a> ChainStream<'a> {
    async fn next_chunk(&mut self) -> Option<StreamChunk> {
        loop {
            if self.finished {
                return None;
            }

            let Some(mut attempt) = self.active.take() else {
                if let Some(chunk) = self.start_next_attempt() {
                    return Some(chunk);
                }
                continue;
            };

            let next = attempt.stream.next().await;
            match next {
                Some(StreamChunk::Error { message }) => self.fail(attempt, message),
                None => {
                    let message = format!("{} stream ended without a terminal chunk", attempt.id);
                    self.fail(attempt, message);
                }
                Some(chunk @ StreamChunk::Done { .. }) => {
                    attempt.permit.success();
                    if attempt.position > 0 {
                        info!(
                            adapter = attempt.id,
                            position = attempt.position,
                            "fallback adapter completed the stream"
                        );
                    }
                    self.finished = true;
                    return Some(chunk);
                }
                Some(chunk) => {
                    attempt.produced_output |= chunk.is_output();
                    self.active = Some(attempt);
                    return Some(chunk);
                }
            }
        }
    }

    /// Activate the next admissible entry.
    ///
    /// Returns a chunk to emit right away: the pending `Reset` when a new
    /// attempt starts, or the terminal error once the chain is exhausted.
    fn start_next_attempt(&mut self) -> Option<StreamChunk> {
        let chain = self.chain;

        while let Some(entry) = chain.entries.get(self.next_position) {
            let position = self.next_position;
            self.next_position += 1;
            let id = entry.adapter.id();

            let permit = if entry.breaker.is_open() {
                None
            } else {
                entry.breaker.try_acquire().ok()
            };
            let Some(permit) = permit else {
                debug!(adapter = id, position, "skipping adapter with open circuit");
                self.skipped += 1;
                chain.record_event(position, FallbackReason::CircuitOpen);
                continue;
            };

            self.attempted += 1;
            self.active = Some(ActiveAttempt {
                position,
                id,
                stream: entry.adapter.stream(self.request),
                permit,
                produced_output: false,
            });
            // `None` here means the caller polls the new attempt immediately
            return self.pending_reset.take();
        }

        self.finished = true;
        let message = self.last_error.take().unwrap_or_else(|| {
            DispatchError::all_adapters_failed(self.attempted, self.skipped).to_string()
        });
        Some(StreamChunk::error(message))
    }

    fn fail(&mut self, attempt: ActiveAttempt<'a>, message: String) {
        attempt.permit.failure();
        warn!(
            adapter = attempt.id,
            position = attempt.position,
            error = %message,
            "adapter stream failed, trying next"
        );
        self.chain
            .record_event(attempt.position, FallbackReason::StreamError(message.clone()));

        self.pending_reset = attempt.produced_output.then(|| StreamChunk::Reset {
            from_adapter: attempt.id.to_string(),
            reason: message.clone(),
        });
        self.last_error = Some(message);
    }
}

impl FallbackChain {
    /// Stream a completion from the first adapter that finishes its stream.
    ///
    /// The returned stream always ends with exactly one `Done` or one
    /// `Error` chunk. Dropping it early releases the current breaker permit
    /// without recording an outcome.
    pub fn stream<'a>(&'a self, request: &'a CompletionRequest) -> CompletionStream<'a> {
        let state = ChainStream {
            chain: self,
            request,
            next_position: 0,
            active: None,
            pending_reset: None,
            last_error: None,
            attempted: 0,
            skipped: 0,
            finished: false,
        };

        Box::pin(futures::stream::unfold(state, |mut state| async move {
            let chunk = state.next_chunk().await?;
            Some((chunk, state))
        }))
    }
}
