//! Chunk ordering rules for streamed replies

use crate::protocol::ChatChunk;
use std::collections::BTreeSet;
use thiserror::Error;

/// Ways a chunk sequence can violate the streaming protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("stream ended without any chunks")]
    Empty,

    #[error("chunk id changed from '{expected}' to '{actual}'")]
    IdMismatch { expected: String, actual: String },

    #[error("chunk model changed from '{expected}' to '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("choice {index} received a chunk after its finish reason")]
    ChunkAfterFinish { index: u32 },

    #[error("stream ended before choices {pending:?} finished")]
    Unterminated { pending: Vec<u32> },
}

/// Incremental checker for a chunk sequence.
///
/// The first chunk fixes the stream's `id` and `model`. Each choice index is
/// open until a chunk carries a finish reason for it; after that the index
/// must not appear again. A stream is terminated once at least one choice
/// has been seen and every seen choice has finished.
#[derive(Debug, Default)]
pub struct StreamValidator {
    identity: Option<(String, String)>,
    open: BTreeSet<u32>,
    finished: BTreeSet<u32>,
    chunks: usize,
}

impl StreamValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the next chunk against everything seen so far
    pub fn observe(&mut self, chunk: &ChatChunk) -> Result<(), StreamError> {
        match &self.identity {
            None => {
                self.identity = Some((chunk.id.clone(), chunk.model.clone()));
            }
            Some((id, model)) => {
                if *id != chunk.id {
                    return Err(StreamError::IdMismatch {
                        expected: id.clone(),
                        actual: chunk.id.clone(),
                    });
                }
                if *model != chunk.model {
                    return Err(StreamError::ModelMismatch {
                        expected: model.clone(),
                        actual: chunk.model.clone(),
                    });
                }
            }
        }

        // Reject before mutating so a failed chunk leaves no partial state.
        let mut finishing = BTreeSet::new();
        for choice in &chunk.choices {
            if self.finished.contains(&choice.index) || finishing.contains(&choice.index) {
                return Err(StreamError::ChunkAfterFinish {
                    index: choice.index,
                });
            }
            if choice.finish_reason.is_some() {
                finishing.insert(choice.index);
            }
        }

        for choice in &chunk.choices {
            if finishing.contains(&choice.index) {
                self.open.remove(&choice.index);
                self.finished.insert(choice.index);
            } else {
                self.open.insert(choice.index);
            }
        }

        self.chunks += 1;
        Ok(())
    }

    /// Number of chunks accepted so far
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Whether every seen choice has finished
    pub fn is_terminated(&self) -> bool {
        !self.finished.is_empty() && self.open.is_empty()
    }

    /// Check that the stream may end here
    pub fn finish(&self) -> Result<(), StreamError> {
        if self.chunks == 0 {
            return Err(StreamError::Empty);
        }
        if !self.is_terminated() {
            return Err(StreamError::Unterminated {
                pending: self.open.iter().copied().collect(),
            });
        }
        Ok(())
    }
}

/// Validate a complete chunk sequence
pub fn validate_chunks(chunks: &[ChatChunk]) -> Result<(), StreamError> {
    let mut validator = StreamValidator::new();
    for chunk in chunks {
        validator.observe(chunk)?;
    }
    validator.finish()
}
