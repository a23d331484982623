//! AI services: paragraph rephrasing and streamed diffs
//!
//! Both are external collaborators. This module owns only their request and
//! response shapes, the client seam, and cancellation behaviour.

mod diff_stream;
mod rephrase;

pub use diff_stream::{DiffChunk, DiffRequest, DiffStream, DiffStreamError, StreamEnd};
pub use rephrase::{
    refined_text, rephrase, split_paragraphs, streaming_refined_text, CommandRephraseClient,
    MockRephraseClient, RephraseClient, RephraseError, RephraseRequest, RephraseResponse,
};
