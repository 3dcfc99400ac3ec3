//! `ndbscu`: an inexact, order-tolerant pattern matcher over user-defined
//! symbol vocabularies. Given a stream of symbols, it locates stored
//! patterns ("Output Nodes") whose symbol sets partially or fully cover
//! substrings of the input, scores every candidate occurrence, and runs a
//! tournament among non-overlapping combinations to return the best
//! segmentation of the input into known patterns.
//!
//! The pipeline is: [`vocab::VocabularyStore`] (the fingerprint index) ->
//! [`candidate`] (candidate-bound-section generation) -> [`filter`] (the
//! threshold/filter cascade) -> [`branch`] (branch assembly) -> [`scu`]
//! (the Scoring & Competitive Unit tournament), driven end to end by
//! [`orchestrator::Engine`].

pub mod actions;
pub mod branch;
pub mod candidate;
pub mod error;
pub mod filter;
pub mod image;
pub mod metrics;
pub mod orchestrator;
pub mod scu;
pub mod stream;
pub mod types;
pub mod vocab;

pub use crate::error::NdbError;
pub use crate::orchestrator::{Engine, RecognitionOutcome, Segmentation};
pub use crate::scu::SCUConfig;
pub use crate::types::{
    Connection, Pattern, PatternId, RecognitionParameters, StoreType, Symbol, SymbolId,
    SymbolPayload, INQUIRY_LENGTH,
};
pub use crate::vocab::{FeatureSpec, PatternSpec, VocabularyStore};
