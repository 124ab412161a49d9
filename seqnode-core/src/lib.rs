//! Seqnode Core - Sequence Node Types
//!
//! Pure data structures shared by the storage and API crates: the
//! identifier envelope, its derived cache key, cache entries, retrieval
//! results and the error taxonomy. No I/O happens here.

pub mod canonical;
pub mod entry;
pub mod error;
pub mod identifier;
pub mod key;

pub use canonical::to_canonical_json;
pub use entry::{CacheEntry, RetrievalResult};
pub use error::{
    CacheError, FieldViolation, SeqnError, SeqnResult, UpstreamError, ValidationError,
};
pub use identifier::{HttpMethod, SequenceNodeIdentifier, HUB_SESSION_HEADER, SEQUENCE_NODE_TYPE};
pub use key::{derive_key, SequenceNodeKey, KEY_HEX_LEN};
