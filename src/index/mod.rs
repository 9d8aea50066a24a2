//! Time-bounded inverted index: posting store, changeset staging, TTL
//! expiration, and snapshot maintenance

pub mod base_index;
pub mod changeset;
pub mod event_index;
pub mod expire_table;
pub mod manager;
pub mod posting;
pub mod snapshot;

pub use base_index::BaseIndex;
pub use changeset::{ChangeOp, Changeset};
pub use event_index::{BaseEventIndex, EventTuple};
pub use expire_table::{ExpireEntry, ExpireTable};
pub use manager::DocumentIndexManager;
pub use posting::PostingList;
pub use snapshot::{read_snapshot, write_snapshot, SnapshotData, SNAPSHOT_VERSION};

/// Unique document identifier; 0 is reserved invalid
pub type DocId = u64;

/// Term identifier; identical to the packed feature id
pub type TermId = crate::model::FeatureId;

/// Per-term document weight
pub type Weight = f32;

/// Posting expiration time, seconds since the Unix epoch
pub type ExpireTime = u32;

/// Reserved invalid document id
pub const INVALID_DOC_ID: DocId = 0;
