//! Keyed reconciliation of repeated regions

pub mod diff;
pub mod keys;
pub mod region;

pub use diff::{reconcile, Edit};
pub use keys::{collect_items, content_hash, item_key, RepeatError, RepeatItem, RepeatMarker};
pub use region::{Instance, RepeatRegion, SyncSummary};
