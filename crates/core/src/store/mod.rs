//! Generic in-memory containers behind the record stores.

/// Ordered key/value tree.
pub mod keyed;
/// Append-only history.
pub mod sequence;

pub use keyed::KeyedStore;
pub use sequence::AppendOnlySequence;
