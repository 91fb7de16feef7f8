//! MessageFilter trait - pre-decode inclusion predicate

use crate::RawRecord;

/// Decides whether a raw record enters decoding
///
/// Stateless by contract: one instance may be shared by several pipelines.
pub trait MessageFilter: Send + Sync {
    fn keep(&self, record: &RawRecord) -> bool;
}

impl<F> MessageFilter for F
where
    F: Fn(&RawRecord) -> bool + Send + Sync,
{
    fn keep(&self, record: &RawRecord) -> bool {
        self(record)
    }
}
