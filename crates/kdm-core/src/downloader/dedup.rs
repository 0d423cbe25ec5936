//! Duplicate detection against the destination and the bucket.

use std::io;
use std::path::Path;

use crate::job::SkipReason;
use crate::storage;

/// Decide whether `final_path` needs a download at all.
///
/// In bucket mode a file already in the bucket is linked into place instead
/// of being fetched again. A destination that already exists is always kept.
pub(super) fn duplicate_check(final_path: &Path, bucket: Option<&Path>) -> io::Result<Option<SkipReason>> {
    let local = storage::existing_len(final_path)?.is_some();
    let in_bucket = match bucket {
        Some(b) => storage::existing_len(b)?.is_some(),
        None => false,
    };
    match (local, in_bucket, bucket) {
        (true, true, _) => Ok(Some(SkipReason::ExistsInBucket)),
        (true, false, _) => Ok(Some(SkipReason::AlreadyExists)),
        (false, true, Some(b)) => {
            storage::link_if_absent(b, final_path)?;
            Ok(Some(SkipReason::LinkedFromBucket))
        }
        _ => Ok(None),
    }
}
