
use std::{cmp::Reverse, num::NonZeroUsize};

use crate::error::{Error, Result};

/// One stored backup. `created` is the Unix millisecond timestamp embedded in
/// the backup's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub created: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    limit: NonZeroUsize,
}

impl RetentionPolicy {
    pub fn new(limit: u64) -> Result<Self> {
        let limit = usize::try_from(limit)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(Error::InvalidRetentionLimit)?;
        Ok(RetentionPolicy { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }
}

/// Returns the entries that fall outside the policy, newest first.
pub fn select_expired(mut entries: Vec<Entry>, policy: RetentionPolicy) -> Vec<Entry> {
    if entries.len() <= policy.limit() {
        return vec![];
    }

    entries.sort_by(|a, b| {
        (Reverse(a.created), Reverse(&a.name)).cmp(&(Reverse(b.created), Reverse(&b.name)))
    });
    entries.split_off(policy.limit())
}
