use std::collections::HashMap;

/// Rank of a process within the group. Rank 0 is the coordinator.
pub(crate) type Rank = u32;

/// Occurrence counts keyed by hashtag or language code.
pub(crate) type FrequencyMap = HashMap<String, u64>;

/// A contiguous slice of the corpus file, `[offset, offset + len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ByteRange {
    pub(crate) offset: u64,
    pub(crate) len: u64,
}

impl ByteRange {
    pub(crate) fn end(&self) -> u64 {
        self.offset + self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One rank's counting result. Workers hold theirs until the coordinator
/// asks for it; the coordinator folds every tally into its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Tally {
    pub(crate) hashtags: FrequencyMap,
    pub(crate) languages: FrequencyMap,
}

impl Tally {
    /// Merge rule: per-key sum, both maps.
    pub(crate) fn absorb(&mut self, other: &Tally) {
        for (tag, count) in &other.hashtags {
            *self.hashtags.entry(tag.clone()).or_default() += count;
        }
        for (lang, count) in &other.languages {
            *self.languages.entry(lang.clone()).or_default() += count;
        }
    }
}
