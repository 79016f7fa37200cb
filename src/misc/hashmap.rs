use std::collections::HashSet as OriginalHashSet;
use std::hash::{BuildHasherDefault, Hasher};
use twox_hash::XxHash64;
use nohash_hasher::IntMap;

/// Hashset using more performant hashing algorithm
pub type HashSet<K> = OriginalHashSet<K, BuildHasherDefault<XxHash64>>;

/// HashMap for Int Types (column and row indices)
pub type HashMap<K,V> = IntMap<K,V>;

/// Stable 64 bit digest of a word sequence.
/// Used to derive reproducible random streams from search tree positions.
pub fn digest_words(seed: u64, words: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    for word in words {
        hasher.write_u64(word);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_seed_and_order() {
        assert_eq!(digest_words(1, [4, 5]), digest_words(1, [4, 5]));
        assert_ne!(digest_words(1, [4, 5]), digest_words(2, [4, 5]));
        assert_ne!(digest_words(1, [4, 5]), digest_words(1, [5, 4]));
    }
}
