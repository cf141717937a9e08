use rustc_hash::FxHashMap;

/// Longest-prefix index over the directory keys (`"./dir/"`, `"#alias/"`)
/// of a mapping table.
#[derive(Debug, Default, Clone)]
pub struct Trie<T> {
    inner: radix_trie::Trie<String, (String, Vec<T>)>,
}

impl<T> Trie<T> {
    /// Returns every value registered under the longest key that prefixes
    /// `key`, along with that key.
    pub fn get_ancestor<'a>(&'a self, key: &str) -> Option<(&'a str, &'a [T])> {
        self.inner.get_ancestor_value(&key.to_string()).map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: T) {
        let key = key.into();

        if let Some((_, values)) = self.inner.get_mut(&key) {
            values.push(value);
        } else {
            self.inner.insert(key.clone(), (key, vec![value]));
        }
    }
}

/// Lexically normalizes a package-relative path (`./a/../b` => `b`).
///
/// Returns `None` when a `..` segment would climb above the starting
/// directory. Empty and `.` segments are dropped, and a trailing slash is
/// preserved.
pub fn normalize_relative<P: AsRef<str>>(original: P) -> Option<String> {
    let original_str
        = original.as_ref();

    let mut out: Vec<&str>
        = Vec::new();

    for comp in original_str.split('/') {
        match comp {
            "" | "." => {
                // Those components don't progress the path
            },

            ".." => {
                out.pop()?;
            },

            comp => {
                out.push(comp)
            },
        }
    }

    let mut str
        = out.join("/");

    if original_str.ends_with('/') && !str.is_empty() {
        str.push('/');
    }

    Some(str)
}

pub fn has_segment<P: AsRef<str>>(path: P, segment: &str) -> bool {
    path.as_ref().split('/').any(|s| s == segment)
}

/// Counts how many times each key occurs; used to detect keys declared more
/// than once when a table is built from raw entries.
pub fn key_occurrences<'a, I: IntoIterator<Item = &'a str>>(keys: I) -> FxHashMap<&'a str, usize> {
    let mut counts = FxHashMap::default();

    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }

    counts
}
