/// Case-insensitive literal matcher used by workers.
///
/// Both the query and each scanned line are folded to ASCII lowercase, which
/// keeps byte offsets stable: column numbers reported for the folded line are
/// valid for the original one.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    needle: Vec<u8>,
}

impl QueryMatcher {
    /// Creates a matcher for `query`, which must not be empty
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.as_bytes().to_ascii_lowercase(),
        }
    }

    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    /// Returns the 1-based column of every occurrence in `line`.
    ///
    /// After each hit the scan resumes one byte past the hit's start, so
    /// overlapping occurrences are all reported ("aa" in "aaa" gives 1 and 2).
    pub fn find_columns(&self, line: &[u8]) -> Vec<usize> {
        let needle = self.needle.as_slice();
        if needle.is_empty() || line.len() < needle.len() {
            return Vec::new();
        }

        let haystack = line.to_ascii_lowercase();
        let first = needle[0];
        let mut columns = Vec::new();
        let mut start = 0;
        while start + needle.len() <= haystack.len() {
            match haystack[start..=haystack.len() - needle.len()]
                .iter()
                .position(|&b| b == first)
            {
                Some(offset) => {
                    let pos = start + offset;
                    if &haystack[pos..pos + needle.len()] == needle {
                        columns.push(pos + 1);
                    }
                    start = pos + 1;
                }
                None => break,
            }
        }
        columns
    }
}
