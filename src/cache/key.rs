//! Cache file naming
//!
//! Maps an opaque id to a single path component under the cache root.
//! Ids made of unreserved characters are used verbatim; anything else is
//! percent-encoded so an id can never escape the root.

use sha1::{Digest, Sha1};

/// Longest file name most filesystems accept
const MAX_NAME_LEN: usize = 255;

/// File name used for `id` under the cache root
///
/// Names never start with `.`; that prefix is reserved for in-flight temp
/// files. Ids whose encoding is empty or too long fall back to a SHA-1 hex
/// digest behind a `%sha1-` marker, which percent-encoding never produces.
pub fn file_name(id: &str) -> String {
    let mut name = urlencoding::encode(id).into_owned();
    if name.starts_with('.') {
        name.replace_range(..1, "%2E");
    }

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return hashed(id);
    }
    name
}

fn hashed(id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(id.as_bytes());
    format!("%sha1-{:x}", hasher.finalize())
}
