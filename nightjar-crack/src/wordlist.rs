/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Wordlist enumeration (smallest files first, so the cracker burns through
//! cheap lists before expensive ones) and the mutation expansion applied to
//! a newly cracked key before it's folded back into the learned dictionary
//! (§4.13).
//!
//! The suffix pool `{1, !, 123, 2024, 2025, 01, 69, 99}` and the three case
//! transforms (capitalize, upper, lower) are both named explicitly; their
//! exact combination into "the 15-variant expansion" is not. This crate
//! resolves it as: the three whole-word case folds, plus the original word
//! with each of the 8 suffixes appended, plus the lowercase form with the
//! 4 most common suffixes appended — 3 + 8 + 4 = 15. See DESIGN.md.

use std::fs;
use std::path::{Path, PathBuf};

pub const SUFFIXES: [&str; 8] = ["1", "!", "123", "2024", "2025", "01", "69", "99"];
const COMMON_SUFFIXES: [&str; 4] = ["1", "123", "2024", "!"];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Expand a single cracked key into its mutation family, for appending to
/// the learned dictionary. Always returns exactly 15 entries (duplicates
/// against the original word are left in; the caller is expected to
/// deduplicate against the wordlist file on disk if desired).
pub fn expand_variations(word: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(15);

    out.push(word.to_lowercase());
    out.push(word.to_uppercase());
    out.push(capitalize(word));

    for suffix in SUFFIXES {
        out.push(format!("{word}{suffix}"));
    }

    let lower = word.to_lowercase();
    for suffix in COMMON_SUFFIXES {
        out.push(format!("{lower}{suffix}"));
    }

    out
}

/// One enumerable wordlist file, ordered by ascending size so cheap lists
/// are attempted before expensive ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordlistEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// List every regular file directly under `wordlist_dir`, sorted smallest
/// first. A missing or unreadable directory yields an empty list rather
/// than an error — the crack manager treats "nothing to try" the same as
/// "no dictionaries configured yet".
pub fn enumerate_wordlists(wordlist_dir: &Path) -> Vec<WordlistEntry> {
    let entries = match fs::read_dir(wordlist_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %wordlist_dir.display(), %err, "wordlist directory unreadable");
            return Vec::new();
        }
    };

    let mut lists: Vec<WordlistEntry> = entries
        .flatten()
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(WordlistEntry { path: entry.path(), size_bytes: metadata.len() })
        })
        .collect();

    lists.sort_by_key(|entry| entry.size_bytes);
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_produces_exactly_fifteen_variants() {
        assert_eq!(expand_variations("password").len(), 15);
    }

    #[test]
    fn expansion_covers_all_three_case_folds() {
        let variants = expand_variations("Password");
        assert!(variants.contains(&"password".to_string()));
        assert!(variants.contains(&"PASSWORD".to_string()));
        assert!(variants.contains(&"Password".to_string()));
    }

    #[test]
    fn expansion_covers_every_named_suffix_on_the_original_word() {
        let variants = expand_variations("hunter2");
        for suffix in SUFFIXES {
            assert!(variants.contains(&format!("hunter2{suffix}")), "missing suffix {suffix}");
        }
    }

    #[test]
    fn capitalize_handles_empty_and_single_char_words() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("a"), "A");
    }

    #[test]
    fn enumerate_missing_directory_is_empty_not_an_error() {
        let lists = enumerate_wordlists(Path::new("/nonexistent/wordlists/dir"));
        assert!(lists.is_empty());
    }

    #[test]
    fn enumerate_sorts_smallest_file_first() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nightjar-wordlist-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("big.txt"), vec![b'a'; 1000]).unwrap();
        fs::write(dir.join("small.txt"), vec![b'a'; 10]).unwrap();

        let lists = enumerate_wordlists(&dir);
        assert_eq!(lists.len(), 2);
        assert!(lists[0].path.ends_with("small.txt"));
        assert!(lists[1].path.ends_with("big.txt"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
