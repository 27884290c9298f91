use std::path::{Path, PathBuf};

pub const SLUG_FALLBACK: &str = "task";

/// Human-safe slug for a task title: lowercase, every maximal run of
/// characters outside [a-z0-9] collapsed to one hyphen, hyphens trimmed
/// from both ends. Empty or all-punctuation input yields the fixed
/// fallback so the result is always a valid branch/path component.
///
/// Must stay pure and deterministic: prompt generation, worktree creation,
/// and verification each derive the slug independently and nothing persists
/// it, so identical titles have to agree across those call sites.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut gap = false;
    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(ch);
        } else {
            gap = true;
        }
    }

    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

pub fn branch_name(prefix: &str, id: &str, slug: &str) -> String {
    format!("{prefix}{id}-{slug}")
}

pub fn worktree_dir(base: &Path, id: &str, slug: &str) -> PathBuf {
    base.join(format!("{id}-{slug}"))
}
