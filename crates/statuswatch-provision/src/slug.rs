//! Deterministic resource names derived from display names.

use statuswatch_core::types::{Member, UserId};

/// Longest name the platform accepts for a resource.
pub const MAX_NAME_LEN: usize = 90;

/// Lowercase ASCII slug of `display_name`: alphanumerics kept, every other
/// run of characters collapsed into a single `-`. `None` when nothing
/// usable remains.
pub fn slugify(display_name: &str) -> Option<String> {
    let mut slug = String::with_capacity(display_name.len());
    let mut pending_dash = false;

    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_NAME_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { None } else { Some(slug) }
}

/// Resource name for a member; falls back to `user-{id}`.
pub fn resource_name(member: &Member) -> String {
    slugify(&member.display_name).unwrap_or_else(|| format!("user-{}", member.id))
}

/// Name used when `base` is already taken by another member.
pub fn disambiguated(base: &str, owner: UserId) -> String {
    let suffix = format!("-{:04}", owner.get() % 10_000);
    let mut name = base.to_string();
    name.truncate(MAX_NAME_LEN - suffix.len());
    let mut name = name.trim_end_matches('-').to_string();
    name.push_str(&suffix);
    name
}
