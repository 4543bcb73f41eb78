/// Lowercase ASCII slug: runs of anything that is not `[a-z0-9]` collapse to
/// one hyphen, and leading/trailing hyphens are dropped.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Slug for a newly created session. `token` must be unique per creation;
/// callers pass the creation time in milliseconds.
pub fn session_slug(title: &str, token: i64) -> String {
    let base = slugify(title);
    let base = if base.is_empty() { "session" } else { base.as_str() };
    format!("{}-{}", base, token)
}
