/// Short stable id for a product URL: first 6 hex chars of its MD5.
pub fn short_url_hash(url: &str) -> String {
    let digest = md5::compute(url.as_bytes());
    format!("{digest:x}")[..6].to_string()
}

/// Lowercase, `&` → `and`, runs of non-alphanumerics → one `-`.
/// Blank input becomes `unknown`.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('&', "and");
    let mut slug = String::with_capacity(lowered.len());
    let mut last_dash = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}
