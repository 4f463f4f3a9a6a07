// ABOUTME: URL resolution and normalization for feed links and media.
// ABOUTME: Resolves against xml:base / request URL and filters unusable media schemes.

use url::Url;

/// Schemes an enclosure may use.
const MEDIA_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Podcast-client pseudo schemes that really mean plain http.
const HTTP_ALIASES: &[&str] = &["feed", "itpc", "itms"];

/// Parses a base URL for resolution. Returns None for unparseable input.
pub fn parse_base(url: &str) -> Option<Url> {
    Url::parse(url.trim()).ok()
}

/// Resolves a possibly relative reference against an optional base.
/// Returns None when the reference is empty or cannot be made absolute.
pub fn resolve(base: Option<&Url>, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let reference = rewrite_http_alias(reference);
    match base {
        Some(base) => base.join(&reference).ok(),
        None => Url::parse(&reference).ok(),
    }
}

/// Resolves a link for display, keeping the raw text when resolution fails.
pub fn resolve_link(base: Option<&Url>, reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        resolve(base, trimmed)
            .map(String::from)
            .unwrap_or_else(|| trimmed.to_string()),
    )
}

/// Resolves a media URL; only http(s), ftp and file results are usable.
pub fn resolve_media_url(base: Option<&Url>, reference: &str) -> Option<String> {
    let url = resolve(base, reference)?;
    if !MEDIA_SCHEMES.contains(&url.scheme()) {
        return None;
    }
    Some(url.into())
}

/// Rewrites `feed://`, `itpc://` and `itms://` references to `http://`.
fn rewrite_http_alias(reference: &str) -> String {
    if let Some((scheme, rest)) = reference.split_once("://") {
        if HTTP_ALIASES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return format!("http://{}", rest);
        }
    }
    reference.to_string()
}

/// True when the text is already an absolute URL.
pub fn is_absolute(reference: &str) -> bool {
    Url::parse(reference.trim()).is_ok()
}

/// File name without extension of the last path segment, if any.
pub fn file_stem(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let name = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
