// ABOUTME: Maps XML namespaces of feed elements to the vocabularies the parser understands.
// ABOUTME: Tolerates known prefixes used without an xmlns declaration.

/// Canonical vocabulary of an element, independent of the prefix text used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ns {
    /// Unqualified RSS 2.0 elements.
    Rss,
    Atom,
    Itunes,
    Content,
    Media,
    /// Podlove Simple Chapters.
    Psc,
    /// Podcast Index `podcast:` namespace.
    Podcast,
    /// Any other vocabulary; such elements are skipped.
    Ignored,
}

/// How the tokenizer saw an element's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceRef<'a> {
    /// No prefix and no default namespace in scope.
    Unqualified,
    /// Bound to this URI, through a prefix or the default namespace.
    Uri(&'a str),
    /// A prefix with no matching xmlns declaration.
    UndeclaredPrefix(&'a str),
}

/// Resolves an element namespace to its canonical vocabulary.
pub fn resolve(ns: NamespaceRef<'_>) -> Ns {
    match ns {
        NamespaceRef::Unqualified => Ns::Rss,
        NamespaceRef::Uri(uri) => namespace_for_uri(uri).unwrap_or(Ns::Ignored),
        NamespaceRef::UndeclaredPrefix(prefix) => {
            let ns = namespace_for_prefix(prefix).unwrap_or(Ns::Ignored);
            log::debug!("no namespace declared for prefix {prefix:?}, using {ns:?}");
            ns
        }
    }
}

/// Looks up a namespace URI. Case, surrounding whitespace and a trailing
/// slash are not significant, since feeds disagree on all three.
pub fn namespace_for_uri(uri: &str) -> Option<Ns> {
    let normalized = uri.trim().trim_end_matches('/').to_ascii_lowercase();
    let ns = match normalized.as_str() {
        "http://www.itunes.com/dtds/podcast-1.0.dtd" => Ns::Itunes,
        "http://www.w3.org/2005/atom" => Ns::Atom,
        "http://search.yahoo.com/mrss" => Ns::Media,
        "http://podlove.org/simple-chapters" => Ns::Psc,
        "http://purl.org/rss/1.0/modules/content" => Ns::Content,
        "https://github.com/podcastindex-org/podcast-namespace/blob/main/docs/1.0.md"
        | "https://podcastindex.org/namespace/1.0" => Ns::Podcast,
        // Old RSS 2.0 drafts occasionally declare a default namespace.
        "http://backend.userland.com/rss2" | "http://blogs.law.harvard.edu/tech/rss" => Ns::Rss,
        _ => return None,
    };
    Some(ns)
}

/// Guesses the vocabulary from the conventional prefix alone.
pub fn namespace_for_prefix(prefix: &str) -> Option<Ns> {
    let ns = match prefix {
        "itunes" => Ns::Itunes,
        "atom" => Ns::Atom,
        "media" => Ns::Media,
        "psc" => Ns::Psc,
        "content" => Ns::Content,
        "podcast" => Ns::Podcast,
        _ => return None,
    };
    Some(ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_uris() {
        assert_eq!(
            resolve(NamespaceRef::Uri("http://www.itunes.com/DTDs/Podcast-1.0.dtd")),
            Ns::Itunes
        );
        assert_eq!(resolve(NamespaceRef::Uri("http://search.yahoo.com/mrss/")), Ns::Media);
        assert_eq!(resolve(NamespaceRef::Uri("http://search.yahoo.com/mrss")), Ns::Media);
        assert_eq!(resolve(NamespaceRef::Uri("http://www.w3.org/2005/Atom")), Ns::Atom);
        assert_eq!(
            resolve(NamespaceRef::Uri("https://podcastindex.org/namespace/1.0")),
            Ns::Podcast
        );
    }

    #[test]
    fn test_unknown_uri_is_ignored() {
        assert_eq!(resolve(NamespaceRef::Uri("http://example.com/")), Ns::Ignored);
    }

    #[test]
    fn test_unqualified_is_rss() {
        assert_eq!(resolve(NamespaceRef::Unqualified), Ns::Rss);
    }

    #[test]
    fn test_undeclared_prefix_fallback() {
        assert_eq!(resolve(NamespaceRef::UndeclaredPrefix("itunes")), Ns::Itunes);
        assert_eq!(resolve(NamespaceRef::UndeclaredPrefix("atom")), Ns::Atom);
        assert_eq!(resolve(NamespaceRef::UndeclaredPrefix("x")), Ns::Ignored);
    }
}
