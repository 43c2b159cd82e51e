//! Fork classification: decides whether a working copy is "yours to track".
//!
//! The username test is a plain substring test against the origin URL. It does not look at
//! URL path segments, so a short username can match an unrelated owner or host name
//! (`al` matches `github.com/alfred/...`). That is accepted behaviour and covered by tests.

/// How the discovery walker gates candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkFilter {
    /// No usernames configured: every repository with an origin is accepted.
    AcceptAll,
    Usernames(Vec<String>),
}

impl ForkFilter {
    pub fn from_usernames(usernames: Vec<String>) -> Self {
        let names: Vec<String> = usernames
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if names.is_empty() {
            ForkFilter::AcceptAll
        } else {
            ForkFilter::Usernames(names)
        }
    }

    pub fn accepts(&self, origin_url: Option<&str>, upstream_url: Option<&str>) -> bool {
        match self {
            ForkFilter::AcceptAll => true,
            ForkFilter::Usernames(names) => is_fork(origin_url, upstream_url, names),
        }
    }
}

/// True when an upstream remote with a non-empty URL exists, or when the origin URL
/// contains any (non-empty) username as a literal, case-sensitive substring.
pub fn is_fork(origin_url: Option<&str>, upstream_url: Option<&str>, usernames: &[String]) -> bool {
    if upstream_url.is_some_and(|u| !u.is_empty()) {
        return true;
    }
    match origin_url {
        Some(origin) => usernames
            .iter()
            .any(|u| !u.is_empty() && origin.contains(u.as_str())),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_origin_contains_username() {
        assert!(is_fork(
            Some("https://host/alice/x.git"),
            None,
            &users(&["alice"])
        ));
    }

    #[test]
    fn test_upstream_alone_is_sufficient() {
        assert!(is_fork(
            Some("https://host/bob/x.git"),
            Some("https://host/orig/x.git"),
            &[]
        ));
        // Even without an origin the predicate itself accepts; the walker drops origin-less repos.
        assert!(is_fork(None, Some("https://host/orig/x.git"), &[]));
    }

    #[test]
    fn test_foreign_origin_is_not_a_fork() {
        assert!(!is_fork(
            Some("https://host/bob/x.git"),
            None,
            &users(&["alice"])
        ));
        assert!(!is_fork(Some("https://host/bob/x.git"), None, &[]));
        assert!(!is_fork(None, None, &users(&["alice"])));
    }

    #[test]
    fn test_empty_upstream_url_does_not_count() {
        assert!(!is_fork(
            Some("https://host/bob/x.git"),
            Some(""),
            &users(&["alice"])
        ));
    }

    #[test]
    fn test_empty_username_never_matches() {
        assert!(!is_fork(Some("https://host/bob/x.git"), None, &users(&[""])));
    }

    #[test]
    fn test_substring_match_is_naive_by_choice() {
        // "al" is not the owner here, but the literal substring test still matches.
        assert!(is_fork(
            Some("git@github.com:alfred/tool.git"),
            None,
            &users(&["al"])
        ));
        // Case-sensitive.
        assert!(!is_fork(
            Some("https://host/Alice/x.git"),
            None,
            &users(&["alice"])
        ));
    }

    #[test]
    fn test_username_order_is_irrelevant_and_result_is_stable() {
        let origin = Some("ssh://git@host/carol/x.git");
        let a = users(&["alice", "carol", "bob"]);
        let b = users(&["bob", "alice", "carol"]);
        for _ in 0..3 {
            assert_eq!(is_fork(origin, None, &a), is_fork(origin, None, &b));
        }
        assert!(is_fork(origin, None, &a));
    }

    #[test]
    fn test_filter_from_blank_usernames_accepts_all() {
        let f = ForkFilter::from_usernames(users(&["", "  "]));
        assert_eq!(f, ForkFilter::AcceptAll);
        assert!(f.accepts(Some("https://host/anyone/x.git"), None));

        let f = ForkFilter::from_usernames(users(&[" alice "]));
        assert!(f.accepts(Some("https://host/alice/x.git"), None));
        assert!(!f.accepts(Some("https://host/bob/x.git"), None));
    }
}
