//! Upgrade policy: which browser origins may open a signaling socket.

/// Decides whether an upgrade request's `Origin` header is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept every request, with or without an `Origin` header.
    #[default]
    AllowAny,

    /// Accept only requests whose `Origin` exactly matches one of these
    /// values (e.g. `https://app.example.com`). Requests without an
    /// `Origin` header are refused.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Builds a policy from a list of origins. An empty list allows any.
    pub fn from_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = origins
            .into_iter()
            .map(Into::into)
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if list.is_empty() {
            Self::AllowAny
        } else {
            Self::AllowList(list)
        }
    }

    /// Returns `true` if a request carrying `origin` may be upgraded.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match self {
            Self::AllowAny => true,
            Self::AllowList(list) => origin.is_some_and(|o| {
                let o = o.trim_end_matches('/');
                list.iter().any(|allowed| allowed == o)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_any_permits_missing_origin() {
        assert!(OriginPolicy::AllowAny.permits(None));
        assert!(OriginPolicy::AllowAny.permits(Some("https://evil.test")));
    }

    #[test]
    fn test_allow_list_matches_exactly() {
        let policy = OriginPolicy::from_origins(["https://app.test/"]);
        assert!(policy.permits(Some("https://app.test")));
        assert!(policy.permits(Some("https://app.test/")));
        assert!(!policy.permits(Some("https://app.test.evil")));
        assert!(!policy.permits(None));
    }

    #[test]
    fn test_from_origins_empty_is_allow_any() {
        let policy = OriginPolicy::from_origins(Vec::<String>::new());
        assert_eq!(policy, OriginPolicy::AllowAny);

        let policy = OriginPolicy::from_origins(["", "  "]);
        assert_eq!(policy, OriginPolicy::AllowAny);
    }
}
