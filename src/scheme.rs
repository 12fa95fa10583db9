//! URL scheme restriction.

/// Which URL schemes may pass the scheme gate.
///
/// An empty restriction list means "no restriction", so a restricted set is
/// never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemeRestriction {
    /// Every scheme passes.
    #[default]
    All,
    /// Only these lowercase schemes pass.
    Only(Vec<String>),
}

impl SchemeRestriction {
    /// Build a restriction from a list of schemes, lowercasing each one.
    ///
    /// Duplicates are dropped, first occurrence wins. An empty list yields
    /// [`SchemeRestriction::All`].
    pub fn from_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for scheme in schemes {
            let scheme = normalize_scheme(scheme.as_ref());
            if !scheme.is_empty() && !normalized.contains(&scheme) {
                normalized.push(scheme);
            }
        }

        if normalized.is_empty() {
            Self::All
        } else {
            Self::Only(normalized)
        }
    }

    /// Check a scheme, case-insensitively.
    pub fn is_allowed(&self, scheme: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(schemes) => {
                let scheme = normalize_scheme(scheme);
                schemes.iter().any(|s| *s == scheme)
            }
        }
    }

    /// The normalized list, or `None` when unrestricted.
    pub fn schemes(&self) -> Option<Vec<String>> {
        match self {
            Self::All => None,
            Self::Only(schemes) => Some(schemes.clone()),
        }
    }
}

/// Lowercase and drop a trailing `:` so `"HTTPS:"` and `"https"` compare equal.
fn normalize_scheme(scheme: &str) -> String {
    scheme.trim().trim_end_matches(':').to_ascii_lowercase()
}
