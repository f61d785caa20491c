//! Credential routing.
//!
//! Different parts of the remote archive are served under different logins.
//! Each [`CredentialRule`] pairs a regular expression with a login; the first
//! rule whose pattern matches the root path of a walk wins.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// A username/password pair for the remote archive.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    password: String,
}
impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}
// Keep passwords out of logs and panic messages.
impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone)]
pub struct CredentialRule {
    pattern: Regex,
    credentials: Credentials,
}
impl CredentialRule {
    /// Compiles `pattern` and pairs it with a login.
    ///
    /// Returns [`InvalidPattern`](ErrorKind::InvalidPattern) if the pattern
    /// does not compile.
    pub fn new(pattern: &str, user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let compiled = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?;
        Ok(Self {
            pattern: compiled,
            credentials: Credentials::new(user, password),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, root: &str) -> bool {
        self.pattern.is_match(root)
    }
}

/// Resolves which login to use for a root path.
///
/// # Examples
///
/// ```
/// use ziptrawl_storage::{CredentialRouter, CredentialRule};
///
/// let router = CredentialRouter::new([
///     CredentialRule::new("^/out/", "fz223free", "fz223free").unwrap(),
///     CredentialRule::new(".*", "free", "free").unwrap(),
/// ]);
/// assert_eq!(router.resolve("/out/nsi/").unwrap().user, "fz223free");
/// assert_eq!(router.resolve("/fcs_regions/").unwrap().user, "free");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialRouter {
    rules: Vec<CredentialRule>,
}
impl CredentialRouter {
    pub fn new(rules: impl IntoIterator<Item = CredentialRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[CredentialRule] {
        &self.rules
    }

    /// Returns the credentials of the first rule matching `root`.
    ///
    /// Fails with [`NoCredentialRule`](ErrorKind::NoCredentialRule) when no
    /// rule applies; callers must never fall back to empty credentials.
    pub fn resolve(&self, root: &str) -> Result<&Credentials> {
        match self.rules.iter().find(|rule| rule.matches(root)) {
            Some(rule) => {
                tracing::debug!(root, pattern = rule.pattern(), user = %rule.credentials.user, "Resolved credentials");
                Ok(&rule.credentials)
            },
            None => exn::bail!(ErrorKind::NoCredentialRule(root.to_string())),
        }
    }
}
