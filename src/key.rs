use core::fmt;

use serde::{Deserialize, Serialize};

/// Namespace assumed for a key token without an explicit `ns:` prefix.
pub const DEFAULT_NAMESPACE: &str = "field";

/// Name that matches every key of a namespace when registered with a
/// [`BasicKeyResolver`](crate::resolver::BasicKeyResolver).
pub const WILDCARD: &str = "*";

/// Structured identifier addressing a key handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Key {
    pub namespace: String,
    pub name: String,
}

impl Key {
    pub fn new<N: Into<String>, M: Into<String>>(namespace: N, name: M) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Splits `ns:name` on the first `:`. Tokens without a namespace land
    /// in [`DEFAULT_NAMESPACE`].
    pub fn parse(token: &str) -> Self {
        Self::parse_with_default(token, DEFAULT_NAMESPACE)
    }

    pub fn parse_with_default(token: &str, default_namespace: &str) -> Self {
        let token = token.trim();
        match token.split_once(':') {
            Some((namespace, name)) => Key::new(namespace.trim(), name.trim()),
            None => Key::new(default_namespace, token),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    /// The wildcard pattern for this key's namespace.
    pub fn wildcard(&self) -> Key {
        Key::new(self.namespace.clone(), WILDCARD)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}
