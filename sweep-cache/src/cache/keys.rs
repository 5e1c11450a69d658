//! Cache key composition
//!
//! Keys take the form `namespace:identifier[:params]`. Identifiers are
//! lower-cased so differently-cased wallet addresses share an entry. Params
//! are sorted by name, so the same set always produces the same key.
//!
//! Every variable segment is percent-encoded. A stored key therefore never
//! contains a glob metacharacter (`*`, `?`, `[`, `]`, `\`), and a segment never
//! contains a separator (`:`, `&`, `=`). Wildcards only appear where a pattern
//! helper puts them deliberately.
//!
//! ```
//! use sweep_cache::cache::keys::{self, CacheParams};
//!
//! let a = keys::tokens_key("0xABC", Some(&CacheParams::new().with("page", 1).with("limit", 50)));
//! let b = keys::tokens_key("0xabc", Some(&CacheParams::new().with("limit", 50).with("page", 1)));
//! assert_eq!(a, b);
//! assert_eq!(a, "tokens:0xabc:limit=50&page=1");
//! assert_eq!(keys::wallet_pattern("0xABC"), "tokens:0xabc:*");
//! ```

use crate::cache::types::CacheKey;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known key spaces used by the read routes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySpace {
    /// Wallet token-balance pages
    Tokens,

    /// Market price per token
    Price,

    /// Token image per chain and token
    TokenImage,

    /// Generic API response cache
    ApiResponse,

    /// Custom key space
    Custom(String),
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpace::Tokens => write!(f, "tokens"),
            KeySpace::Price => write!(f, "price"),
            KeySpace::TokenImage => write!(f, "token_image"),
            KeySpace::ApiResponse => write!(f, "api"),
            KeySpace::Custom(s) => write!(f, "{}", encode_segment(s)),
        }
    }
}

/// Pagination and filter parameters folded into a key
///
/// Backed by a sorted map, so insertion order never changes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheParams(BTreeMap<String, String>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical `k=v&k=v` rendering with sorted, encoded names and values
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", encode_segment(k), encode_segment(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for CacheParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = CacheParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Builder for ad-hoc keys
pub struct KeyBuilder {
    space: KeySpace,
    segments: Vec<String>,
    params: CacheParams,
}

impl KeyBuilder {
    /// Create a new key builder
    pub fn new(space: KeySpace) -> Self {
        Self {
            space,
            segments: Vec::new(),
            params: CacheParams::new(),
        }
    }

    /// Append an identifier segment (case-folded)
    pub fn identifier(mut self, id: impl AsRef<str>) -> Self {
        self.segments.push(normalize_identifier(id.as_ref()));
        self
    }

    /// Append a segment verbatim apart from encoding
    pub fn segment(mut self, segment: impl AsRef<str>) -> Self {
        self.segments.push(encode_segment(segment.as_ref()));
        self
    }

    /// Add a parameter to the key
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Merge a parameter set into the key
    pub fn params(mut self, params: &CacheParams) -> Self {
        for (k, v) in &params.0 {
            self.params.insert(k.clone(), v);
        }
        self
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        let mut key = self.space.to_string();

        for segment in &self.segments {
            key.push(':');
            key.push_str(segment);
        }

        if !self.params.is_empty() {
            key.push(':');
            key.push_str(&self.params.serialize());
        }

        key
    }

    /// Build a pattern matching every parameter variant under this prefix
    pub fn build_pattern(self) -> String {
        let mut pattern = KeyBuilder {
            params: CacheParams::new(),
            ..self
        }
        .build();
        pattern.push_str(":*");
        pattern
    }
}

/// Compose `logical_name:identifier[:params]`
///
/// The identifier is case-folded and every segment is encoded; an empty or
/// absent parameter set leaves the key without a params suffix.
pub fn compose_key(
    logical_name: &str,
    identifier: &str,
    params: Option<&CacheParams>,
) -> CacheKey {
    let builder =
        KeyBuilder::new(KeySpace::Custom(logical_name.to_string())).identifier(identifier);
    match params {
        Some(params) => builder.params(params).build(),
        None => builder.build(),
    }
}

/// Apply an optional namespace prefix
pub fn namespaced(key: &str, namespace: Option<&str>) -> CacheKey {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}:{}", encode_segment(ns), key),
        _ => key.to_string(),
    }
}

/// Key for a wallet's token balances, optionally for one page/filter variant
pub fn tokens_key(wallet: &str, params: Option<&CacheParams>) -> CacheKey {
    let builder = KeyBuilder::new(KeySpace::Tokens).identifier(wallet);
    match params {
        Some(params) => builder.params(params).build(),
        None => builder.build(),
    }
}

/// Key for a token's market price
pub fn price_key(token: &str) -> CacheKey {
    KeyBuilder::new(KeySpace::Price).identifier(token).build()
}

/// Key for a token image on a chain
pub fn token_image_key(chain: &str, address: &str) -> CacheKey {
    KeyBuilder::new(KeySpace::TokenImage)
        .segment(chain)
        .identifier(address)
        .build()
}

/// Key for a generic API response
pub fn api_response_key(endpoint: &str, params: Option<&CacheParams>) -> CacheKey {
    let builder = KeyBuilder::new(KeySpace::ApiResponse).segment(endpoint);
    match params {
        Some(params) => builder.params(params).build(),
        None => builder.build(),
    }
}

/// Pattern matching every parameter variant cached for a wallet
pub fn wallet_pattern(wallet: &str) -> String {
    KeyBuilder::new(KeySpace::Tokens)
        .identifier(wallet)
        .build_pattern()
}

/// Pattern matching every key under a namespace
pub fn namespace_pattern(namespace: &str) -> String {
    namespaced("*", Some(namespace))
}

/// Case-fold and encode an identifier such as a wallet or token address
pub fn normalize_identifier(id: &str) -> String {
    encode_segment(&id.trim().to_lowercase())
}

/// Percent-encode glob metacharacters, separators and `%` itself
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' | ':' | '*' | '?' | '[' | ']' | '\\' | '&' | '=' | ' ' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{:02X}", b));
                }
            }
            c => out.push(c),
        }
    }
    out
}
