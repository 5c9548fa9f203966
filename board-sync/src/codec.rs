//! Query string encoding and decoding.
//!
//! The query backend carries sort state in the navigation URL
//! (`?autoreload=1&sortindex=3&desc=0`). Decoding is deliberately lenient:
//! a page must never fail to load because somebody hand-edited its URL.

use std::collections::HashMap;

/// Value of a decoded query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// `key=value`
    Present(String),
    /// `key` with no `=`.
    Missing,
}

impl ParamValue {
    /// Returns the value if one was given.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Returns `true` for a key that carried no value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Parameters parsed from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    params: HashMap<String, ParamValue>,
}

impl QueryParameters {
    /// Looks up a parameter, including keys without a value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Looks up a parameter value. Keys without a value return `None`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(ParamValue::as_str)
    }

    /// Returns `true` if the key appeared at all.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if no keys were parsed.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Decodes a raw query string such as `location.search`.
///
/// Returns `None` when the string is empty or a single character (a bare
/// `?`). A leading `?` is stripped. Each pair is split on its first `=`,
/// and key and value are percent-decoded independently. Later duplicates
/// overwrite earlier ones.
///
/// # Example
///
/// ```
/// use board_sync::codec::{decode_parameters, ParamValue};
///
/// let params = decode_parameters("?a=1&b").unwrap();
/// assert_eq!(params.value("a"), Some("1"));
/// assert_eq!(params.get("b"), Some(&ParamValue::Missing));
/// ```
pub fn decode_parameters(raw: &str) -> Option<QueryParameters> {
    if raw.chars().count() <= 1 {
        return None;
    }

    let query = raw.strip_prefix('?').unwrap_or(raw);
    let params = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (
                decode_component(key),
                ParamValue::Present(decode_component(value)),
            ),
            None => (decode_component(pair), ParamValue::Missing),
        })
        .collect();

    Some(params)
}

/// Encodes key/value pairs into a query string without the leading `?`.
pub fn encode_parameters<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-decodes a component.
///
/// Malformed escapes are kept as literal text and invalid UTF-8 is replaced,
/// so decoding never fails.
pub fn decode_component(component: &str) -> String {
    let bytes = urlencoding::decode_binary(component.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Bytes whose escapes survive [`decode_uri`].
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decodes a whole URI-like text, like [`decode_component`] but
/// leaving escapes of reserved characters (`%2F`, `%3F`, `%26`, ...) as they
/// are.
///
/// Server response bodies are decoded this way.
pub fn decode_uri(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut plain = 0;
    let mut i = 0;

    while i + 3 <= bytes.len() {
        let reserved = bytes[i] == b'%'
            && hex_pair(bytes[i + 1], bytes[i + 2]).is_some_and(|b| URI_RESERVED.contains(&b));
        if reserved {
            decoded.extend_from_slice(&urlencoding::decode_binary(&bytes[plain..i]));
            decoded.extend_from_slice(&bytes[i..i + 3]);
            i += 3;
            plain = i;
        } else {
            i += 1;
        }
    }
    decoded.extend_from_slice(&urlencoding::decode_binary(&bytes[plain..]));

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_pair(high: u8, low: u8) -> Option<u8> {
    let high = char::from(high).to_digit(16)?;
    let low = char::from(low).to_digit(16)?;
    u8::try_from(high * 16 + low).ok()
}
