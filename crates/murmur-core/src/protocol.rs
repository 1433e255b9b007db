//! Protocol tags.
//!
//! A tag names the application protocol spoken on a stream so one transport
//! connection can carry several protocols. Listener and dialer must agree on
//! the tag or no conversation is established.

use std::{borrow::Cow, fmt};

use thiserror::Error;

/// Maximum encoded length of a protocol tag in bytes.
pub const MAX_TAG_LEN: usize = 256;

/// Tag of the murmur chat protocol.
pub const CHAT_PROTOCOL: ProtocolTag = ProtocolTag::from_static("/chat/1.0.0");

/// Errors from validating a protocol tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolTagError {
    /// Tag was empty or just `/`.
    #[error("protocol tag is empty")]
    Empty,

    /// Tag did not start with `/`.
    #[error("protocol tag must start with '/'")]
    MissingLeadingSlash,

    /// Tag exceeds [`MAX_TAG_LEN`].
    #[error("protocol tag is {len} bytes (max {MAX_TAG_LEN})")]
    TooLong {
        /// Actual length in bytes
        len: usize,
    },

    /// Tag contains whitespace, which would break line-based negotiation.
    #[error("protocol tag contains whitespace")]
    Whitespace,
}

/// Identifier of an application protocol, e.g. `/chat/1.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolTag(Cow<'static, str>);

impl ProtocolTag {
    /// Tag from a string constant.
    ///
    /// The constant is trusted to be well-formed; use [`ProtocolTag::new`] for
    /// anything read off the wire.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Validate and wrap a tag.
    pub fn new(tag: impl Into<String>) -> Result<Self, ProtocolTagError> {
        let tag = tag.into();
        validate(&tag)?;
        Ok(Self(Cow::Owned(tag)))
    }

    /// Tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate(tag: &str) -> Result<(), ProtocolTagError> {
    if tag.len() > MAX_TAG_LEN {
        return Err(ProtocolTagError::TooLong { len: tag.len() });
    }
    let rest = match tag.strip_prefix('/') {
        Some(rest) => rest,
        None if tag.is_empty() => return Err(ProtocolTagError::Empty),
        None => return Err(ProtocolTagError::MissingLeadingSlash),
    };
    if rest.is_empty() {
        return Err(ProtocolTagError::Empty);
    }
    if tag.chars().any(char::is_whitespace) {
        return Err(ProtocolTagError::Whitespace);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_protocol_is_valid() {
        assert_eq!(ProtocolTag::new(CHAT_PROTOCOL.as_str()), Ok(CHAT_PROTOCOL));
    }

    #[test]
    fn rejects_malformed_tags() {
        assert_eq!(ProtocolTag::new(""), Err(ProtocolTagError::Empty));
        assert_eq!(ProtocolTag::new("/"), Err(ProtocolTagError::Empty));
        assert_eq!(ProtocolTag::new("chat"), Err(ProtocolTagError::MissingLeadingSlash));
        assert_eq!(ProtocolTag::new("/chat 1"), Err(ProtocolTagError::Whitespace));
    }

    #[test]
    fn rejects_oversized_tag() {
        let tag = format!("/{}", "a".repeat(MAX_TAG_LEN));

        assert_eq!(ProtocolTag::new(tag), Err(ProtocolTagError::TooLong { len: MAX_TAG_LEN + 1 }));
    }
}
