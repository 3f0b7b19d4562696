// Stream identity
//
// Streams are named `{category}:{version}-{threadId}`. The category carries
// no ':' and the version no '-', so the name splits unambiguously on the
// first occurrence of each separator. Schema evolution mints a new version
// segment; events already written are never rewritten.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default stream category for agent sessions.
pub const DEFAULT_CATEGORY: &str = "agent";

/// Default stream version segment.
pub const DEFAULT_VERSION: &str = "v0";

/// Error building or parsing a stream name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamNameError {
    #[error("stream category cannot be empty")]
    EmptyCategory,

    #[error("stream category cannot contain ':'")]
    CategoryContainsColon,

    #[error("stream version cannot be empty")]
    EmptyVersion,

    #[error("stream version cannot contain '-'")]
    VersionContainsDash,

    #[error("thread id cannot be empty")]
    EmptyThreadId,

    #[error("invalid stream name '{0}': expected category:version-threadId")]
    Malformed(String),
}

/// Generate a fresh thread identifier (UUIDv4, lowercase hyphenated).
pub fn generate_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// A validated stream name of the form `{category}:{version}-{threadId}`.
///
/// The whole identifier is case-sensitive. `StreamName` is the only way the
/// rest of the system constructs or interprets stream identifiers, so the
/// component invariants hold everywhere by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamName {
    category: String,
    version: String,
    thread_id: String,
}

impl StreamName {
    /// Build a stream name from its components, validating each.
    pub fn new(
        category: impl Into<String>,
        version: impl Into<String>,
        thread_id: impl Into<String>,
    ) -> Result<Self, StreamNameError> {
        let category = category.into();
        let version = version.into();
        let thread_id = thread_id.into();

        if category.trim().is_empty() {
            return Err(StreamNameError::EmptyCategory);
        }
        if category.contains(':') {
            return Err(StreamNameError::CategoryContainsColon);
        }
        if version.trim().is_empty() {
            return Err(StreamNameError::EmptyVersion);
        }
        if version.contains('-') {
            return Err(StreamNameError::VersionContainsDash);
        }
        if thread_id.trim().is_empty() {
            return Err(StreamNameError::EmptyThreadId);
        }

        Ok(Self {
            category,
            version,
            thread_id,
        })
    }

    /// Build a stream name for a thread under the default `agent:v0` scheme.
    pub fn for_thread(thread_id: impl Into<String>) -> Result<Self, StreamNameError> {
        Self::new(DEFAULT_CATEGORY, DEFAULT_VERSION, thread_id)
    }

    /// Parse a full stream name back into its components.
    pub fn parse(name: &str) -> Result<Self, StreamNameError> {
        let (category, rest) = name
            .split_once(':')
            .ok_or_else(|| StreamNameError::Malformed(name.to_string()))?;
        let (version, thread_id) = rest
            .split_once('-')
            .ok_or_else(|| StreamNameError::Malformed(name.to_string()))?;

        Self::new(category, version, thread_id)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// The category segment as Message DB sees it: everything before the
    /// first '-', i.e. `{category}:{version}`. Category reads use this.
    pub fn category_segment(&self) -> String {
        format!("{}:{}", self.category, self.version)
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.category, self.version, self.thread_id)
    }
}

impl TryFrom<String> for StreamName {
    type Error = StreamNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StreamName> for String {
    fn from(name: StreamName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_formats() {
        let name = StreamName::new("agent", "v0", "abc-123").unwrap();
        assert_eq!(name.to_string(), "agent:v0-abc-123");
        assert_eq!(name.category(), "agent");
        assert_eq!(name.version(), "v0");
        assert_eq!(name.thread_id(), "abc-123");
        assert_eq!(name.category_segment(), "agent:v0");
    }

    #[test]
    fn round_trips_through_parse() {
        let cases = [
            ("agent", "v0", "0d2f7a44-9f2e-4a57-9a93-2f3f1b6f6d8a"),
            ("agent", "v12", "thread"),
            ("support_bot", "v1", "has-dashes-inside"),
        ];
        for (category, version, thread_id) in cases {
            let built = StreamName::new(category, version, thread_id).unwrap();
            let parsed = StreamName::parse(&built.to_string()).unwrap();
            assert_eq!(parsed, built);
        }
    }

    #[test]
    fn rejects_invalid_components() {
        assert_eq!(
            StreamName::new("", "v0", "t").unwrap_err(),
            StreamNameError::EmptyCategory
        );
        assert_eq!(
            StreamName::new("a:b", "v0", "t").unwrap_err(),
            StreamNameError::CategoryContainsColon
        );
        assert_eq!(
            StreamName::new("agent", "", "t").unwrap_err(),
            StreamNameError::EmptyVersion
        );
        assert_eq!(
            StreamName::new("agent", "v-0", "t").unwrap_err(),
            StreamNameError::VersionContainsDash
        );
        assert_eq!(
            StreamName::new("agent", "v0", "  ").unwrap_err(),
            StreamNameError::EmptyThreadId
        );
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "agent", "agent:v0", "agentv0-thread", ":v0-t"] {
            assert!(StreamName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn generated_thread_ids_are_uuids() {
        let id = generate_thread_id();
        assert_eq!(uuid::Uuid::parse_str(&id).unwrap().get_version_num(), 4);
    }
}
