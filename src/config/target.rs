//! Backend target parsing.

/// Where an integration should connect, decoded from a configured URL or target.
///
/// Configuration values double as mode selectors: `memory://` asks for the local
/// substitute directly, while an empty value, `disabled` or `none` turns the
/// integration off. Anything else is handed to the real backend driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    /// Use the in-process substitute.
    InMemory,
    /// No backend configured.
    Disabled,
    /// A real backend address.
    Remote(String),
}

impl BackendTarget {
    /// Sentinel scheme selecting the in-memory substitute.
    pub const MEMORY_SCHEME: &'static str = "memory://";

    /// Parses a configured URL or target.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with(Self::MEMORY_SCHEME) {
            return Self::InMemory;
        }
        match trimmed.to_lowercase().as_str() {
            "" | "disabled" | "none" => Self::Disabled,
            _ => Self::Remote(trimmed.to_string()),
        }
    }

    /// Parses an optional value, treating `None` as disabled.
    #[must_use]
    pub fn parse_optional(raw: Option<&str>) -> Self {
        raw.map_or(Self::Disabled, Self::parse)
    }

    /// Returns the remote address, if any.
    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Remote(url) => Some(url),
            Self::InMemory | Self::Disabled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("memory://", BackendTarget::InMemory; "memory sentinel")]
    #[test_case("memory://cache", BackendTarget::InMemory; "memory sentinel with suffix")]
    #[test_case("", BackendTarget::Disabled; "empty")]
    #[test_case("  ", BackendTarget::Disabled; "blank")]
    #[test_case("disabled", BackendTarget::Disabled; "disabled keyword")]
    #[test_case("NONE", BackendTarget::Disabled; "none keyword any case")]
    #[test_case("redis://localhost:6379/0", BackendTarget::Remote("redis://localhost:6379/0".to_string()); "redis url")]
    #[test_case(" localhost:50051 ", BackendTarget::Remote("localhost:50051".to_string()); "trimmed target")]
    fn test_parse(raw: &str, expected: BackendTarget) {
        assert_eq!(BackendTarget::parse(raw), expected);
    }

    #[test]
    fn test_parse_optional_none_is_disabled() {
        assert_eq!(BackendTarget::parse_optional(None), BackendTarget::Disabled);
    }

    #[test]
    fn test_remote_accessor() {
        assert_eq!(
            BackendTarget::parse("redis://cache:6379").remote(),
            Some("redis://cache:6379")
        );
        assert_eq!(BackendTarget::InMemory.remote(), None);
    }
}
