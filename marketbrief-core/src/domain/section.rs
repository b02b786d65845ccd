//! Section: a value that a provider either delivered or did not.

use serde::{Deserialize, Serialize};

/// A snapshot or dataset section.
///
/// Serialized with an explicit `status` tag so that a provider outage is
/// recorded in the file instead of being confused with an empty result:
///
/// ```json
/// {"status": "available", "data": [...]}
/// {"status": "unavailable", "reason": "network unreachable: ..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Available { data: T },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn available(data: T) -> Self {
        Section::Available { data }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available { .. })
    }

    /// The delivered data, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Available { data } => Some(data),
            Section::Unavailable { .. } => None,
        }
    }

    /// Why the section is missing, if it is.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Section::Available { .. } => None,
            Section::Unavailable { reason } => Some(reason),
        }
    }

    /// Transform the delivered data, keeping an unavailable reason as-is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Section<U> {
        match self {
            Section::Available { data } => Section::Available { data: f(data) },
            Section::Unavailable { reason } => Section::Unavailable { reason },
        }
    }

    pub fn as_ref(&self) -> Section<&T> {
        match self {
            Section::Available { data } => Section::Available { data },
            Section::Unavailable { reason } => Section::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_status_tag() {
        let s: Section<Vec<u32>> = Section::available(vec![1, 2]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"status":"available","data":[1,2]}"#);

        let u: Section<Vec<u32>> = Section::unavailable("down");
        let json = serde_json::to_string(&u).unwrap();
        assert_eq!(json, r#"{"status":"unavailable","reason":"down"}"#);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = serde_json::from_str::<Section<u32>>(r#"{"status":"maybe","data":1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn map_keeps_reason() {
        let u: Section<u32> = Section::unavailable("timeout");
        let mapped = u.map(|v| v * 2);
        assert_eq!(mapped.reason(), Some("timeout"));
        assert_eq!(Section::available(2).map(|v| v * 2).data(), Some(&4));
    }
}
