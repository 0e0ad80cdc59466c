//! Types for the watch api
//!
//! See <https://kubernetes.io/docs/reference/using-api/api-concepts/#efficient-detection-of-changes>
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::Status;

/// A raw event returned from a watch query
///
/// Note that a watch query returns many of these as newline separated JSON.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K = Value> {
    /// Resource was added
    Added(K),
    /// Resource was modified
    Modified(K),
    /// Resource was deleted
    Deleted(K),
    /// Resource bookmark, carrying little more than a resource version
    ///
    /// From [Watch bookmarks](https://kubernetes.io/docs/reference/using-api/api-concepts/#watch-bookmarks).
    Bookmark(K),
    /// There was some kind of error
    Error(Status),
}

impl<K> WatchEvent<K> {
    /// The `type` of the event as sent on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Added(_) => "ADDED",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
            Self::Bookmark(_) => "BOOKMARK",
            Self::Error(_) => "ERROR",
        }
    }

    /// The object carried by a non-error event
    pub fn object(&self) -> Option<&K> {
        match self {
            Self::Added(k) | Self::Modified(k) | Self::Deleted(k) | Self::Bookmark(k) => Some(k),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_events() {
        let ev: WatchEvent = serde_json::from_str(r#"{"type":"ADDED","object":{"a":1}}"#).unwrap();
        assert_eq!(ev, WatchEvent::Added(json!({"a": 1})));
        assert_eq!(ev.event_type(), "ADDED");
        assert_eq!(ev.object(), Some(&json!({"a": 1})));

        let ev: WatchEvent = serde_json::from_str(
            r#"{"type":"ERROR","object":{"kind":"Status","apiVersion":"v1","status":"Failure","message":"too old resource version","reason":"Expired","code":410}}"#,
        )
        .unwrap();
        match ev {
            WatchEvent::Error(s) => {
                assert_eq!(s.code, 410);
                assert_eq!(s.reason, "Expired");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(serde_json::from_str::<WatchEvent>(r#"{"type":"RENAMED","object":{}}"#).is_err());
    }
}
