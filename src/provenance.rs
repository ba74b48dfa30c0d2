//! Provenance markers embedded in destination descriptions.
//!
//! The marker `[remote-source:<TypeName>:<SourceId>]` is the only persisted
//! link between a copied object and its source. All formatting and parsing of
//! it happens here; callers deal in [`SourceIdentity`].

use crate::model::{ModelObject, ObjectKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const MARKER_PREFIX: &str = "remote-source";

static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[remote-source:([A-Za-z][A-Za-z0-9]*):(\d+)\]").expect("marker pattern is valid")
});

/// `(type, id)` of an object on the source server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceIdentity {
    pub kind: ObjectKind,
    pub id: i64,
}

impl SourceIdentity {
    pub fn new(kind: ObjectKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Marker text for this identity.
    pub fn marker(&self) -> String {
        format!("[{}:{}:{}]", MARKER_PREFIX, self.kind.type_name(), self.id)
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.id)
    }
}

/// Registry key of a source object; `None` until it has been persisted.
pub fn identity_of(object: &ModelObject) -> Option<SourceIdentity> {
    object.id().map(|id| SourceIdentity::new(object.kind(), id))
}

/// Append the marker after two newlines; an absent or empty description
/// becomes just the marker.
pub fn append_marker(description: Option<&str>, identity: &SourceIdentity) -> String {
    match description {
        Some(text) if !text.is_empty() => format!("{}\n\n{}", text, identity.marker()),
        _ => identity.marker(),
    }
}

/// First marker of the given type in `description`.
///
/// Markers of other types and ids that do not fit in an `i64` are ignored.
pub fn find_marker(description: &str, kind: ObjectKind) -> Option<SourceIdentity> {
    MARKER_PATTERN.captures_iter(description).find_map(|caps| {
        if &caps[1] != kind.type_name() {
            return None;
        }
        caps[2].parse::<i64>().ok().map(|id| SourceIdentity::new(kind, id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectRef, TagAnnotation};

    #[test]
    fn test_marker_format() {
        let identity = SourceIdentity::new(ObjectKind::TagAnnotation, 7);
        assert_eq!(identity.marker(), "[remote-source:TagAnnotation:7]");
    }

    #[test]
    fn test_append_marker_after_blank_line() {
        let identity = SourceIdentity::new(ObjectKind::TagAnnotation, 7);
        assert_eq!(
            append_marker(Some("Cell nuclei"), &identity),
            "Cell nuclei\n\n[remote-source:TagAnnotation:7]"
        );
        assert_eq!(append_marker(None, &identity), "[remote-source:TagAnnotation:7]");
        assert_eq!(append_marker(Some(""), &identity), "[remote-source:TagAnnotation:7]");
    }

    #[test]
    fn test_find_marker_matches_expected_type_only() {
        let text = "copied\n\n[remote-source:Image:3] [remote-source:TagAnnotation:42]";
        assert_eq!(
            find_marker(text, ObjectKind::TagAnnotation),
            Some(SourceIdentity::new(ObjectKind::TagAnnotation, 42))
        );
        assert_eq!(
            find_marker(text, ObjectKind::Image),
            Some(SourceIdentity::new(ObjectKind::Image, 3))
        );
        assert_eq!(find_marker(text, ObjectKind::Channel), None);
    }

    #[test]
    fn test_find_marker_ignores_malformed() {
        assert_eq!(find_marker("no marker here", ObjectKind::TagAnnotation), None);
        assert_eq!(
            find_marker("[remote-source:TagAnnotation:abc]", ObjectKind::TagAnnotation),
            None
        );
        assert_eq!(
            find_marker(
                "[remote-source:TagAnnotation:99999999999999999999999]",
                ObjectKind::TagAnnotation
            ),
            None
        );
    }

    #[test]
    fn test_identity_of_matches_marker_key() {
        let mut tag = TagAnnotation::default();
        assert_eq!(identity_of(&tag.clone().into()), None);
        tag.header.id = Some(7);
        let identity = identity_of(&tag.into()).unwrap();
        let parsed = find_marker(&append_marker(None, &identity), ObjectKind::TagAnnotation);
        assert_eq!(parsed, Some(identity));
        assert_eq!(
            ObjectRef::new(identity.kind, identity.id),
            ObjectRef::new(ObjectKind::TagAnnotation, 7)
        );
    }
}
