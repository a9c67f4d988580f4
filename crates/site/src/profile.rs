//! The owner's profile, normalized from the actor profile record.

use burrow_embed::Blob;
use burrow_identity::Identity;
use serde_json::Value;

/// Profile data consumed by the page layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub did: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
}

impl Profile {
    /// A profile with nothing but the identity on it. What the page layer
    /// renders when the record is absent: empty sections, not an error page.
    pub(crate) fn minimal(identity: &Identity, handle: Option<String>) -> Self {
        Self {
            did: identity.did.clone(),
            handle,
            ..Self::default()
        }
    }

    /// Normalize the actor profile record value.
    ///
    /// Avatar and banner are content-addressed blobs in the record; both
    /// synthesize to URLs on the owner's data host.
    pub(crate) fn from_record(identity: &Identity, handle: Option<String>, value: &Value) -> Self {
        let text = |field: &str| {
            value.get(field).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        };
        let blob = |field: &str| {
            value
                .get(field)
                .cloned()
                .and_then(|raw| serde_json::from_value::<Blob>(raw).ok())
                .and_then(|blob| burrow_embed::blob_url(identity, blob.cid()))
        };
        Self {
            did: identity.did.clone(),
            handle,
            display_name: text("displayName"),
            description: text("description"),
            avatar: blob("avatar"),
            banner: blob("banner"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn identity() -> Identity {
        Identity {
            did: "did:plc:owner".to_string(),
            pds: Url::parse("https://pds.example.com").unwrap(),
        }
    }

    #[test]
    fn normalizes_text_and_blob_fields() {
        let value = json!({
            "displayName": "The Owner",
            "description": "writes things",
            "avatar": {"ref": {"$link": "bafy-avatar"}, "mimeType": "image/jpeg"}
        });
        let profile = Profile::from_record(&identity(), Some("owner.example".to_string()), &value);
        assert_eq!(profile.display_name.as_deref(), Some("The Owner"));
        assert_eq!(profile.handle.as_deref(), Some("owner.example"));
        assert!(profile.avatar.unwrap().contains("cid=bafy-avatar"));
        assert_eq!(profile.banner, None);
    }

    #[test]
    fn empty_strings_read_as_absent() {
        let profile = Profile::from_record(&identity(), None, &json!({"displayName": "  "}));
        assert_eq!(profile.display_name, None);
    }

    #[test]
    fn minimal_profile_keeps_the_identity() {
        let profile = Profile::minimal(&identity(), None);
        assert_eq!(profile.did, "did:plc:owner");
        assert_eq!(profile.display_name, None);
    }
}
