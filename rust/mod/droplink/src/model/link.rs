use serde::{Deserialize, Serialize};

/// An outbound link on a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 0-based display order within the profile.
    pub position: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Read from the `clicks` column; the JSON copy is not kept current.
    #[serde(default)]
    pub clicks: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Partial update. Absent fields are left alone; `icon: null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLink {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderLinks {
    pub link_ids: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Distinguishes a missing field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(d).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_link_distinguishes_null_from_missing() {
        let u: UpdateLink = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(u.title.as_deref(), Some("New"));
        assert!(u.icon.is_none());

        let u: UpdateLink = serde_json::from_str(r#"{"icon": null}"#).unwrap();
        assert_eq!(u.icon, Some(None));

        let u: UpdateLink = serde_json::from_str(r#"{"icon": "star"}"#).unwrap();
        assert_eq!(u.icon, Some(Some("star".to_string())));
    }
}
