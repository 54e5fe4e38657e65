use serde::{Deserialize, Deserializer, Serialize};

/// Customer record as returned by the remote customer service.
///
/// Not owned by this service: it is decoded from the remote reply and handed
/// back to the caller as-is. Each field keeps the remote's shape: absent stays
/// absent (`None`), an explicit `null` stays `null` (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
}

/// Called only for keys present in the input, so `null` lands as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl CustomerResponse {
    pub fn id(&self) -> Option<i64> {
        self.id.flatten()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|v| v.as_deref())
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_ref().and_then(|v| v.as_deref())
    }
}
