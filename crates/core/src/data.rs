use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};

use crate::{ProviderError, ResourceId};

/// The host's record for one resource instance: its identity plus a flat
/// attribute object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ResourceId>,
    #[serde(default)]
    attributes: JsonMap<String, Json>,
}

impl ResourceData {
    pub fn new(attributes: JsonMap<String, Json>) -> Self {
        Self { id: None, attributes }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Some(ResourceId(id.into())), attributes: JsonMap::new() }
    }

    pub fn id(&self) -> Option<&ResourceId> { self.id.as_ref() }

    pub fn set_id(&mut self, id: impl Into<String>) { self.id = Some(ResourceId(id.into())); }

    /// Marks the remote object as gone. Attributes are left in place for the
    /// host to discard.
    pub fn clear_id(&mut self) { self.id = None; }

    pub fn attributes(&self) -> &JsonMap<String, Json> { &self.attributes }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Json::as_str)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ProviderError> {
        let v = serde_json::to_value(value).map_err(|e| ProviderError::InvalidAttribute {
            name: key.to_string(),
            reason: e.to_string(),
        })?;
        self.attributes.insert(key.to_string(), v);
        Ok(())
    }

    /// Insert `value` only when `key` has no non-null value yet.
    pub fn set_default(&mut self, key: &str, value: Json) {
        if self.get(key).is_none() {
            self.attributes.insert(key.to_string(), value);
        }
    }

    /// Decode the attributes into a typed configuration struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        serde_json::from_value(Json::Object(self.attributes.clone())).map_err(|e| {
            ProviderError::InvalidAttribute { name: "<config>".to_string(), reason: e.to_string() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Deserialize)]
    struct Cfg { name: String, #[serde(default)] tags: BTreeMap<String, String> }

    fn attrs(v: Json) -> JsonMap<String, Json> {
        match v { Json::Object(m) => m, _ => unreachable!() }
    }

    #[test]
    fn null_counts_as_unset() {
        let mut d = ResourceData::new(attrs(json!({ "name": null })));
        assert!(d.get("name").is_none());
        d.set_default("name", json!("x"));
        assert_eq!(d.get_str("name"), Some("x"));
        d.set_default("name", json!("y"));
        assert_eq!(d.get_str("name"), Some("x"));
    }

    #[test]
    fn decode_into_typed_config() {
        let d = ResourceData::new(attrs(json!({ "name": "wf", "tags": { "env": "dev" } })));
        let cfg: Cfg = d.decode().unwrap();
        assert_eq!(cfg.name, "wf");
        assert_eq!(cfg.tags.get("env").map(String::as_str), Some("dev"));
    }

    #[test]
    fn decode_reports_bad_shape() {
        let d = ResourceData::new(attrs(json!({ "name": 5 })));
        assert!(matches!(d.decode::<Cfg>(), Err(ProviderError::InvalidAttribute { .. })));
    }

    #[test]
    fn id_lifecycle() {
        let mut d = ResourceData::default();
        assert!(d.id().is_none());
        d.set_id("/a/b");
        assert_eq!(d.id().unwrap().as_str(), "/a/b");
        d.clear_id();
        assert!(d.id().is_none());
    }
}
