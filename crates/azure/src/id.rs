use std::collections::BTreeMap;

use azlogic_core::ProviderError;

/// A parsed ARM resource path such as
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Logic/workflows/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    /// Remaining key/value segments, e.g. `workflows -> name`.
    pub path: BTreeMap<String, String>,
}

impl AzureResourceId {
    pub fn parse(id: &str) -> Result<Self, ProviderError> {
        if !id.starts_with('/') {
            return Err(ProviderError::invalid_id(id, "expected an absolute resource path"));
        }
        let path = id.split('?').next().unwrap_or_default();
        let path = path.trim_start_matches('/').trim_end_matches('/');
        let components: Vec<&str> = path.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(ProviderError::invalid_id(id, "the number of path segments is not divisible by 2"));
        }

        let mut segments = BTreeMap::new();
        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ProviderError::invalid_id(
                    id,
                    format!("key/value cannot be empty strings (key {key:?}, value {value:?})"),
                ));
            }
            segments.insert(key.to_string(), value.to_string());
        }

        let subscription_id = segments.remove("subscriptions")
            .ok_or_else(|| ProviderError::invalid_id(id, "no subscription id found"))?;
        // older resources were created with a lower-cased segment
        let resource_group = segments.remove("resourceGroups")
            .or_else(|| segments.remove("resourcegroups"))
            .ok_or_else(|| ProviderError::invalid_id(id, "no resource group name found"))?;
        let provider = segments.remove("providers");

        Ok(Self { subscription_id, resource_group, provider, path: segments })
    }

    /// Value of a typed path segment, e.g. `segment("workflows")`.
    pub fn segment(&self, key: &str) -> Result<&str, ProviderError> {
        self.path.get(key).map(String::as_str).ok_or_else(|| {
            ProviderError::invalid_id(self.to_string(), format!("no `{key}` segment found"))
        })
    }

    pub fn workflow(subscription_id: &str, resource_group: &str, name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: Some("Microsoft.Logic".to_string()),
            path: BTreeMap::from([("workflows".to_string(), name.to_string())]),
        }
    }
}

impl std::fmt::Display for AzureResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/subscriptions/{}/resourceGroups/{}", self.subscription_id, self.resource_group)?;
        if let Some(p) = &self.provider {
            write!(f, "/providers/{p}")?;
        }
        for (k, v) in &self.path {
            write!(f, "/{k}/{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WF: &str = "/subscriptions/0000/resourceGroups/rg1/providers/Microsoft.Logic/workflows/wf1";

    #[test]
    fn parses_workflow_id() {
        let id = AzureResourceId::parse(WF).unwrap();
        assert_eq!(id.subscription_id, "0000");
        assert_eq!(id.resource_group, "rg1");
        assert_eq!(id.provider.as_deref(), Some("Microsoft.Logic"));
        assert_eq!(id.segment("workflows").unwrap(), "wf1");
        assert_eq!(id.to_string(), WF);
    }

    #[test]
    fn accepts_lowercase_resource_groups_and_query() {
        let id = AzureResourceId::parse(
            "/subscriptions/0000/resourcegroups/rg1/providers/Microsoft.Logic/workflows/wf1?api-version=2016-06-01",
        ).unwrap();
        assert_eq!(id.resource_group, "rg1");
        assert_eq!(id.segment("workflows").unwrap(), "wf1");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in [
            "",
            "subscriptions/0000/resourceGroups/rg1",
            "/subscriptions/0000/resourceGroups",
            "/subscriptions/0000/providers/Microsoft.Logic",
            "/subscriptions//resourceGroups/rg1",
            "/resourceGroups/rg1/providers/Microsoft.Logic",
        ] {
            assert!(
                matches!(AzureResourceId::parse(bad), Err(ProviderError::InvalidIdentifier { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_segment_is_invalid_identifier() {
        let id = AzureResourceId::parse("/subscriptions/0000/resourceGroups/rg1").unwrap();
        assert!(matches!(id.segment("workflows"), Err(ProviderError::InvalidIdentifier { .. })));
    }

    #[test]
    fn builds_workflow_id() {
        assert_eq!(AzureResourceId::workflow("0000", "rg1", "wf1").to_string(), WF);
    }
}
