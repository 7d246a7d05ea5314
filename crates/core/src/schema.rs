use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::{ProviderError, ResourceData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType { String, StringMap }

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub ty: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value means replacing the remote object.
    pub force_new: bool,
    pub default: Option<Json>,
}

impl Attribute {
    fn of(ty: AttributeType) -> Self {
        Self { ty, required: false, optional: false, computed: false, force_new: false, default: None }
    }

    pub fn required_string() -> Self { Self { required: true, ..Self::of(AttributeType::String) } }
    pub fn optional_string() -> Self { Self { optional: true, ..Self::of(AttributeType::String) } }
    pub fn computed_string() -> Self { Self { computed: true, ..Self::of(AttributeType::String) } }
    pub fn optional_map() -> Self { Self { optional: true, ..Self::of(AttributeType::StringMap) } }

    pub fn force_new(mut self) -> Self { self.force_new = true; self }
    pub fn computed(mut self) -> Self { self.computed = true; self }
    pub fn with_default(mut self, v: impl Into<Json>) -> Self { self.default = Some(v.into()); self }

    /// Only the remote side ever sets it.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self { Self::default() }

    pub fn with_attribute(mut self, name: &'static str, attr: Attribute) -> Self {
        self.attributes.insert(name, attr);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> { self.attributes.get(name) }

    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    pub fn apply_defaults(&self, d: &mut ResourceData) {
        for (name, attr) in &self.attributes {
            if let Some(default) = &attr.default {
                d.set_default(name, default.clone());
            }
        }
    }

    /// Checks configuration supplied by the user. Attributes not in the
    /// schema are ignored.
    pub fn validate(&self, d: &ResourceData) -> Result<(), ProviderError> {
        for (name, attr) in &self.attributes {
            let value = d.get(name);
            if attr.is_computed_only() {
                if value.is_some() && d.id().is_none() {
                    return Err(invalid(name, "computed attribute cannot be set"));
                }
                continue;
            }
            let Some(value) = value else {
                if attr.required {
                    return Err(ProviderError::MissingAttribute(name.to_string()));
                }
                continue;
            };
            match attr.ty {
                AttributeType::String => {
                    if !value.is_string() {
                        return Err(invalid(name, "expected a string"));
                    }
                }
                AttributeType::StringMap => {
                    let Some(map) = value.as_object() else {
                        return Err(invalid(name, "expected a map of strings"));
                    };
                    if let Some((k, _)) = map.iter().find(|(_, v)| !v.is_string()) {
                        return Err(invalid(name, &format!("value for key {k:?} is not a string")));
                    }
                }
            }
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> ProviderError {
    ProviderError::InvalidAttribute { name: name.to_string(), reason: reason.to_string() }
}
