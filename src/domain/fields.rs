//! Declared payload fields.

use crate::domain::entities::Payload;
use crate::domain::error::DomainError;

/// Pseudo-field answered from the node identity.
pub const ID_FIELD: &str = "id";
/// Pseudo-field carrying the tree id in exchange documents.
pub const TREE_ID_FIELD: &str = "treeId";

const RESERVED: [&str; 4] = [ID_FIELD, TREE_ID_FIELD, "lft", "rgt"];

/// Registry of the extra fields nodes may carry, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<String>,
}

impl FieldRegistry {
    /// Build a registry; reserved names and duplicates are rejected.
    pub fn new<I, S>(fields: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if RESERVED.contains(&field.as_str()) || field.is_empty() {
                return Err(DomainError::ReservedField(field));
            }
            if !declared.contains(&field) {
                declared.push(field);
            }
        }
        Ok(Self { fields: declared })
    }

    pub fn names(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Fails with `UnknownField` for the first undeclared key.
    pub fn validate(&self, payload: &Payload) -> Result<(), DomainError> {
        match payload.keys().find(|k| !self.contains(k)) {
            Some(unknown) => Err(DomainError::UnknownField(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Accepts declared fields and the `id` pseudo-field.
    pub fn validate_selector(&self, name: &str) -> Result<(), DomainError> {
        if name == ID_FIELD || self.contains(name) {
            Ok(())
        } else {
            Err(DomainError::UnknownField(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Value;

    #[test]
    fn given_reserved_name_when_declaring_then_rejected() {
        let result = FieldRegistry::new(["name", "lft"]);
        assert_eq!(result, Err(DomainError::ReservedField("lft".into())));
    }

    #[test]
    fn given_payload_with_unknown_key_when_validating_then_unknown_field() {
        let registry = FieldRegistry::new(["name"]).unwrap();
        let mut payload = Payload::new();
        payload.insert("name".into(), Value::from("a"));
        assert!(registry.validate(&payload).is_ok());

        payload.insert("color".into(), Value::from("red"));
        assert_eq!(
            registry.validate(&payload),
            Err(DomainError::UnknownField("color".into()))
        );
    }

    #[test]
    fn given_duplicates_when_declaring_then_first_order_kept() {
        let registry = FieldRegistry::new(["b", "a", "b"]).unwrap();
        assert_eq!(registry.names(), &["b".to_string(), "a".to_string()]);
    }
}
