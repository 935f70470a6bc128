//! Logical-to-physical name resolution for one model

use chatstore_common::config::AdapterConfig;
use chatstore_common::schema::{FieldAttribute, ModelSchema, ID_FIELD};

/// One model of the registry seen through the adapter's key maps
#[derive(Clone, Copy)]
pub(crate) struct ModelView<'a> {
    /// Logical model name
    pub name: &'a str,
    pub schema: &'a ModelSchema,
    pub config: &'a AdapterConfig,
    /// Attribute used for `id` when the model does not declare one
    pub id_attribute: &'a FieldAttribute,
}

impl<'a> ModelView<'a> {
    pub fn attribute(&self, field: &str) -> Option<&'a FieldAttribute> {
        match self.schema.get(field) {
            Some(attribute) => Some(attribute),
            None if field == ID_FIELD => Some(self.id_attribute),
            None => None,
        }
    }

    /// Name a logical field is written and filtered under:
    /// `map_keys_transform_input`, then the declared physical name, then the
    /// logical name itself.
    pub fn physical_field(&self, field: &str) -> String {
        if let Some(mapped) = self.config.map_keys_transform_input.get(field) {
            return mapped.clone();
        }
        self.attribute(field)
            .map_or(field, |attribute| attribute.column(field))
            .to_string()
    }

    /// Key a logical field is read from in a raw backend record.
    ///
    /// Only `map_keys_transform_output` is consulted; the input map is never
    /// inverted.
    pub fn output_source_key(&self, field: &'a str, attribute: &'a FieldAttribute) -> &'a str {
        let original = attribute.column(field);
        self.config
            .map_keys_transform_output
            .iter()
            .find(|(_, logical)| logical.as_str() == original)
            .map_or(original, |(physical, _)| physical.as_str())
    }

    /// Every field of the model, `id` first
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a FieldAttribute)> + 'a {
        let schema = self.schema;
        std::iter::once((ID_FIELD, self.attribute(ID_FIELD).unwrap_or(self.id_attribute))).chain(
            schema
                .fields
                .iter()
                .filter(|(name, _)| name.as_str() != ID_FIELD)
                .map(|(name, attribute)| (name.as_str(), attribute)),
        )
    }

    /// True when integer key conversion applies to values of this field
    pub fn is_numeric_key(&self, field: &str) -> bool {
        field == ID_FIELD
            || self.attribute(field).is_some_and(|attribute| {
                attribute.references_id()
                    || attribute.field_type == chatstore_common::FieldType::Number
            })
    }
}
