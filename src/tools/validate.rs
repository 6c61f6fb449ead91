//! JSON-Schema argument validation.
//!
//! The teacher only ever renders schemas as descriptive text for the system
//! prompt (`tools/schema.rs`) and never validates incoming arguments against
//! them. `jsonschema` is not used anywhere in the teacher but is a real
//! dependency elsewhere in this reference pack (several `other_examples`
//! manifests and `mofa-org-mofa/crates/mofa-foundation`), so it is brought
//! in here rather than hand-rolling a validator.

use jsonschema::Validator;
use serde_json::Value;

pub struct CompiledSchema {
    validator: Validator,
    raw: Value,
}

impl CompiledSchema {
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
        Ok(Self { validator, raw: schema.clone() })
    }

    /// Returns `Ok(())` if `arguments` satisfies the schema, otherwise a
    /// human-readable message naming the first violation (spec.md §4.2
    /// "Schema validation").
    pub fn validate(&self, arguments: &Value) -> Result<(), String> {
        if let Some(error) = self.validator.iter_errors(arguments).next() {
            return Err(format!("{} at {}", error, error.instance_path));
        }
        Ok(())
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
