use serde_json::Value;

use crate::schema::PropertyDescriptor;
use crate::value::PropertyValue;

/// Optional per-type hook that gets first refusal on every property conversion.
///
/// Most content types do NOT need this: the built-in rules cover scalars,
/// arrays, choices, references and plain records.
///
/// Return `Ok(None)` to fall through to the built-in rules. A value returned
/// as `Ok(Some(..))` is assigned as-is; if the property cannot hold it, the
/// load fails with a conversion error. Errors are wrapped the same way.
pub trait ContentHandler: Send + Sync {
    /// Wire → property direction.
    fn convert_to_property(
        &self,
        property: &PropertyDescriptor,
        wire: &Value,
    ) -> anyhow::Result<Option<PropertyValue>> {
        let _ = (property, wire);
        Ok(None)
    }

    /// Property → wire direction.
    fn convert_from_property(
        &self,
        property: &PropertyDescriptor,
        value: &PropertyValue,
    ) -> anyhow::Result<Option<Value>> {
        let _ = (property, value);
        Ok(None)
    }
}
