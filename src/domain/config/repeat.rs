//! Placeholder substitution and per-instance overrides for repeated test cases.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::domain::AppError;

/// One repeat entry: placeholder → replacement, plus the optional `_override` mapping.
pub type Substitution = Mapping;

pub const OVERRIDE_KEY: &str = "_override";

const NOT_OVERRIDABLE: &[&str] = &["repeat", "type"];

/// Replace every placeholder of `substitution` in `text`, in mapping order.
pub fn apply_substitutions(text: &str, substitution: &Substitution) -> Result<String, AppError> {
    let mut result = text.to_string();
    for (placeholder, replacement) in substitution {
        let placeholder = placeholder_name(placeholder)?;
        if placeholder == OVERRIDE_KEY {
            continue;
        }
        result = result.replace(placeholder, &replacement_text(placeholder, replacement)?);
    }
    Ok(result)
}

pub fn apply_to_optional(
    text: &Option<String>,
    substitution: &Substitution,
) -> Result<Option<String>, AppError> {
    text.as_deref().map(|text| apply_substitutions(text, substitution)).transpose()
}

fn placeholder_name(key: &Value) -> Result<&str, AppError> {
    key.as_str().ok_or_else(|| {
        AppError::config_error(format!("Repeat placeholders must be strings, got {:?}", key))
    })
}

fn replacement_text(placeholder: &str, value: &Value) -> Result<String, AppError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => Ok(text.clone()),
        Value::Tagged(tagged) => replacement_text(placeholder, &tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err(AppError::config_error(format!(
            "Replacement for placeholder \"{}\" must be a scalar",
            placeholder
        ))),
    }
}

/// Apply the substitution's `_override` entries to `instance`.
///
/// `fields` lists the top-level keys the instance's schema accepts.
pub fn apply_overrides<T>(
    instance: T,
    substitution: &Substitution,
    fields: &[&str],
    owner: &str,
) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(overrides) = substitution.get(OVERRIDE_KEY) else {
        return Ok(instance);
    };
    let Value::Mapping(overrides) = overrides else {
        return Err(AppError::config_error(format!(
            "Expected a mapping for repeat overrides of \"{}\"",
            owner
        )));
    };

    let mut data = match serde_yaml::to_value(&instance) {
        Ok(Value::Mapping(data)) => data,
        Ok(_) => {
            return Err(AppError::config_error(format!("\"{}\" cannot take overrides", owner)));
        }
        Err(err) => return Err(AppError::config_error(err.to_string())),
    };

    for (key, value) in overrides {
        let field = key.as_str().filter(|field| fields.contains(field)).ok_or_else(|| {
            AppError::config_error(format!(
                "Unrecognized field {:?} in repeat override for \"{}\"",
                key, owner
            ))
        })?;
        if NOT_OVERRIDABLE.contains(&field) {
            return Err(AppError::config_error(format!(
                "\"{}\" cannot be overridden in a repeat of \"{}\"",
                field, owner
            )));
        }

        match data.get_mut(field) {
            Some(existing) => deep_merge(existing, value),
            None => {
                data.insert(Value::String(field.to_string()), value.clone());
            }
        }
    }

    serde_yaml::from_value(Value::Mapping(data)).map_err(|err| {
        AppError::config_error(format!("Invalid repeat override for \"{}\": {}", owner, err))
    })
}

/// Mappings merge key by key; anything else replaces.
fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Mapping(target), Value::Mapping(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
