use regex::Regex;
use serde::{Deserialize, Deserializer, Serializer};

pub(super) fn serialize<S: Serializer>(
    value: &Option<Box<Regex>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        // Skipped when absent, so this arm isn't reached from a derive
        None => serializer.serialize_none(),
        Some(regex) => serializer.serialize_str(regex.as_str()),
    }
}

pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Box<Regex>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    // An empty pattern means "no check", same as leaving the field out.
    let regex: Option<String> = Option::deserialize(deserializer)?;
    match regex {
        None => Ok(None),
        Some(regex) if regex.is_empty() => Ok(None),
        Some(regex) => {
            let regex = Regex::new(&regex).map_err(|e| D::Error::custom(e.to_string()))?;
            Ok(Some(Box::new(regex)))
        }
    }
}
