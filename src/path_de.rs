//! serde_json deserialization that says *where* in the document it failed.
use serde::de::DeserializeOwned;

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    tracked(&mut serde_json::Deserializer::from_str(src))
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    tracked(&mut serde_json::Deserializer::from_slice(bytes))
}

fn tracked<'de, R, T>(de: &mut serde_json::Deserializer<R>) -> Result<T, String>
where
    R: serde_json::de::Read<'de>,
    T: DeserializeOwned,
{
    let value = serde_path_to_error::deserialize::<_, T>(&mut *de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })?;
    // reject trailing garbage, same as serde_json::from_str
    de.end().map_err(|err| format!("after document → {err}"))?;
    Ok(value)
}
