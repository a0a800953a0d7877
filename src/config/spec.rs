use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use smallvec::SmallVec;

use crate::foundation::error::{BatchAugError, BatchAugResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct OpSpecDef {
    name: String,
    #[serde(default)]
    args: serde_json::Map<String, serde_json::Value>,
}

/// Named construction arguments for one operator or stage.
///
/// JSON form:
///
/// ```json
/// { "name": "Paste", "args": { "batch_size": 8, "n_channels": 3, "fill_value": 0 } }
/// ```
#[derive(Debug, Clone)]
pub struct OpSpec {
    def: OpSpecDef,
}

impl OpSpec {
    /// Create an empty spec for operator `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: OpSpecDef {
                name: name.into(),
                args: serde_json::Map::new(),
            },
        }
    }

    /// Builder-style argument setter. Later calls overwrite earlier ones.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.def.args.insert(key.into(), value.into());
        self
    }

    /// Parse a spec from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> BatchAugResult<Self> {
        let def: OpSpecDef = serde_json::from_reader(r)
            .map_err(|e| BatchAugError::config(format!("parse operator spec JSON: {e}")))?;
        Ok(Self { def })
    }

    /// Parse a spec from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> BatchAugResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            BatchAugError::config(format!("open operator spec '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Operator name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Return `true` when `key` was supplied.
    pub fn has_argument(&self, key: &str) -> bool {
        self.def.args.contains_key(key)
    }

    /// Typed lookup; `Ok(None)` when the argument is absent.
    pub fn argument<T: DeserializeOwned>(&self, key: &str) -> BatchAugResult<Option<T>> {
        self.def
            .args
            .get(key)
            .map(|v| self.decode_value(key, v))
            .transpose()
    }

    /// Typed lookup falling back to `default` when absent.
    pub fn argument_or<T: DeserializeOwned>(&self, key: &str, default: T) -> BatchAugResult<T> {
        Ok(self.argument(key)?.unwrap_or(default))
    }

    /// Read an argument given either as one value or as exactly `n` values.
    ///
    /// A single value (bare or as a one-element list) is broadcast to `n` copies. A list of any
    /// other length is rejected.
    pub fn single_or_repeated<T>(
        &self,
        key: &str,
        n: usize,
        default: T,
    ) -> BatchAugResult<SmallVec<[T; 4]>>
    where
        T: DeserializeOwned + Clone,
    {
        let values: Vec<T> = match self.def.args.get(key) {
            None => return Ok(SmallVec::from_elem(default, n)),
            Some(v @ serde_json::Value::Array(_)) => self.decode_value(key, v)?,
            Some(v) => vec![self.decode_value(key, v)?],
        };

        match values.len() {
            1 => Ok(SmallVec::from_elem(values[0].clone(), n)),
            len if len == n => Ok(SmallVec::from_vec(values)),
            len => Err(BatchAugError::config(format!(
                "{}: argument '{key}' expects 1 or {n} values, got {len}",
                self.def.name
            ))),
        }
    }

    fn decode_value<T: DeserializeOwned>(
        &self,
        key: &str,
        v: &serde_json::Value,
    ) -> BatchAugResult<T> {
        T::deserialize(v).map_err(|e| {
            BatchAugError::config(format!(
                "{}: argument '{key}' has the wrong type: {e}",
                self.def.name
            ))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/spec.rs"]
mod tests;
