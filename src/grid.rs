//! Parameter grids and their Cartesian expansion.
//!
//! A grid maps parameter names to candidate values. Three keys are required
//! (`embeddings`, `vector_store`, `chunk_size`); any other key is carried
//! through to the info table as a free-form value.

use crate::config::Config;
use crate::embeddings::{EmbeddingHandle, EmbeddingSpec};
use crate::error::{Result, VectorboardError};
use crate::vector_store::VectorStoreKind;
use serde_yaml::Value;
use std::fmt;

pub const CHUNK_SIZE: &str = "chunk_size";
pub const VECTOR_STORE: &str = "vector_store";
pub const EMBEDDINGS: &str = "embeddings";

/// Required keys in the order they are checked.
pub const REQUIRED_KEYS: [&str; 3] = [EMBEDDINGS, VECTOR_STORE, CHUNK_SIZE];

/// A single candidate value in a grid.
#[derive(Clone)]
pub enum ParamValue {
    ChunkSize(usize),
    VectorStore(VectorStoreKind),
    Embeddings(EmbeddingHandle),
    /// Any other parameter, kept as display text.
    Scalar(String),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::ChunkSize(_) => "chunk size",
            ParamValue::VectorStore(_) => "vector store",
            ParamValue::Embeddings(_) => "embedding model",
            ParamValue::Scalar(_) => "scalar",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::ChunkSize(size) => write!(f, "{size}"),
            ParamValue::VectorStore(kind) => write!(f, "{kind}"),
            ParamValue::Embeddings(embedder) => write!(f, "{}", embedder.name()),
            ParamValue::Scalar(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::ChunkSize(size) => f.debug_tuple("ChunkSize").field(size).finish(),
            ParamValue::VectorStore(kind) => f.debug_tuple("VectorStore").field(kind).finish(),
            ParamValue::Embeddings(embedder) => {
                f.debug_tuple("Embeddings").field(&embedder.name()).finish()
            }
            ParamValue::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

/// Ordered mapping from parameter name to candidate values.
#[derive(Debug, Clone, Default)]
pub struct ParameterGrid {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter's candidates. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<ParamValue>) {
        let key = key.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.params.push((key, values)),
        }
    }

    pub fn chunk_sizes(mut self, sizes: impl IntoIterator<Item = usize>) -> Self {
        self.insert(CHUNK_SIZE, sizes.into_iter().map(ParamValue::ChunkSize).collect());
        self
    }

    pub fn vector_stores(mut self, kinds: impl IntoIterator<Item = VectorStoreKind>) -> Self {
        self.insert(
            VECTOR_STORE,
            kinds.into_iter().map(ParamValue::VectorStore).collect(),
        );
        self
    }

    pub fn embeddings(mut self, embedders: impl IntoIterator<Item = EmbeddingHandle>) -> Self {
        self.insert(
            EMBEDDINGS,
            embedders.into_iter().map(ParamValue::Embeddings).collect(),
        );
        self
    }

    /// Add a free-form parameter.
    pub fn param<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            key,
            values.into_iter().map(|v| ParamValue::Scalar(v.into())).collect(),
        );
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.params.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&[ParamValue]> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of combinations the grid expands to.
    pub fn combination_count(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.iter().map(|(_, v)| v.len()).product()
    }

    /// Check required keys and value types.
    pub fn validate(&self) -> Result<()> {
        for key in REQUIRED_KEYS {
            if self.get(key).is_none() {
                return Err(VectorboardError::MissingGridKey(key));
            }
        }

        for (key, values) in &self.params {
            let required = REQUIRED_KEYS.contains(&key.as_str());
            if required && values.is_empty() {
                return Err(VectorboardError::InvalidGrid(format!(
                    "'{key}' has no candidate values"
                )));
            }
            for value in values {
                let ok = match (key.as_str(), value) {
                    (CHUNK_SIZE, ParamValue::ChunkSize(size)) => {
                        if *size == 0 {
                            return Err(VectorboardError::InvalidGrid(
                                "chunk_size must be positive".to_string(),
                            ));
                        }
                        true
                    }
                    (VECTOR_STORE, ParamValue::VectorStore(_)) => true,
                    (EMBEDDINGS, ParamValue::Embeddings(_)) => true,
                    (_, ParamValue::Scalar(_)) => !required,
                    _ => false,
                };
                if !ok {
                    return Err(wrong_type(key, value));
                }
            }
        }
        Ok(())
    }

    /// Expand into every combination, last key varying fastest.
    pub fn combinations(&self) -> Result<Vec<ParameterCombination>> {
        self.validate()?;

        let mut rows: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];
        for (key, values) in &self.params {
            rows = rows
                .into_iter()
                .flat_map(|row| {
                    values.iter().map(move |value| {
                        let mut next = row.clone();
                        next.push((key.clone(), value.clone()));
                        next
                    })
                })
                .collect();
        }

        rows.into_iter().map(ParameterCombination::from_params).collect()
    }

    /// Parse a YAML grid file, resolving embedding specs with `config`.
    ///
    /// ```yaml
    /// chunk_size: [500, 1000]
    /// vector_store: [flat, {type: persistent, path: ./indexes}]
    /// embeddings:
    ///   - type: hashing
    ///   - {type: openai, model: text-embedding-3-small}
    /// ```
    pub fn from_yaml_str(content: &str, config: &Config) -> Result<Self> {
        let root: Value = serde_yaml::from_str(content)
            .map_err(|e| VectorboardError::InvalidGrid(format!("invalid grid YAML: {e}")))?;
        let Value::Mapping(mapping) = root else {
            return Err(VectorboardError::InvalidGrid(
                "grid file must be a mapping of parameter names to lists".to_string(),
            ));
        };

        let mut grid = Self::new();
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s,
                other => scalar_text(&other),
            };
            let items = match value {
                Value::Sequence(items) => items,
                single => vec![single],
            };

            let values = items
                .into_iter()
                .map(|item| parse_value(&key, item, config))
                .collect::<Result<Vec<_>>>()?;
            grid.insert(key, values);
        }
        Ok(grid)
    }
}

fn parse_value(key: &str, item: Value, config: &Config) -> Result<ParamValue> {
    match key {
        CHUNK_SIZE => item
            .as_u64()
            .map(|n| ParamValue::ChunkSize(n as usize))
            .ok_or_else(|| {
                VectorboardError::InvalidGrid(format!(
                    "chunk_size values must be positive integers, got {}",
                    scalar_text(&item)
                ))
            }),
        VECTOR_STORE => {
            let kind: VectorStoreKind = serde_yaml::from_value(tagged(item))
                .map_err(|e| VectorboardError::InvalidGrid(format!("vector_store: {e}")))?;
            Ok(ParamValue::VectorStore(kind))
        }
        EMBEDDINGS => {
            let spec: EmbeddingSpec = serde_yaml::from_value(tagged(item))
                .map_err(|e| VectorboardError::InvalidGrid(format!("embeddings: {e}")))?;
            Ok(ParamValue::Embeddings(spec.resolve(config)?))
        }
        _ => Ok(ParamValue::Scalar(scalar_text(&item))),
    }
}

/// `flat` is shorthand for `{type: flat}`.
fn tagged(item: Value) -> Value {
    match item {
        Value::String(name) => {
            let mut mapping = serde_yaml::Mapping::new();
            mapping.insert(Value::String("type".to_string()), Value::String(name));
            Value::Mapping(mapping)
        }
        other => other,
    }
}

fn wrong_type(key: &str, value: &ParamValue) -> VectorboardError {
    VectorboardError::InvalidGrid(format!(
        "'{key}' cannot hold a {} value ({value})",
        value.kind()
    ))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// One value per grid key.
#[derive(Clone)]
pub struct ParameterCombination {
    chunk_size: usize,
    vector_store: VectorStoreKind,
    embeddings: EmbeddingHandle,
    params: Vec<(String, ParamValue)>,
}

impl ParameterCombination {
    fn from_params(params: Vec<(String, ParamValue)>) -> Result<Self> {
        let value = |key: &'static str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or(VectorboardError::MissingGridKey(key))
        };

        let chunk_size = match value(CHUNK_SIZE)? {
            ParamValue::ChunkSize(size) => *size,
            other => return Err(wrong_type(CHUNK_SIZE, other)),
        };
        let vector_store = match value(VECTOR_STORE)? {
            ParamValue::VectorStore(kind) => kind.clone(),
            other => return Err(wrong_type(VECTOR_STORE, other)),
        };
        let embeddings = match value(EMBEDDINGS)? {
            ParamValue::Embeddings(embedder) => embedder.clone(),
            other => return Err(wrong_type(EMBEDDINGS, other)),
        };

        Ok(Self {
            chunk_size,
            vector_store,
            embeddings,
            params,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn vector_store(&self) -> &VectorStoreKind {
        &self.vector_store
    }

    pub fn embeddings(&self) -> &EmbeddingHandle {
        &self.embeddings
    }

    /// All (key, value) pairs in grid order.
    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Display text of each value, in grid order.
    pub fn labels(&self) -> Vec<String> {
        self.params.iter().map(|(_, v)| v.to_string()).collect()
    }
}

impl fmt::Debug for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterCombination")
            .field("params", &self.params)
            .finish()
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
