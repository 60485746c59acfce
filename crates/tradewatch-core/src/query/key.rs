// ── Fetch keys and key filters ──
//
// A key is an operation identifier plus an ordered parameter list.
// Operation identifiers are dot-separated (`trader.positions`), which
// lets a filter on `trader` address every trader query at once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use tradewatch_api::Endpoint;

/// One structurally comparable key parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyParam {
    Null,
    Bool(bool),
    /// Numbers keep their JSON text form so floats stay hashable.
    Number(String),
    Str(String),
    List(Vec<KeyParam>),
    Map(BTreeMap<String, KeyParam>),
}

impl From<Value> for KeyParam {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n.to_string()),
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for KeyParam {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for KeyParam {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for KeyParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for KeyParam {
    fn from(value: u32) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<i64> for KeyParam {
    fn from(value: i64) -> Self {
        Self::Number(value.to_string())
    }
}

impl fmt::Display for KeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(n),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Composite identifier of one cacheable remote query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    op: String,
    params: Vec<KeyParam>,
}

impl QueryKey {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            params: Vec::new(),
        }
    }

    /// Append one parameter.
    pub fn with(mut self, param: impl Into<KeyParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Build a key from an operation name and any serializable params.
    ///
    /// `()`/`null` contributes no parameter, a sequence contributes one
    /// parameter per element, anything else contributes a single one.
    pub fn from_serialize<P: Serialize + ?Sized>(op: impl Into<String>, params: &P) -> Self {
        let op = op.into();
        let value = serde_json::to_value(params).unwrap_or_else(|e| {
            warn!(op = %op, error = %e, "query params are not JSON-representable; keying on op only");
            Value::Null
        });
        let params = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(KeyParam::from).collect(),
            other => vec![KeyParam::from(other)],
        };
        Self { op, params }
    }

    /// Key for a gateway endpoint invocation.
    pub fn for_endpoint<E: Endpoint>(params: &E::Params) -> Self {
        Self::from_serialize(E::NAME, params)
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn params(&self) -> &[KeyParam] {
        &self.params
    }

    /// `true` if `self` addresses `other`: the operation segments of `self`
    /// prefix those of `other`, and, when `self` has params, the operations
    /// are equal and `self.params` prefixes `other.params`.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.params.is_empty() {
            let mut mine = self.op.split('.');
            let mut theirs = other.op.split('.');
            loop {
                match (mine.next(), theirs.next()) {
                    (None, _) => return true,
                    (Some(a), Some(b)) if a == b => {}
                    _ => return false,
                }
            }
        }
        self.op == other.op && other.params.starts_with(&self.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.op)?;
        if !self.params.is_empty() {
            f.write_str("[")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl From<&str> for QueryKey {
    fn from(op: &str) -> Self {
        Self::new(op)
    }
}

/// Selects cache entries for invalidation or removal.
#[derive(Clone)]
pub enum KeyFilter {
    All,
    Exact(QueryKey),
    Prefix(QueryKey),
    Predicate(Arc<dyn Fn(&QueryKey) -> bool + Send + Sync>),
}

impl KeyFilter {
    pub fn prefix(key: impl Into<QueryKey>) -> Self {
        Self::Prefix(key.into())
    }

    pub fn exact(key: impl Into<QueryKey>) -> Self {
        Self::Exact(key.into())
    }

    pub fn predicate(f: impl Fn(&QueryKey) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::All => true,
            Self::Exact(k) => k == key,
            Self::Prefix(p) => p.is_prefix_of(key),
            Self::Predicate(f) => f(key),
        }
    }
}

impl fmt::Debug for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Exact(k) => write!(f, "Exact({k})"),
            Self::Prefix(k) => write!(f, "Prefix({k})"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<QueryKey> for KeyFilter {
    fn from(key: QueryKey) -> Self {
        Self::Prefix(key)
    }
}
