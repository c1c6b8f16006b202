use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Args, PolicyError, PolicyResult};

/// Raw field values as submitted by a form or command line, keyed by path
/// such as `sequence`, `match/community` or `set/metric`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFields(pub Vec<(String, String)>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, value: &str) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: &str, value: &str) {
        self.0.push((path.to_string(), value.to_string()));
    }

    /// Last supplied value of the path. Blank values count as not supplied.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    /// Fields other than `keys`.
    pub fn without(&self, keys: &[&str]) -> RawFields {
        RawFields(
            self.0
                .iter()
                .filter(|(p, _)| !keys.contains(&p.as_str()))
                .cloned()
                .collect(),
        )
    }

    pub fn check_known(&self, keys: &[&str]) -> PolicyResult<()> {
        match self.0.iter().find(|(p, _)| !keys.contains(&p.as_str())) {
            Some((path, _)) => Err(PolicyError::invalid(path.as_str(), "unknown field")),
            None => Ok(()),
        }
    }

    pub fn required<T: FromStr>(&self, path: &str) -> PolicyResult<T> {
        match self.optional(path)? {
            Some(val) => Ok(val),
            None => Err(PolicyError::invalid(path, "required")),
        }
    }

    pub fn optional<T: FromStr>(&self, path: &str) -> PolicyResult<Option<T>> {
        let Some(raw) = self.get(path) else {
            return Ok(None);
        };
        raw.parse::<T>()
            .map(Some)
            .map_err(|_| PolicyError::invalid(path, format!("malformed value '{}'", raw)))
    }

    /// Free text such as a description, kept verbatim apart from trimming.
    pub fn text(&self, path: &str) -> Option<String> {
        self.get(path).map(|s| s.to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawFields(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One supplied field handed to a normalizer handler.
pub struct Input {
    pub field: String,
    pub raw: String,
    pub args: Args,
}

impl Input {
    pub fn new(field: &str, raw: &str) -> Self {
        Self {
            field: field.to_string(),
            raw: raw.trim().to_string(),
            args: Args::from_raw(raw),
        }
    }

    pub fn error(&self, reason: impl Into<String>) -> PolicyError {
        PolicyError::invalid(self.field.as_str(), reason)
    }

    /// Exactly one token of type T.
    pub fn single<T: FromStr>(&mut self) -> PolicyResult<T> {
        if self.args.len() != 1 {
            return Err(self.error("expects a single value"));
        }
        match self.args.parse::<T>() {
            Some(val) => Ok(val),
            None => Err(self.error(format!("malformed value '{}'", self.raw))),
        }
    }

    /// The value as written, for patterns which may contain separators.
    pub fn text(&self) -> String {
        self.raw.clone()
    }

    /// Every token, in order.
    pub fn list<T: FromStr>(&mut self) -> PolicyResult<Vec<T>> {
        let mut vals = Vec::new();
        while !self.args.is_empty() {
            match self.args.parse::<T>() {
                Some(val) => vals.push(val),
                None => {
                    let token = self.args.peek().unwrap_or_default().to_string();
                    return Err(self.error(format!("malformed value '{}'", token)));
                }
            }
        }
        Ok(vals)
    }

    /// Three valued flag, only called when the field was supplied.
    pub fn flag(&mut self) -> PolicyResult<bool> {
        if self.args.len() != 1 {
            return Err(self.error("expects true or false"));
        }
        self.args
            .boolean()
            .ok_or_else(|| self.error("expects true or false"))
    }
}
