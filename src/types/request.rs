//! Inbound prediction request and its parsing rules

use crate::error::PredictError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Age used when a request does not carry one.
pub const DEFAULT_AGE: i64 = 30;

/// Gender used when a request does not carry one.
pub const DEFAULT_GENDER: &str = "M";

/// A single patient's inputs for one inference call.
///
/// `age` and `gender` stay `None` when the caller omitted them; the feature
/// extractor applies [`DEFAULT_AGE`] and [`DEFAULT_GENDER`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionRequest {
    /// Symptom name to presence flag (normally 0 or 1)
    pub symptoms: HashMap<String, i64>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    /// Symptom values that are not integer flags, kept raw. Only schema
    /// columns are held to the flag rule, at extraction time.
    unreadable: HashMap<String, Value>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symptom(mut self, name: impl Into<String>, flag: i64) -> Self {
        let name = name.into();
        self.unreadable.remove(&name);
        self.symptoms.insert(name, flag);
        self
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Raw value of a symptom that could not be read as a flag.
    pub fn unreadable_symptom(&self, name: &str) -> Option<&Value> {
        self.unreadable.get(name)
    }

    /// Age after defaulting.
    pub fn effective_age(&self) -> i64 {
        self.age.unwrap_or(DEFAULT_AGE)
    }

    /// Gender after defaulting.
    pub fn effective_gender(&self) -> &str {
        self.gender.as_deref().unwrap_or(DEFAULT_GENDER)
    }

    /// Parse a JSON payload.
    ///
    /// Absent or null fields take their defaults. Present fields of the wrong
    /// shape are rejected, except an unparseable `age` when `lenient_age` is
    /// set, which falls back to [`DEFAULT_AGE`]. Symptom values are not
    /// judged here; see [`PredictionRequest::unreadable_symptom`].
    pub fn from_json(payload: &[u8], lenient_age: bool) -> Result<Self, PredictError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| PredictError::MalformedRequest(format!("invalid JSON: {}", e)))?;
        Self::from_value(value, lenient_age)
    }

    pub fn from_value(value: Value, lenient_age: bool) -> Result<Self, PredictError> {
        let Value::Object(mut fields) = value else {
            return Err(malformed("payload must be a JSON object"));
        };

        let (symptoms, unreadable) = match fields.remove("symptoms") {
            None | Some(Value::Null) => Default::default(),
            Some(Value::Object(map)) => split_symptoms(map),
            Some(_) => return Err(malformed("'symptoms' must be an object")),
        };

        let age = match fields.remove("age") {
            None | Some(Value::Null) => None,
            Some(raw) => match parse_int(&raw) {
                Some(age) => Some(age),
                None if lenient_age => None,
                None => return Err(malformed(format!("'age' is not an integer: {}", raw))),
            },
        };

        let gender = match fields.remove("gender") {
            None | Some(Value::Null) => None,
            Some(Value::String(g)) => Some(g),
            Some(_) => return Err(malformed("'gender' must be a string")),
        };

        Ok(Self {
            symptoms,
            age,
            gender,
            unreadable,
        })
    }
}

fn malformed(reason: impl Into<String>) -> PredictError {
    PredictError::MalformedRequest(reason.into())
}

/// Separate readable flags from values that are not integers.
fn split_symptoms(map: Map<String, Value>) -> (HashMap<String, i64>, HashMap<String, Value>) {
    let mut flags = HashMap::with_capacity(map.len());
    let mut unreadable = HashMap::new();
    for (name, raw) in map {
        let flag = match &raw {
            Value::Bool(b) => Some(i64::from(*b)),
            other => parse_int(other),
        };
        match flag {
            Some(flag) => {
                flags.insert(name, flag);
            }
            None => {
                unreadable.insert(name, raw);
            }
        }
    }
    (flags, unreadable)
}

/// Integer, finite float (truncated) or integer string.
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
