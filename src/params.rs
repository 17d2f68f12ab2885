use std::collections::BTreeMap;

use crate::errors::SpinError;

/// A dynamically typed parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Integer-valued parameter (extents, counts, seeds).
    Int(i64),
    /// Real-valued parameter (temperature, couplings).
    Float(f64),
    /// Tag parameter (model, lattice, update method).
    Str(String),
    /// Per-type coupling vector.
    Floats(Vec<f64>),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Floats(v)
    }
}

/// Name-to-value map driving model construction and runs.
///
/// Recognized keys: `"Model"`, `"Lattice"`, `"L"`, `"W"`, `"H"`, `"T"`,
/// `"J"`/`"Js"`, `"Q"`, `"S"`, `"Gs"`, `"Jxys"`, `"UpdateMethod"`, `"MCS"`,
/// `"Thermalization"`, `"Seed"`.
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    map: BTreeMap<String, ParamValue>,
}

impl Parameters {
    /// An empty parameter map.
    pub fn new() -> Self {
        Parameters::default()
    }

    /// Insert a value, chainable.
    pub fn with<V: Into<ParamValue>>(mut self, key: &str, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Insert a value in place.
    pub fn set<V: Into<ParamValue>>(&mut self, key: &str, value: V) {
        self.map.insert(key.to_string(), value.into());
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.map.get(key)
    }

    /// True if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// A required tag value.
    pub fn tag(&self, key: &str) -> Result<&str, SpinError> {
        match self.map.get(key) {
            Some(ParamValue::Str(s)) => Ok(s),
            Some(_) => Err(SpinError::param(key, "expected a tag string")),
            None => Err(SpinError::param(key, "missing")),
        }
    }

    /// A required real value; integers coerce.
    pub fn float(&self, key: &str) -> Result<f64, SpinError> {
        match self.map.get(key) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(_) => Err(SpinError::param(key, "expected a number")),
            None => Err(SpinError::param(key, "missing")),
        }
    }

    /// An optional real value.
    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, SpinError> {
        if self.map.contains_key(key) {
            self.float(key)
        } else {
            Ok(default)
        }
    }

    /// A required nonnegative integer.
    pub fn count(&self, key: &str) -> Result<usize, SpinError> {
        match self.map.get(key) {
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            Some(_) => Err(SpinError::param(key, "expected a nonnegative integer")),
            None => Err(SpinError::param(key, "missing")),
        }
    }

    /// An optional nonnegative integer.
    pub fn count_or(&self, key: &str, default: usize) -> Result<usize, SpinError> {
        if self.map.contains_key(key) {
            self.count(key)
        } else {
            Ok(default)
        }
    }

    /// An optional seed.
    pub fn seed(&self) -> Result<u64, SpinError> {
        match self.map.get("Seed") {
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as u64),
            Some(_) => Err(SpinError::param("Seed", "expected a nonnegative integer")),
            None => Ok(0),
        }
    }

    /// Per-type couplings under `vec_key`, or a scalar under `scalar_key`
    /// broadcast to `len` entries; `default` when neither is present.
    pub fn per_type(
        &self,
        scalar_key: &str,
        vec_key: &str,
        len: usize,
        default: f64,
    ) -> Result<Vec<f64>, SpinError> {
        match (self.map.get(vec_key), self.map.get(scalar_key)) {
            (Some(ParamValue::Floats(v)), _) => {
                if v.len() == len {
                    Ok(v.clone())
                } else {
                    Err(SpinError::param(
                        vec_key,
                        format!("expected {} entries, got {}", len, v.len()),
                    ))
                }
            }
            (Some(_), _) => Err(SpinError::param(vec_key, "expected a float vector")),
            (None, Some(_)) => Ok(vec![self.float(scalar_key)?; len]),
            (None, None) => Ok(vec![default; len]),
        }
    }

    /// The quantum spin length `S` as the sub-spin multiplicity `2S`.
    pub fn spin_multiplicity(&self) -> Result<usize, SpinError> {
        let s = self.float_or("S", 0.5)?;
        let twos = 2.0 * s;
        if twos < 1.0 || (twos - twos.round()).abs() > 1e-9 {
            return Err(SpinError::param("S", "expected a positive half-integer"));
        }
        Ok(twos.round() as usize)
    }
}
