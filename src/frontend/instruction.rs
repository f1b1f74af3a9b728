//! This describes an assembled qes program.
//!
//! A program is a flat list of instructions; execution (by whoever runs
//! it) begins with the first one. Every instruction has a name, ordered
//! operands, and two kinds of modifiers:
//!
//! ```text
//! @annotation uncomputed h 0;     # a bare flag
//! @property timeout 2.5 wait;     # a named value
//! FOO: h 0;
//! jmp FOO;                        # label operands become relative offsets
//! repeat(3) { cx 0, 1; }          # expands to three copies
//! ```
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An operand or property value.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

/// Returned when a value is read as the wrong kind.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ValueError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected {} value, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueError {}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "an integer",
            Value::UInt(_) => "an unsigned integer",
            Value::Float(_) => "a float",
            Value::Str(_) => "a string",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_integer(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(v) => Ok(*v),
            _ => Err(self.mismatch("an integer")),
        }
    }

    pub fn as_unsigned(&self) -> Result<u64, ValueError> {
        match self {
            Value::UInt(v) => Ok(*v),
            _ => Err(self.mismatch("an unsigned integer")),
        }
    }

    pub fn as_float(&self) -> Result<f64, ValueError> {
        match self {
            Value::Float(v) => Ok(*v),
            _ => Err(self.mismatch("a float")),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::Str(v) => Ok(v),
            _ => Err(self.mismatch("a string")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Instruction {
    name: String,
    operands: Vec<Value>,
    annotations: BTreeSet<String>,
    properties: BTreeMap<String, Value>,
}

pub type Program = Vec<Instruction>;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Instruction {
    pub fn new<S: Into<String>>(name: S, operands: Vec<Value>) -> Self {
        Instruction {
            name: name.into(),
            operands,
            ..Instruction::default()
        }
    }

    /// Builds an instruction from any sequence of convertible operands.
    pub fn with_operands<S, I, V>(name: S, operands: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Instruction::new(name, operands.into_iter().map(Into::into).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operands(&self) -> &[Value] {
        &self.operands
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.operands.get(index)
    }

    pub fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn put_annotation<S: Into<String>>(&mut self, annotation: S) {
        self.annotations.insert(annotation.into());
    }

    /// Sets a property, replacing any earlier value under the same key.
    pub fn put_property<S: Into<String>, V: Into<Value>>(&mut self, key: S, value: V) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Appends the operands of `other` to this instruction's operands.
    pub fn join(&mut self, other: &Instruction) {
        self.operands.extend(other.operands.iter().cloned());
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.operands.iter_mut().chain(self.properties.values_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(-3).as_integer(), Ok(-3));
        assert_eq!(Value::UInt(3).as_unsigned(), Ok(3));
        assert_eq!(Value::Float(1.5).as_float(), Ok(1.5));
        assert_eq!(Value::from("q0").as_str(), Ok("q0"));

        let err = Value::from("q0").as_integer().unwrap_err();
        assert_eq!(err.expected, "an integer");
        assert_eq!(err.found, "a string");
        assert!(Value::Int(1).as_unsigned().is_err());
        assert!(Value::UInt(1).as_float().is_err());
        assert!(Value::Float(1.0).as_str().is_err());
    }

    #[test]
    fn test_modifiers() {
        let mut inst = Instruction::with_operands("cx", vec![0i64, 1]);
        assert_eq!(inst.name(), "cx");
        assert_eq!(inst.get(1), Some(&Value::Int(1)));
        assert_eq!(inst.get(2), None);

        inst.put_annotation("uncomputed");
        inst.put_annotation("uncomputed");
        assert!(inst.has_annotation("uncomputed"));
        assert_eq!(inst.annotations().len(), 1);

        inst.put_property("timeout", 2.5);
        inst.put_property("timeout", 3.5);
        assert!(inst.has_property("timeout"));
        assert_eq!(inst.property("timeout"), Some(&Value::Float(3.5)));
        assert_eq!(inst.properties().len(), 1);
        assert!(!inst.has_property("other"));
    }

    #[test]
    fn test_join() {
        let mut a = Instruction::with_operands("h", vec![0i64]);
        let b = Instruction::with_operands("h", vec!["x", "y"]);
        a.join(&b);
        assert_eq!(
            a.operands(),
            &[Value::Int(0), Value::from("x"), Value::from("y")]
        );
    }
}
