use std::fmt::Display;
use std::num::ParseFloatError;
use std::rc::Rc;

use crate::func::Func;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Text(Rc<String>),
    Func(Rc<Func>),
}

impl Default for Value {
    fn default() -> Self {
        Self::Nil
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Number(l), Self::Number(r)) => l == r,
            (Self::Text(l), Self::Text(r)) => l == r,
            (Self::Func(l), Self::Func(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(val) => write!(f, "{val}"),
            Value::Number(val) => write!(f, "{val}"),
            Value::Text(val) => write!(f, "{val}"),
            Value::Func(val) => write!(f, "{val}"),
        }
    }
}

impl Value {
    pub fn func(func: Rc<Func>) -> Self {
        Value::Func(func)
    }

    pub fn text_from_str(value: &str) -> Self {
        Self::Text(Rc::new(value.to_string()))
    }

    pub fn text_from_string(value: String) -> Self {
        Self::Text(Rc::new(value))
    }

    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn number_from(s: &str) -> Result<Self, ParseFloatError> {
        Ok(Self::number(s.parse::<f64>()?))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<Rc<Func>> {
        match self {
            Value::Func(func_ref) => Some(func_ref.clone()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<Rc<String>> {
        match self {
            Value::Text(val) => Some(val.clone()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(value) => *value,
            _ => true,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum OperationError {
    TypeMismatch,
    DivisionByZero,
}

pub type ValueOperation = fn(&Value, &Value) -> Result<Value, OperationError>;

impl Value {
    pub fn add(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x + y)),
            (val, Value::Text(x)) => Ok(Value::text_from_string(format!("{val}{x}"))),
            (Value::Text(x), val) => Ok(Value::text_from_string(format!("{x}{val}"))),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn subtract(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x - y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn multiply(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x * y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn divide(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(_), Value::Number(y)) if *y == 0.0 => {
                Err(OperationError::DivisionByZero)
            }
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x / y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn modulo(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(_), Value::Number(y)) if *y == 0.0 => {
                Err(OperationError::DivisionByZero)
            }
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x % y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn power(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x.powf(*y))),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn equals(a: &Value, b: &Value) -> Result<Value, OperationError> {
        Ok(Value::Bool(a == b))
    }

    pub fn greater(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Bool(x > y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }

    pub fn less(a: &Value, b: &Value) -> Result<Value, OperationError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Bool(x < y)),
            _ => Err(OperationError::TypeMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_text() {
        let a = Value::text_from_str("abc");
        let b = Value::text_from_str("abc");
        let c = Value::text_from_str("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Value::equals(&a, &b), Ok(Value::Bool(true)));
    }

    #[test]
    fn modulo_and_power() {
        assert_eq!(
            Value::modulo(&Value::number(7.0), &Value::number(3.0)),
            Ok(Value::number(1.0))
        );
        assert_eq!(
            Value::power(&Value::number(2.0), &Value::number(10.0)),
            Ok(Value::number(1024.0))
        );
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(
            Value::divide(&Value::number(1.0), &Value::number(0.0)),
            Err(OperationError::DivisionByZero)
        );
        assert_eq!(
            Value::modulo(&Value::number(1.0), &Value::number(0.0)),
            Err(OperationError::DivisionByZero)
        );
    }
}
