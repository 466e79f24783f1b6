//! Runtime values crossing the dispatch boundary.

use std::fmt;
use std::sync::Arc;

/// A boxed runtime value.
///
/// The dispatch layer never computes with values; it only snapshots them into
/// locals mappings for guard evaluation and threads results back to callers.
/// This is the minimal surface hosts and guards exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value (implicit return).
    Unit,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Immutable string.
    Str(Arc<str>),
    /// Handle to a heap object owned by the host.
    Object(u64),
}

impl Value {
    /// Shorthand for building a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Self::Str(Arc::from(s.as_ref()))
    }

    /// Whether this is the unit value.
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Object(handle) => write!(f, "<object {handle:#x}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_values_compare_by_content() {
        assert_eq!(Value::str("spam"), Value::str("spam"));
        assert_ne!(Value::str("spam"), Value::str("eggs"));
    }

    #[test]
    fn display_formats_object_handles_in_hex() {
        assert_eq!(Value::Object(0xff).to_string(), "<object 0xff>");
    }
}
