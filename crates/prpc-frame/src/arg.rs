use std::fmt;

use crate::error::{FrameError, Result};

/// A single typed frame argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Arg {
    /// Name of the argument type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "int",
            Arg::Float(_) => "float",
            Arg::Bool(_) => "bool",
            Arg::Str(_) => "str",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Append the wire form of this argument to `out`.
    ///
    /// Fails for values the grammar cannot carry: non-finite floats, and
    /// strings that contain a newline or end with a backslash (which would
    /// escape the closing quote).
    pub fn encode_into(&self, out: &mut String) -> Result<()> {
        match self {
            Arg::Bool(v) => out.push_str(if *v { "yes" } else { "no" }),
            Arg::Int(v) => out.push_str(&v.to_string()),
            Arg::Float(v) => {
                if !v.is_finite() {
                    return Err(FrameError::UnsupportedArgumentType(format!(
                        "non-finite float {v}"
                    )));
                }
                out.push_str(&format_float(*v));
            }
            Arg::Str(v) => {
                if v.contains('\n') {
                    return Err(FrameError::UnsupportedArgumentType(
                        "string with embedded newline".to_string(),
                    ));
                }
                if v.ends_with('\\') {
                    return Err(FrameError::UnsupportedArgumentType(
                        "string ending with a backslash".to_string(),
                    ));
                }
                out.push('"');
                out.push_str(&v.replace('"', "\\\""));
                out.push('"');
            }
        }
        Ok(())
    }

    /// The wire form of this argument.
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

/// Fixed-point rendering that always carries a fractional part.
///
/// `f64`'s `Display` never switches to exponent notation and prints the
/// shortest representation that reads back to the same value, so only a
/// missing `.` needs patching (`3` → `3.0`).
fn format_float(v: f64) -> String {
    let mut text = v.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(text) => f.write_str(&text),
            Err(_) => match self {
                Arg::Float(v) => write!(f, "{v}"),
                Arg::Str(v) => write!(f, "{v:?}"),
                other => write!(f, "{other:?}"),
            },
        }
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

macro_rules! int_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Int(i64::from(v))
                }
            }
        )*
    };
}

int_arg!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(f64::from(v))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}
