//! Built-in template functions.
//!
//! The set is closed: templates may only call what is listed in [`Func`].

use serde_json::Value;

use super::exec::print_value;
use super::TemplateError;

/// A built-in function callable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// `orEmpty x`: null becomes `""`, anything else is returned unchanged.
    OrEmpty,
    /// `urlquery x...`: query-escape the printed arguments.
    UrlQuery,
    /// `index m k...`: look up `m[k]...` with dynamic keys.
    Index,
    /// `print x...`: concatenate printed arguments.
    Print,
}

impl Func {
    pub const ALL: [Func; 4] = [Func::OrEmpty, Func::UrlQuery, Func::Index, Func::Print];

    /// Resolve a function by the name used in templates.
    pub fn lookup(name: &str) -> Option<Func> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::OrEmpty => "orEmpty",
            Func::UrlQuery => "urlquery",
            Func::Index => "index",
            Func::Print => "print",
        }
    }

    /// Whether the function can be called with `argc` arguments.
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Func::OrEmpty => argc == 1,
            Func::Index => argc >= 1,
            Func::UrlQuery | Func::Print => true,
        }
    }

    pub(crate) fn call(self, args: Vec<Value>) -> Result<Value, TemplateError> {
        match self {
            Func::OrEmpty => Ok(or_empty(args.into_iter().next().unwrap_or(Value::Null))),
            Func::UrlQuery => {
                let printed = print_args(&args)?;
                Ok(Value::String(url::form_urlencoded::byte_serialize(printed.as_bytes()).collect()))
            }
            Func::Index => {
                let mut args = args.into_iter();
                let item = args.next().unwrap_or(Value::Null);
                args.try_fold(item, |item, key| index(item, &key))
            }
            Func::Print => Ok(Value::String(print_args(&args)?)),
        }
    }
}

/// Map a missing value to the empty string.
pub fn or_empty(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

fn index(item: Value, key: &Value) -> Result<Value, TemplateError> {
    match (item, key) {
        (Value::Object(mut map), Value::String(k)) => Ok(map.remove(k).unwrap_or(Value::Null)),
        (Value::Array(mut items), Value::Number(n)) => {
            let len = items.len();
            n.as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .filter(|&i| i < len)
                .map(|i| items.swap_remove(i))
                .ok_or_else(|| TemplateError::exec(format!("index out of range: {n}")))
        }
        (Value::Null, _) => Err(TemplateError::exec("index of untyped nil")),
        (Value::Object(_), _) => Err(TemplateError::exec("map index must be a string")),
        (Value::Array(_), _) => Err(TemplateError::exec("array index must be a non-negative integer")),
        (_, _) => Err(TemplateError::exec("can't index item of non-collection type")),
    }
}

/// Operands are separated by a space when neither side is a string.
fn print_args(args: &[Value]) -> Result<String, TemplateError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !args[i - 1].is_string() && !arg.is_string() {
            out.push(' ');
        }
        print_value(arg, &mut out)?;
    }
    Ok(out)
}
