//! Template evaluation.

use serde_json::Value;

use super::parse::{Command, Node, Operand, Pipeline};
use super::TemplateError;

/// Printed form of a missing value.
pub(crate) const NO_VALUE: &str = "<no value>";

static NULL: Value = Value::Null;

pub(crate) fn render(nodes: &[Node], ctx: &Value) -> Result<String, TemplateError> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipeline) => {
                let value = eval_pipeline(pipeline, ctx)?;
                print_value(&value, &mut out)?;
            }
        }
    }
    Ok(out)
}

fn eval_pipeline(pipeline: &Pipeline, ctx: &Value) -> Result<Value, TemplateError> {
    let mut piped = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, ctx, piped.take())?);
    }
    Ok(piped.unwrap_or(Value::Null))
}

fn eval_command(command: &Command, ctx: &Value, piped: Option<Value>) -> Result<Value, TemplateError> {
    match command {
        Command::Operand(op) => eval_operand(op, ctx),
        Command::Call { func, args } => {
            let mut values = args
                .iter()
                .map(|arg| eval_operand(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            values.extend(piped);
            func.call(values)
        }
    }
}

fn eval_operand(op: &Operand, ctx: &Value) -> Result<Value, TemplateError> {
    match op {
        Operand::Dot => Ok(ctx.clone()),
        Operand::Field(path) => lookup(ctx, path).cloned(),
        Operand::Str(s) => Ok(Value::String(s.clone())),
        Operand::Number(n) => Ok(Value::Number(n.clone())),
        Operand::Bool(b) => Ok(Value::Bool(*b)),
        Operand::Nil => Ok(Value::Null),
        Operand::Sub(pipeline) => eval_pipeline(pipeline, ctx),
    }
}

/// Top-level fields are fixed by the context and must exist; keys missing
/// from nested maps resolve to null.
fn lookup<'v>(ctx: &'v Value, path: &[String]) -> Result<&'v Value, TemplateError> {
    let mut current = ctx;
    for (depth, name) in path.iter().enumerate() {
        current = match current {
            Value::Object(map) => match map.get(name) {
                Some(v) => v,
                None if depth == 0 => {
                    return Err(TemplateError::exec(format!("can't evaluate field {name}")));
                }
                None => &NULL,
            },
            Value::Null => {
                return Err(TemplateError::exec(format!("nil pointer evaluating field {name}")));
            }
            other => {
                return Err(TemplateError::exec(format!(
                    "can't evaluate field {name} in type {}",
                    type_name(other)
                )));
            }
        };
    }
    Ok(current)
}

pub(crate) fn print_value(value: &Value, out: &mut String) -> Result<(), TemplateError> {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str(NO_VALUE),
        Value::Array(_) | Value::Object(_) => {
            let encoded = serde_json::to_string(value)
                .map_err(|e| TemplateError::exec(format!("can't print value: {e}")))?;
            out.push_str(&encoded);
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
