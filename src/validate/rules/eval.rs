#![deny(missing_docs)]

//! # Rule Evaluation
//!
//! Evaluates a compiled rule expression against a schema-adapted value.
//! `self` is bound to the value at the schema carrying the rule;
//! comprehension macros bind their iteration variable per element.
//! Evaluation is strict: type errors and missing fields surface as
//! `Err`, which the validator reports as a rule failure.

use crate::validate::equality::ListSemantics;
use crate::validate::rules::ast::{BinOp, Expr, MacroKind, UnaryOp};
use crate::validate::rules::parser::parse;
use crate::validate::rules::value::{rule_values_equal, Lister, Mapper, RuleValue, SchemaedList};
use regex::Regex;
use std::sync::Arc;

/// A rule compiled to an opaque evaluator.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Original rule source.
    pub source: String,
    expr: Expr,
}

impl CompiledRule {
    /// Compiles rule source. Failures carry the parse error message.
    pub fn compile(source: &str) -> Result<Self, String> {
        let expr = parse(source)?;
        Ok(CompiledRule {
            source: source.to_string(),
            expr,
        })
    }

    /// Evaluates the rule to a boolean with `self` bound to `root`.
    pub fn evaluate(&self, root: RuleValue) -> Result<bool, String> {
        match self.evaluate_value(root)? {
            RuleValue::Bool(b) => Ok(b),
            other => Err(format!(
                "rule '{}' evaluated to {} instead of a boolean",
                self.source,
                kind_name(&other)
            )),
        }
    }

    /// Evaluates the rule to any value (used by message expressions).
    pub fn evaluate_value(&self, root: RuleValue) -> Result<RuleValue, String> {
        let mut env = Env {
            bindings: vec![("self".to_string(), root)],
        };
        eval(&self.expr, &mut env)
    }
}

struct Env {
    bindings: Vec<(String, RuleValue)>,
}

impl Env {
    fn lookup(&self, name: &str) -> Option<&RuleValue> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }
}

fn kind_name(value: &RuleValue) -> &'static str {
    match value {
        RuleValue::Null => "null",
        RuleValue::Bool(_) => "bool",
        RuleValue::Int(_) => "int",
        RuleValue::Float(_) => "float",
        RuleValue::Str(_) => "string",
        RuleValue::List(_) => "list",
        RuleValue::Map(_) => "map",
    }
}

fn eval(expr: &Expr, env: &mut Env) -> Result<RuleValue, String> {
    match expr {
        Expr::Null => Ok(RuleValue::Null),
        Expr::Bool(b) => Ok(RuleValue::Bool(*b)),
        Expr::Int(i) => Ok(RuleValue::Int(*i)),
        Expr::Float(f) => Ok(RuleValue::Float(*f)),
        Expr::Str(s) => Ok(RuleValue::Str(s.clone())),
        Expr::List(items) => {
            let items: Result<Vec<RuleValue>, String> =
                items.iter().map(|item| eval(item, env)).collect();
            Ok(RuleValue::List(Arc::new(SchemaedList {
                items: items?,
                semantics: ListSemantics::Atomic,
            })))
        }
        Expr::Ident(name) => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| format!("unknown variable '{}'", name)),
        Expr::Member(target, field) => {
            let target = eval(target, env)?;
            match target {
                RuleValue::Map(map) => map
                    .get(field)
                    .cloned()
                    .ok_or_else(|| format!("no such field '{}'", field)),
                other => Err(format!(
                    "cannot access field '{}' on {}",
                    field,
                    kind_name(&other)
                )),
            }
        }
        Expr::Index(target, index) => {
            let target = eval(target, env)?;
            let index = eval(index, env)?;
            match (target, index) {
                (RuleValue::List(list), RuleValue::Int(i)) => {
                    let i = usize::try_from(i)
                        .map_err(|_| "negative list index".to_string())?;
                    list.item(i)
                        .cloned()
                        .ok_or_else(|| format!("list index {} out of range", i))
                }
                (RuleValue::Map(map), RuleValue::Str(key)) => map
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| format!("no such key '{}'", key)),
                (target, index) => Err(format!(
                    "cannot index {} with {}",
                    kind_name(&target),
                    kind_name(&index)
                )),
            }
        }
        Expr::Unary(op, inner) => {
            let inner = eval(inner, env)?;
            match (op, inner) {
                (UnaryOp::Not, RuleValue::Bool(b)) => Ok(RuleValue::Bool(!b)),
                (UnaryOp::Neg, RuleValue::Int(i)) => i
                    .checked_neg()
                    .map(RuleValue::Int)
                    .ok_or_else(|| "integer overflow".to_string()),
                (UnaryOp::Neg, RuleValue::Float(f)) => Ok(RuleValue::Float(-f)),
                (op, value) => Err(format!(
                    "cannot apply {:?} to {}",
                    op,
                    kind_name(&value)
                )),
            }
        }
        Expr::Binary(BinOp::And, left, right) => match eval(left, env)? {
            RuleValue::Bool(false) => Ok(RuleValue::Bool(false)),
            RuleValue::Bool(true) => expect_bool(eval(right, env)?),
            other => Err(format!("'&&' needs booleans, got {}", kind_name(&other))),
        },
        Expr::Binary(BinOp::Or, left, right) => match eval(left, env)? {
            RuleValue::Bool(true) => Ok(RuleValue::Bool(true)),
            RuleValue::Bool(false) => expect_bool(eval(right, env)?),
            other => Err(format!("'||' needs booleans, got {}", kind_name(&other))),
        },
        Expr::Binary(op, left, right) => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            eval_binary(*op, left, right)
        }
        Expr::Ternary(condition, then, otherwise) => match eval(condition, env)? {
            RuleValue::Bool(true) => eval(then, env),
            RuleValue::Bool(false) => eval(otherwise, env),
            other => Err(format!(
                "ternary condition must be a boolean, got {}",
                kind_name(&other)
            )),
        },
        Expr::Call { target, name, args } => eval_call(target.as_deref(), name, args, env),
        Expr::Macro {
            target,
            kind,
            var,
            body,
        } => eval_macro(target, *kind, var, body, env),
    }
}

fn expect_bool(value: RuleValue) -> Result<RuleValue, String> {
    match value {
        RuleValue::Bool(_) => Ok(value),
        other => Err(format!("expected a boolean, got {}", kind_name(&other))),
    }
}

fn eval_binary(op: BinOp, left: RuleValue, right: RuleValue) -> Result<RuleValue, String> {
    match op {
        BinOp::Eq => Ok(RuleValue::Bool(rule_values_equal(&left, &right))),
        BinOp::Ne => Ok(RuleValue::Bool(!rule_values_equal(&left, &right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, left, right),
        BinOp::In => membership(left, right),
        BinOp::Add => match (left, right) {
            (RuleValue::Str(x), RuleValue::Str(y)) => Ok(RuleValue::Str(x + &y)),
            (left, right) => arithmetic(op, left, right),
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arithmetic(op, left, right),
        BinOp::And | BinOp::Or => Err("short-circuit operators handled earlier".to_string()),
    }
}

fn arithmetic(op: BinOp, left: RuleValue, right: RuleValue) -> Result<RuleValue, String> {
    match (left, right) {
        (RuleValue::Int(x), RuleValue::Int(y)) => {
            let out = match op {
                BinOp::Add => x.checked_add(y),
                BinOp::Sub => x.checked_sub(y),
                BinOp::Mul => x.checked_mul(y),
                BinOp::Div => {
                    if y == 0 {
                        return Err("division by zero".to_string());
                    }
                    x.checked_div(y)
                }
                BinOp::Rem => {
                    if y == 0 {
                        return Err("modulo by zero".to_string());
                    }
                    x.checked_rem(y)
                }
                _ => None,
            };
            out.map(RuleValue::Int)
                .ok_or_else(|| "integer overflow".to_string())
        }
        (left, right) => {
            let x = as_float(&left)?;
            let y = as_float(&right)?;
            let out = match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Div => x / y,
                BinOp::Rem => x % y,
                _ => return Err("unsupported arithmetic operator".to_string()),
            };
            Ok(RuleValue::Float(out))
        }
    }
}

fn as_float(value: &RuleValue) -> Result<f64, String> {
    match value {
        RuleValue::Int(i) => Ok(*i as f64),
        RuleValue::Float(f) => Ok(*f),
        other => Err(format!("expected a number, got {}", kind_name(other))),
    }
}

fn compare(op: BinOp, left: RuleValue, right: RuleValue) -> Result<RuleValue, String> {
    let ordering = match (&left, &right) {
        (RuleValue::Str(x), RuleValue::Str(y)) => x.cmp(y),
        _ => {
            let x = as_float(&left)?;
            let y = as_float(&right)?;
            x.partial_cmp(&y)
                .ok_or_else(|| "incomparable numbers".to_string())?
        }
    };
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => return Err("unsupported comparison operator".to_string()),
    };
    Ok(RuleValue::Bool(result))
}

fn membership(left: RuleValue, right: RuleValue) -> Result<RuleValue, String> {
    match right {
        RuleValue::List(list) => Ok(RuleValue::Bool(
            list.items.iter().any(|item| rule_values_equal(item, &left)),
        )),
        RuleValue::Map(map) => match left {
            RuleValue::Str(key) => Ok(RuleValue::Bool(map.get(&key).is_some())),
            other => Err(format!(
                "'in' on a map needs a string key, got {}",
                kind_name(&other)
            )),
        },
        other => Err(format!("'in' needs a list or map, got {}", kind_name(&other))),
    }
}

fn eval_call(
    target: Option<&Expr>,
    name: &str,
    args: &[Expr],
    env: &mut Env,
) -> Result<RuleValue, String> {
    // has() inspects its argument unevaluated: the field may be absent.
    if target.is_none() && name == "has" {
        let [Expr::Member(member_target, field)] = args else {
            return Err("has() takes a single field-access argument".to_string());
        };
        let container = eval(member_target, env)?;
        return match container {
            RuleValue::Map(map) => Ok(RuleValue::Bool(map.get(field).is_some())),
            other => Err(format!("has() on {}", kind_name(&other))),
        };
    }

    let receiver = match target {
        Some(expr) => Some(eval(expr, env)?),
        None => None,
    };
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(eval(arg, env)?);
    }

    match (receiver.as_ref(), name, evaluated.as_slice()) {
        (Some(value), "size", []) | (None, "size", [value]) => size(value),
        (Some(RuleValue::Str(s)), "contains", [RuleValue::Str(needle)]) => {
            Ok(RuleValue::Bool(s.contains(needle.as_str())))
        }
        (Some(RuleValue::Str(s)), "startsWith", [RuleValue::Str(prefix)]) => {
            Ok(RuleValue::Bool(s.starts_with(prefix.as_str())))
        }
        (Some(RuleValue::Str(s)), "endsWith", [RuleValue::Str(suffix)]) => {
            Ok(RuleValue::Bool(s.ends_with(suffix.as_str())))
        }
        (Some(RuleValue::Str(s)), "matches", [RuleValue::Str(pattern)]) => {
            let regex = Regex::new(pattern)
                .map_err(|e| format!("bad regex in matches(): {}", e))?;
            Ok(RuleValue::Bool(regex.is_match(s)))
        }
        (Some(RuleValue::List(list)), "contains", [needle]) => Ok(RuleValue::Bool(
            list.items.iter().any(|item| rule_values_equal(item, needle)),
        )),
        (None, "string", [value]) => match value {
            RuleValue::Str(s) => Ok(RuleValue::Str(s.clone())),
            RuleValue::Int(i) => Ok(RuleValue::Str(i.to_string())),
            RuleValue::Float(f) => Ok(RuleValue::Str(f.to_string())),
            RuleValue::Bool(b) => Ok(RuleValue::Str(b.to_string())),
            other => Err(format!("string() on {}", kind_name(other))),
        },
        (None, "int", [value]) => match value {
            RuleValue::Int(i) => Ok(RuleValue::Int(*i)),
            RuleValue::Float(f) => Ok(RuleValue::Int(*f as i64)),
            RuleValue::Str(s) => s
                .parse::<i64>()
                .map(RuleValue::Int)
                .map_err(|e| format!("int('{}'): {}", s, e)),
            other => Err(format!("int() on {}", kind_name(other))),
        },
        (None, "double", [value]) => match value {
            RuleValue::Int(i) => Ok(RuleValue::Float(*i as f64)),
            RuleValue::Float(f) => Ok(RuleValue::Float(*f)),
            RuleValue::Str(s) => s
                .parse::<f64>()
                .map(RuleValue::Float)
                .map_err(|e| format!("double('{}'): {}", s, e)),
            other => Err(format!("double() on {}", kind_name(other))),
        },
        (receiver, name, _) => Err(match receiver {
            Some(value) => format!("unknown method {}() on {}", name, kind_name(value)),
            None => format!("unknown function {}()", name),
        }),
    }
}

fn size(value: &RuleValue) -> Result<RuleValue, String> {
    match value {
        RuleValue::Str(s) => Ok(RuleValue::Int(s.chars().count() as i64)),
        RuleValue::List(list) => Ok(RuleValue::Int(list.len() as i64)),
        RuleValue::Map(map) => Ok(RuleValue::Int(map.len() as i64)),
        other => Err(format!("size() on {}", kind_name(other))),
    }
}

fn eval_macro(
    target: &Expr,
    kind: MacroKind,
    var: &str,
    body: &Expr,
    env: &mut Env,
) -> Result<RuleValue, String> {
    let target = eval(target, env)?;
    let elements: Vec<RuleValue> = match &target {
        RuleValue::List(list) => list.items.clone(),
        // Maps iterate over their keys, like the expression languages
        // this grammar mirrors.
        RuleValue::Map(map) => map
            .keys()
            .into_iter()
            .map(|key| RuleValue::Str(key.to_string()))
            .collect(),
        other => {
            return Err(format!(
                "comprehension over {} is not supported",
                kind_name(other)
            ))
        }
    };

    let mut matched = 0usize;
    let mut filtered = Vec::new();
    let mut mapped = Vec::new();

    for element in elements {
        env.bindings.push((var.to_string(), element.clone()));
        let result = eval(body, env);
        env.bindings.pop();
        let result = result?;

        match kind {
            MacroKind::Map => mapped.push(result),
            _ => match result {
                RuleValue::Bool(true) => {
                    matched += 1;
                    if kind == MacroKind::Filter {
                        filtered.push(element);
                    }
                    if kind == MacroKind::Exists {
                        return Ok(RuleValue::Bool(true));
                    }
                }
                RuleValue::Bool(false) => {
                    if kind == MacroKind::All {
                        return Ok(RuleValue::Bool(false));
                    }
                }
                other => {
                    return Err(format!(
                        "comprehension body must be a boolean, got {}",
                        kind_name(&other)
                    ))
                }
            },
        }
    }

    match kind {
        MacroKind::All => Ok(RuleValue::Bool(true)),
        MacroKind::Exists => Ok(RuleValue::Bool(false)),
        MacroKind::ExistsOne => Ok(RuleValue::Bool(matched == 1)),
        MacroKind::Filter => Ok(RuleValue::List(Arc::new(SchemaedList {
            items: filtered,
            semantics: ListSemantics::Atomic,
        }))),
        MacroKind::Map => Ok(RuleValue::List(Arc::new(SchemaedList {
            items: mapped,
            semantics: ListSemantics::Atomic,
        }))),
    }
}
