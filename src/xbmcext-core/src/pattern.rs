//! Route template compiler.
//!
//! A template is a `/`-separated path. Each segment is either literal text
//! or a placeholder:
//!
//! ```text
//! {name}                         capture one segment as a string
//! {name:type}                    capture and coerce (bool, float, int, str)
//! {name:constraint(args)}        capture text matching the constraint
//! {name:type:constraint(args)}   both
//! {:constraint(args)}            match the constraint without capturing
//! ```
//!
//! Constraints are looked up in a [`ConstraintTable`]. The built-in `re`
//! constraint takes one quoted argument and uses it verbatim as the
//! segment's regular expression, e.g. `/title/{id:re("tt\d{7}")}`.
//! Every problem is reported when the template is compiled, never later.

use crate::request::normalize_path;
use crate::value::Params;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const DEFAULT_SEGMENT: &str = "[^/]+";
const GROUP_PREFIX: &str = "_p";

/// Builds a segment regex from the quoted arguments of a constraint call.
/// The error string explains why the arguments were rejected.
pub type ConstraintBuilder = fn(&[String]) -> Result<String, String>;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("malformed placeholder {segment:?} in route {template:?}: {reason}")]
    MalformedPlaceholder {
        template: String,
        segment: String,
        reason: String,
    },
    #[error("unknown parameter type {kind:?} in route {template:?}")]
    UnknownType { template: String, kind: String },
    #[error("unknown constraint {name:?} in route {template:?}")]
    UnknownConstraint { template: String, name: String },
    #[error("constraint {name:?} rejected its arguments in route {template:?}: {reason}")]
    InvalidConstraint {
        template: String,
        name: String,
        reason: String,
    },
    #[error("parameter {name:?} appears more than once in route {template:?}")]
    DuplicateParameter { template: String, name: String },
    #[error("route {template:?} does not compile to a valid regex: {source}")]
    Regex {
        template: String,
        source: regex::Error,
    },
}

/// Conversion applied to a captured path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Bool,
    Float,
    Int,
    Str,
}

impl Coercion {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Coercion::Bool),
            "float" => Some(Coercion::Float),
            "int" => Some(Coercion::Int),
            "str" => Some(Coercion::Str),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Coercion::Bool => "bool",
            Coercion::Float => "float",
            Coercion::Int => "int",
            Coercion::Str => "str",
        }
    }

    /// Convert captured text, or `None` when it does not fit the type.
    pub fn apply(&self, raw: &str) -> Option<Value> {
        match self {
            Coercion::Str => Some(Value::String(raw.to_string())),
            Coercion::Int => raw.trim().parse::<i64>().ok().map(Value::from),
            Coercion::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            Coercion::Bool => match raw {
                "True" | "true" | "1" => Some(Value::Bool(true)),
                "False" | "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured segment that could not be coerced to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parameter {name:?} value {value:?} is not a valid {coercion}")]
pub struct CoercionError {
    pub name: String,
    pub value: String,
    pub coercion: Coercion,
}

/// Named constraint builders available to route templates.
#[derive(Clone)]
pub struct ConstraintTable {
    builders: HashMap<String, ConstraintBuilder>,
}

impl fmt::Debug for ConstraintTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.builders.keys().collect();
        names.sort();
        f.debug_struct("ConstraintTable").field("names", &names).finish()
    }
}

impl Default for ConstraintTable {
    fn default() -> Self {
        let mut table = Self {
            builders: HashMap::new(),
        };
        table.register("re", regex_constraint);
        table
    }
}

impl ConstraintTable {
    /// Add or replace a constraint. Templates compiled afterwards may use it.
    pub fn register(&mut self, name: impl Into<String>, builder: ConstraintBuilder) {
        self.builders.insert(name.into(), builder);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    fn build(&self, template: &str, name: &str, args: &[String]) -> Result<String, PatternError> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| PatternError::UnknownConstraint {
                template: template.to_string(),
                name: name.to_string(),
            })?;
        builder(args).map_err(|reason| PatternError::InvalidConstraint {
            template: template.to_string(),
            name: name.to_string(),
            reason,
        })
    }
}

fn regex_constraint(args: &[String]) -> Result<String, String> {
    match args {
        [pattern] if !pattern.is_empty() => Ok(pattern.clone()),
        [_] => Err("expected a non-empty pattern".to_string()),
        _ => Err(format!("expected exactly one argument, got {}", args.len())),
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    regex: Regex,
    params: Vec<(String, Coercion)>,
}

impl Pattern {
    pub fn compile(template: &str, constraints: &ConstraintTable) -> Result<Self, PatternError> {
        let normalized = normalize_path(template);
        let mut params: Vec<(String, Coercion)> = Vec::new();
        let mut parts = Vec::new();

        for segment in split_segments(&normalized) {
            let Some(inner) = segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            else {
                parts.push(regex::escape(segment));
                continue;
            };

            let placeholder =
                parse_placeholder(inner).map_err(|reason| PatternError::MalformedPlaceholder {
                    template: template.to_string(),
                    segment: segment.to_string(),
                    reason,
                })?;

            let coercion = match placeholder.kind {
                Some(kind) => {
                    Coercion::from_name(kind).ok_or_else(|| PatternError::UnknownType {
                        template: template.to_string(),
                        kind: kind.to_string(),
                    })?
                }
                None => Coercion::Str,
            };

            let body = match &placeholder.constraint {
                Some((name, args)) => constraints.build(template, name, args)?,
                None => DEFAULT_SEGMENT.to_string(),
            };

            match placeholder.name {
                Some(name) => {
                    if params.iter().any(|(existing, _)| existing == name) {
                        return Err(PatternError::DuplicateParameter {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    parts.push(format!("(?P<{GROUP_PREFIX}{}>{body})", params.len()));
                    params.push((name.to_string(), coercion));
                }
                None => parts.push(format!("(?:{body})")),
            }
        }

        let source = format!("^(?:{})$", parts.join("/"));
        let regex = Regex::new(&source).map_err(|source| PatternError::Regex {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: normalized,
            regex,
            params,
        })
    }

    /// The normalized template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    pub fn coercion(&self, name: &str) -> Option<Coercion> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, coercion)| *coercion)
    }

    /// Match a whole path.
    ///
    /// `None` means the path has a different shape. `Some(Err(..))` means the
    /// shape fits but a capture failed its type coercion.
    pub fn match_path(&self, path: &str) -> Option<Result<Params, CoercionError>> {
        let captures = self.regex.captures(path)?;
        let mut params = Params::new();

        for (index, (name, coercion)) in self.params.iter().enumerate() {
            let raw = captures
                .name(&format!("{GROUP_PREFIX}{index}"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match coercion.apply(raw) {
                Some(value) => {
                    params.insert(name.clone(), value);
                }
                None => {
                    return Some(Err(CoercionError {
                        name: name.clone(),
                        value: raw.to_string(),
                        coercion: *coercion,
                    }))
                }
            }
        }

        Some(Ok(params))
    }
}

struct Placeholder<'a> {
    name: Option<&'a str>,
    kind: Option<&'a str>,
    constraint: Option<(&'a str, Vec<String>)>,
}

/// Split on `/` outside of braces and quotes, so constraint arguments may
/// contain slashes and regex quantifiers.
fn split_segments(template: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in template.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => quote = Some(ch),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&template[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&template[start..]);
    segments
}

fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_placeholder(inner: &str) -> Result<Placeholder<'_>, String> {
    let (name, rest) = match inner.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (inner, None),
    };

    let name = if name.is_empty() {
        None
    } else if is_word(name) {
        Some(name)
    } else {
        return Err(format!("invalid parameter name {name:?}"));
    };

    let (kind, constraint) = match rest {
        None => (None, None),
        Some(rest) => {
            let head_end = rest.find(|c| c == ':' || c == '(').unwrap_or(rest.len());
            match rest[head_end..].chars().next() {
                Some('(') => (None, Some(parse_constraint(rest)?)),
                Some(_) => (
                    Some(&rest[..head_end]),
                    Some(parse_constraint(&rest[head_end + 1..])?),
                ),
                None => (Some(rest), None),
            }
        }
    };

    if let Some(kind) = kind {
        if !is_word(kind) {
            return Err(format!("invalid type name {kind:?}"));
        }
    }

    if name.is_none() {
        if constraint.is_none() {
            return Err("an unnamed placeholder needs a constraint".to_string());
        }
        if kind.is_some() {
            return Err("an unnamed placeholder cannot declare a type".to_string());
        }
    }

    Ok(Placeholder {
        name,
        kind,
        constraint,
    })
}

fn parse_constraint(expr: &str) -> Result<(&str, Vec<String>), String> {
    let (name, rest) = expr
        .split_once('(')
        .ok_or_else(|| format!("expected a constraint call, found {expr:?}"))?;
    if !is_word(name) {
        return Err(format!("invalid constraint name {name:?}"));
    }
    let args = rest
        .strip_suffix(')')
        .ok_or_else(|| format!("constraint {name:?} is missing its closing parenthesis"))?;
    Ok((name, parse_args(args)?))
}

/// Parse a comma-separated list of quoted string literals.
fn parse_args(src: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut chars = src.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            None => break,
            Some(q @ ('"' | '\'')) => q,
            Some(other) => return Err(format!("expected a quoted argument, found {other:?}")),
        };

        let mut value = String::new();
        loop {
            match chars.next() {
                None => return Err("unterminated string literal".to_string()),
                Some(c) if c == quote => break,
                Some('\\') => match chars.next() {
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some('\'') => value.push('\''),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err("unterminated string literal".to_string()),
                },
                Some(c) => value.push(c),
            }
        }
        args.push(value);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => return Err(format!("unexpected {other:?} after argument")),
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(template: &str) -> Pattern {
        Pattern::compile(template, &ConstraintTable::default()).expect("template should compile")
    }

    fn capture(pattern: &Pattern, path: &str) -> Option<Params> {
        pattern.match_path(path).map(|result| result.expect("coercion should succeed"))
    }

    #[test]
    fn literal_templates_match_exactly_one_path() {
        let pattern = compile("/movies/popular/");
        assert_eq!(pattern.template(), "/movies/popular");
        assert!(capture(&pattern, "/movies/popular").is_some());
        assert!(capture(&pattern, "/movies/popular/2").is_none());
        assert!(capture(&pattern, "/movies").is_none());
        assert!(capture(&pattern, "/x/movies/popular").is_none());
    }

    #[test]
    fn empty_template_is_root() {
        let pattern = compile("");
        assert_eq!(pattern.template(), "/");
        assert_eq!(capture(&pattern, "/"), Some(Params::new()));
        assert!(capture(&pattern, "/a").is_none());
    }

    #[test]
    fn literal_text_is_escaped() {
        let pattern = compile("/a.b/c+d");
        assert!(capture(&pattern, "/a.b/c+d").is_some());
        assert!(capture(&pattern, "/axb/cd").is_none());
    }

    #[test]
    fn default_placeholder_captures_one_segment() {
        let pattern = compile("/event/{id}");
        let params = capture(&pattern, "/event/2023").unwrap();
        assert_eq!(params.get("id"), Some(&json!("2023")));
        assert!(capture(&pattern, "/event/2023/extra").is_none());
        assert!(capture(&pattern, "/event/").is_none());
    }

    #[test]
    fn regex_constraint_limits_the_segment() {
        let pattern = compile(r#"/title/{id:re("tt\\d{7}")}"#);
        let params = capture(&pattern, "/title/tt5180504").unwrap();
        assert_eq!(params.get_str("id"), Some("tt5180504"));
        assert!(capture(&pattern, "/title/tt51805").is_none());
        assert!(capture(&pattern, "/title/nm5180504").is_none());
    }

    #[test]
    fn single_backslash_escapes_are_kept() {
        let pattern = compile(r#"/title/{id:re("tt\d{7}")}"#);
        assert!(capture(&pattern, "/title/tt5180504").is_some());
    }

    #[test]
    fn constraint_arguments_may_contain_slashes() {
        let pattern = compile(r#"/file/{path:re('.+/.+')}"#);
        let params = capture(&pattern, "/file/a/b/c.mkv").unwrap();
        assert_eq!(params.get_str("path"), Some("a/b/c.mkv"));
    }

    #[test]
    fn typed_placeholders_are_coerced() {
        let pattern = compile("/season/{number:int}/{hd:bool}/{score:float}");
        let params = capture(&pattern, "/season/3/True/7.5").unwrap();
        assert_eq!(params.get("number"), Some(&json!(3)));
        assert_eq!(params.get("hd"), Some(&json!(true)));
        assert_eq!(params.get("score"), Some(&json!(7.5)));
    }

    #[test]
    fn typed_and_constrained_placeholder() {
        let pattern = compile(r#"/year/{year:int:re("\d{4}")}"#);
        assert_eq!(pattern.coercion("year"), Some(Coercion::Int));
        let params = capture(&pattern, "/year/1999").unwrap();
        assert_eq!(params.get_i64("year"), Some(1999));
        assert!(capture(&pattern, "/year/99").is_none());
    }

    #[test]
    fn failed_coercion_is_reported() {
        let pattern = compile("/season/{number:int}");
        let result = pattern.match_path("/season/three").unwrap();
        assert_eq!(
            result.unwrap_err(),
            CoercionError {
                name: "number".into(),
                value: "three".into(),
                coercion: Coercion::Int,
            }
        );
    }

    #[test]
    fn unnamed_placeholder_constrains_without_capturing() {
        let pattern = compile(r#"/{:re("movies|shows")}/{id}"#);
        let params = capture(&pattern, "/shows/42").unwrap();
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["id"]);
        assert!(capture(&pattern, "/music/42").is_none());
    }

    #[test]
    fn registration_errors_fail_fast() {
        let table = ConstraintTable::default();
        assert!(matches!(
            Pattern::compile("/a/{id:uuid}", &table),
            Err(PatternError::UnknownType { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id:glob(\"*\")}", &table),
            Err(PatternError::UnknownConstraint { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id:re()}", &table),
            Err(PatternError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id:re(tt)}", &table),
            Err(PatternError::MalformedPlaceholder { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id}/{id}", &table),
            Err(PatternError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{}", &table),
            Err(PatternError::MalformedPlaceholder { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id:re(\"(\")}", &table),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn custom_constraints_can_be_registered() {
        fn any_of(args: &[String]) -> Result<String, String> {
            if args.is_empty() {
                return Err("expected at least one choice".into());
            }
            Ok(args.iter().map(|a| regex::escape(a)).collect::<Vec<_>>().join("|"))
        }

        let mut table = ConstraintTable::default();
        table.register("any", any_of);
        let pattern = Pattern::compile(r#"/sort/{order:any("asc", "desc")}"#, &table).unwrap();
        assert!(pattern.match_path("/sort/asc").is_some());
        assert!(pattern.match_path("/sort/up").is_none());
    }
}
