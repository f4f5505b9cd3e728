//! Route compiler
//!
//! A rule such as `/mode/<mode>` is split on `/` into [`Segment`]s and
//! compiled once into an anchored regex. Every segment is followed by a
//! separator and the last separator is optional, so `/on` matches both
//! `/on` and `/on/`, and `/` matches the empty path as well as `/`.

use regex::Regex;

use crate::error::RouteError;

/// Characters a variable segment may capture
const VARIABLE_CLASS: &str = "[a-zA-Z0-9_-]+";

/// One slash-separated piece of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Exact text, escaped before it reaches the regex engine
    Literal(String),
    /// `<name>`: one or more of `[a-zA-Z0-9_-]`
    Variable(String),
    /// `*`: anything, including further separators; final segment only
    Wildcard,
}

/// A compiled route rule
#[derive(Debug, Clone)]
pub struct RoutePattern {
    rule: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
    regex: Regex,
}

impl RoutePattern {
    pub fn compile(rule: &str) -> Result<Self, RouteError> {
        let segments = parse_rule(rule)?;

        let mut pattern = String::with_capacity(rule.len() * 2 + 4);
        pattern.push('^');
        let mut variables = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Variable(name) => {
                    pattern.push('(');
                    pattern.push_str(VARIABLE_CLASS);
                    pattern.push(')');
                    variables.push(name.clone());
                }
                Segment::Wildcard => pattern.push_str(".*"),
            }
            pattern.push('/');
        }
        // last separator is optional
        pattern.push_str("?$");

        let regex = Regex::new(&pattern).map_err(|source| RouteError::Pattern {
            rule: rule.to_string(),
            source,
        })?;

        Ok(Self {
            rule: rule.to_string(),
            segments,
            variables,
            regex,
        })
    }

    /// The rule this pattern was compiled from
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names in rule order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Captured variable values in rule order, or `None` when `path` does not match
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or("", |m| m.as_str()))
                .collect(),
        )
    }
}

fn parse_rule(rule: &str) -> Result<Vec<Segment>, RouteError> {
    let mut parts: Vec<&str> = rule.split('/').collect();
    // "/a/" and "/a" are the same rule; "/" becomes a single empty literal
    if parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }

    let mut segments = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        let segment = if *part == "*" {
            if idx + 1 != parts.len() {
                return Err(RouteError::WildcardNotLast(rule.to_string()));
            }
            Segment::Wildcard
        } else if let Some(name) = part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
            if !is_variable_name(name) {
                return Err(RouteError::InvalidVariable {
                    rule: rule.to_string(),
                    segment: (*part).to_string(),
                });
            }
            Segment::Variable(name.to_string())
        } else {
            Segment::Literal((*part).to_string())
        };
        segments.push(segment);
    }
    Ok(segments)
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
