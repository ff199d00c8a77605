use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::RouteError;
use crate::http::ParamVec;

static PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// A route path pattern compiled to an anchored regex.
///
/// `{name}` placeholders become named captures matching one or more non-slash
/// characters; all other text matches literally. The root pattern `/` matches only `/`.
/// Matching and parameter extraction use the same compiled regex.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl RoutePattern {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] for duplicate placeholder names, unbalanced or
    /// malformed braces, or a regex that fails to compile.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: String| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern == "/" {
            let regex = Regex::new(r"^/$").map_err(|e| invalid(e.to_string()))?;
            return Ok(Self {
                source: pattern.to_string(),
                regex,
                param_names: Vec::new(),
            });
        }

        let placeholder = PLACEHOLDER
            .as_ref()
            .ok_or_else(|| invalid("placeholder scanner unavailable".to_string()))?;

        let mut expression = String::with_capacity(pattern.len() + 16);
        expression.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();
        let mut last = 0;

        for captures in placeholder.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            push_literal(&mut expression, &pattern[last..whole.start()]).map_err(&invalid)?;
            let name = name.as_str();
            if param_names.iter().any(|existing| existing.as_ref() == name) {
                return Err(invalid(format!("duplicate placeholder `{{{name}}}`")));
            }
            expression.push_str("(?P<");
            expression.push_str(name);
            expression.push_str(">[^/]+)");
            param_names.push(Arc::from(name));
            last = whole.end();
        }
        push_literal(&mut expression, &pattern[last..]).map_err(&invalid)?;
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            param_names,
        })
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// `true` when the pattern has no placeholders.
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.param_names.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Named captures of `path`, in declaration order. Empty when `path` does not match.
    #[must_use]
    pub fn extract(&self, path: &str) -> ParamVec {
        let mut params = ParamVec::new();
        let Some(captures) = self.regex.captures(path) else {
            return params;
        };
        for name in &self.param_names {
            if let Some(value) = captures.name(name) {
                params.push((Arc::clone(name), value.as_str().to_string()));
            }
        }
        params
    }

    /// Insert parameter values back into the pattern.
    ///
    /// Returns `None` if any placeholder has no value.
    #[must_use]
    pub fn substitute(&self, params: &[(Arc<str>, String)]) -> Option<String> {
        if self.is_static() {
            return Some(self.source.clone());
        }
        let placeholder = PLACEHOLDER.as_ref()?;
        let mut missing = false;
        let out = placeholder.replace_all(&self.source, |captures: &regex::Captures<'_>| {
            let name = captures.get(1).map_or("", |m| m.as_str());
            match params.iter().rfind(|(k, _)| k.as_ref() == name) {
                Some((_, value)) => value.clone(),
                None => {
                    missing = true;
                    String::new()
                }
            }
        });
        if missing {
            None
        } else {
            Some(out.into_owned())
        }
    }
}

fn push_literal(expression: &mut String, literal: &str) -> Result<(), String> {
    if literal.contains('{') || literal.contains('}') {
        return Err(format!("malformed placeholder near `{literal}`"));
    }
    expression.push_str(&regex::escape(literal));
    Ok(())
}
