use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{ChatError, Result};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// An instruction string with `{{name}}` placeholders.
///
/// Constructed per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Wrap template text. Brace text that is not a `{{name}}` placeholder
    /// is ordinary instruction text and passes through rendering untouched.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Distinct placeholder names, sorted.
    pub fn variables(&self) -> BTreeSet<&str> {
        placeholder_regex()
            .captures_iter(&self.text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables().contains(name)
    }

    /// Substitute every placeholder from `values`.
    ///
    /// Substitution is a single pass, so placeholder syntax inside a value is
    /// left as literal text.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String> {
        let missing: Vec<&str> = self
            .variables()
            .into_iter()
            .filter(|name| !values.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ChatError::Template(format!(
                "no value for placeholder(s): {}",
                missing.join(", ")
            )));
        }

        let rendered = placeholder_regex().replace_all(&self.text, |caps: &Captures<'_>| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

/// Replace only `name` placeholders in `text`, leaving everything else as is.
pub(crate) fn fill(text: &str, name: &str, value: &str) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            if &caps[1] == name {
                value.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_variables() {
        let t = PromptTemplate::new("{{a}} and {{ b }} and {{a}}");
        let vars: Vec<&str> = t.variables().into_iter().collect();
        assert_eq!(vars, vec!["a", "b"]);
        assert!(t.has_variable("b"));
        assert!(!t.has_variable("c"));
    }

    #[test]
    fn test_render() {
        let t = PromptTemplate::new("Translate {{ text }} into {{lang}}.");
        let out = t
            .render(&values(&[("text", "hola"), ("lang", "English")]))
            .unwrap();
        assert_eq!(out, "Translate hola into English.");
    }

    #[test]
    fn test_render_missing_value() {
        let t = PromptTemplate::new("{{question}} for {{audience}}");
        let err = t.render(&values(&[("question", "q")])).unwrap_err();
        assert!(err.to_string().contains("audience"));
    }

    #[test]
    fn test_value_is_not_rescanned() {
        let t = PromptTemplate::new("Q: {{question}}");
        let out = t.render(&values(&[("question", "what is {{x}}?")])).unwrap();
        assert_eq!(out, "Q: what is {{x}}?");
    }

    #[test]
    fn test_non_placeholder_braces_pass_through() {
        let t = PromptTemplate::new(r#"Reply as JSON like {"a": {"b": 1}} or {{ name"#);
        assert!(t.variables().is_empty());
        assert_eq!(
            t.render(&HashMap::new()).unwrap(),
            r#"Reply as JSON like {"a": {"b": 1}} or {{ name"#
        );

        let t = PromptTemplate::new("{{1abc}} then {{x}}");
        let vars: Vec<&str> = t.variables().into_iter().collect();
        assert_eq!(vars, vec!["x"]);
        assert_eq!(t.render(&values(&[("x", "y")])).unwrap(), "{{1abc}} then y");
    }

    #[test]
    fn test_fill_only_named() {
        assert_eq!(fill("{{question}} / {{other}}", "question", "hi"), "hi / {{other}}");
    }
}
