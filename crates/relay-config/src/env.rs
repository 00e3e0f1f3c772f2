use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ConfigError;

/// Matches `{{ env.VAR }}` and `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand placeholders in raw config text, resolving variables through `lookup`
///
/// Lines whose first non-blank character is `#` are TOML comments and are
/// copied verbatim, so commented-out secrets never need to be set.
pub(crate) fn expand_placeholders<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            expanded.push(line.to_owned());
            continue;
        }

        let mut failure = None;
        let replaced = placeholder().replace_all(line, |caps: &Captures<'_>| {
            match resolve(caps, &lookup) {
                Ok(value) => value,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        if let Some(e) = failure {
            return Err(ConfigError::Expansion(e));
        }

        expanded.push(replaced.into_owned());
    }

    Ok(expanded.join("\n"))
}

fn resolve<F>(caps: &Captures<'_>, lookup: &F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let key = &caps[1];
    let Some(var) = key.strip_prefix("env.").filter(|v| !v.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    lookup(var)
        .or_else(|| caps.get(2).map(|d| d.as_str().to_owned()))
        .ok_or_else(|| format!("environment variable not found: `{var}`"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[llm]\nbackend = \"codex\"\n";
        assert_eq!(expand_placeholders(input, vars(&[])).unwrap(), input);
    }

    #[test]
    fn substitutes_every_placeholder_on_a_line() {
        let lookup = vars(&[("HOST", "example.com"), ("PORT", "8443")]);
        let out = expand_placeholders("url = \"https://{{ env.HOST }}:{{env.PORT}}\"", lookup).unwrap();
        assert_eq!(out, "url = \"https://example.com:8443\"");
    }

    #[test]
    fn missing_variable_is_named() {
        let err = expand_placeholders("key = \"{{ env.NOT_THERE }}\"", vars(&[])).unwrap_err();
        assert!(err.to_string().contains("NOT_THERE"));
    }

    #[test]
    fn default_applies_only_when_unset() {
        let input = "a = \"{{ env.A | default(\"fallback\") }}\"";
        assert_eq!(expand_placeholders(input, vars(&[])).unwrap(), "a = \"fallback\"");
        assert_eq!(expand_placeholders(input, vars(&[("A", "set")])).unwrap(), "a = \"set\"");
    }

    #[test]
    fn rejects_non_env_scope() {
        let err = expand_placeholders("x = \"{{ secrets.TOKEN }}\"", vars(&[])).unwrap_err();
        assert!(err.to_string().contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comment_lines_are_left_alone() {
        let input = "  # scope = \"{{ env.UNSET_SCOPE }}\"\nverbose = true";
        assert_eq!(expand_placeholders(input, vars(&[])).unwrap(), input);
    }
}
