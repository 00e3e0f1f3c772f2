use std::fmt::Display;

use crate::CredentialSource;

/// Verbose-gated tracing of credential source attempts
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceTrace<'a> {
    pub verbose: bool,
    pub provider: &'a str,
}

impl SourceTrace<'_> {
    pub fn attempt(self, source: CredentialSource, outcome: impl Display) {
        if self.verbose {
            tracing::info!(provider = self.provider, source = %source, "{outcome}");
        }
    }
}

/// First characters of a rejected secret, enough to recognise it in logs
pub(crate) fn preview(value: &str) -> &str {
    value
        .char_indices()
        .nth(10)
        .map_or(value, |(idx, _)| &value[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_to_ten_chars() {
        assert_eq!(preview("abcdefghijklmnop"), "abcdefghij");
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("ééééééééééé"), "éééééééééé");
    }
}
