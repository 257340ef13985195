//! `{{name}}` placeholder substitution for prompt templates.

use prompt_gateway_sdk::PromptVariables;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Substitute every `{{name}}` whose `name` is a key of `variables`.
///
/// One left-to-right pass: substituted values are never re-scanned, and
/// placeholders without a value (or without a closing `}}`) are copied verbatim.
#[must_use]
pub fn render(template: &str, variables: &PromptVariables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        out.push_str(&rest[..open]);
        let inner = &rest[open + OPEN.len()..];

        let Some(close) = inner.find(CLOSE) else {
            out.push_str(&rest[open..]);
            return out;
        };

        if let Some(value) = variables.get(&inner[..close]) {
            out.push_str(value);
            rest = &inner[close + CLOSE.len()..];
        } else {
            // Re-scan from the next character so "{{{name}}}" still finds "{{name}}".
            out.push('{');
            rest = &rest[open + 1..];
        }
    }

    out.push_str(rest);
    out
}
