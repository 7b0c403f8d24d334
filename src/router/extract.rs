//! Locate the JSON object inside free-form model output.
//!
//! Models wrap their answer in prose ("Sure! {...} Hope that helps!") or in
//! markdown fences. [`extract_json_object`] returns the payload slice without
//! allocating.

/// Why no JSON object could be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The input was empty or whitespace.
    #[error("model output is empty")]
    Empty,
    /// No `{` appears in the input.
    #[error("no JSON object in model output")]
    NoObject,
    /// A `{` was found but never closed.
    #[error("unbalanced braces in model output")]
    Unbalanced,
}

/// Return the first balanced top-level `{...}` span in `raw`.
///
/// If the text contains a markdown code fence, the fenced body is searched
/// first and the whole text second. Braces inside JSON strings (including
/// escaped quotes) do not count towards nesting.
///
/// # Errors
///
/// See [`ExtractError`].
pub fn extract_json_object(raw: &str) -> Result<&str, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    if let Some(body) = fenced_body(raw)
        && let Ok(object) = balanced_object(body)
    {
        return Ok(object);
    }
    balanced_object(raw)
}

/// The contents of the first ```` ``` ```` fence, without its language tag.
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip a language tag such as `json` up to the end of the line.
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(&body[..close])
}

fn balanced_object(text: &str) -> Result<&str, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoObject)?;
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    Err(ExtractError::Unbalanced)
}
