//! Plain-text title sanitation: strip tags, then decode entities, then trim.
//!
//! Order matters: stripping happens before decoding, so a payload like
//! `&lt;script&gt;` decodes to literal text instead of being treated as
//! markup.

/// Permissive tag stripper: drops everything from `<` to the next `>`.
/// An unterminated `<` swallows the rest of the string.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Decode numeric character references (decimal and hex) and the five
/// standard named entities. Unknown or malformed references pass through
/// verbatim.
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match decode_one(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode a single reference at the start of `tail` (which begins with `&`).
/// Returns the replacement text and how many bytes were consumed.
fn decode_one(tail: &str) -> Option<(String, usize)> {
    let end = tail.find(';')?;
    let body = &tail[1..end];
    let decoded = match body {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?.to_string()
        }
    };
    Some((decoded, end + 1))
}

/// Full title sanitation pass used by the normalizer.
pub fn normalize_title(raw: &str) -> String {
    decode_entities(&strip_tags(raw)).trim().to_string()
}
