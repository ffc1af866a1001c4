use crate::gmail::models::MessagePart;
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

pub const TRUNCATED_SUFFIX: &str = "... [TRUNCATED]";

/// Decode text bodies in place, keeping at most `max_bytes` of body text
/// across the whole part tree.
///
/// Parts are visited depth-first. Attachments and other non-text parts lose
/// their data but keep their metadata. The first text part that does not fit
/// is cut and marked with [`TRUNCATED_SUFFIX`]; text after it is emptied.
pub fn truncate_bodies(payload: &mut MessagePart, max_bytes: usize) {
    let mut used = 0;
    visit(payload, max_bytes, &mut used);
}

fn visit(part: &mut MessagePart, max_bytes: usize, used: &mut usize) {
    let is_text = part.mime_type.contains("text/plain") || part.mime_type.contains("text/html");

    if let Some(body) = part.body.as_mut().filter(|body| !body.data.is_empty()) {
        if is_text {
            if let Some(text) = decode(&body.data) {
                body.data = take_budget(text, max_bytes, used);
            }
        } else {
            body.data.clear();
        }
    }

    for child in &mut part.parts {
        visit(child, max_bytes, used);
    }
}

fn take_budget(mut text: String, max_bytes: usize, used: &mut usize) -> String {
    let remaining = max_bytes.saturating_sub(*used);

    if remaining == 0 {
        return String::new();
    }

    if text.len() > remaining {
        let mut cut = remaining;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str(TRUNCATED_SUFFIX);
        *used = max_bytes;
        return text;
    }

    *used += text.len();
    text
}

fn decode(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .ok()?;

    Some(String::from_utf8_lossy(&bytes).into_owned())
}
