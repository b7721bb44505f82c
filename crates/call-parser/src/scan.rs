//! Single-level block scanner shared by both acquisition paths.
//!
//! The markup format does not nest: one matching expression finds the
//! earliest complete `<tool …>…</tool>` block (the `</tool_call>` terminator
//! is accepted as an alias). Nested payloads would need an incremental
//! tokenizer and are out of scope.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool(?:\s[^>]*)?>.*?</tool(?:_call)?>").expect("block grammar"));

static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<tool[^>]*>").expect("open tag"));

/// All complete blocks in a rendered text, in document order.
pub fn find_blocks(text: &str) -> Vec<&str> {
    if !text.contains("<tool") {
        return Vec::new();
    }
    BLOCK_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Extract every complete block from a growing stream buffer, removing each
/// from the buffer. Incomplete trailing data stays for the next chunk.
pub fn drain_blocks(buffer: &mut String) -> Vec<String> {
    let mut blocks = Vec::new();
    while let Some(m) = BLOCK_RE.find(buffer) {
        let (start, end) = (m.start(), m.end());
        blocks.push(buffer[start..end].to_string());
        buffer.replace_range(start..end, "");
    }
    blocks
}

/// The payload between the open tag and the terminator, trimmed.
pub fn inner_payload(block: &str) -> &str {
    let block = block.trim();
    let without_open = match OPEN_TAG_RE.find(block) {
        Some(m) => &block[m.end()..],
        None => block,
    };
    let without_close = without_open
        .trim_end()
        .trim_end_matches("</tool_call>")
        .trim_end_matches("</tool>");
    without_close.trim()
}
