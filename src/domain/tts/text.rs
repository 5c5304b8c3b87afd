use html2text::from_read;
use regex::Regex;
use std::sync::LazyLock;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+").expect("valid heading pattern"));
static MARKDOWN_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").expect("valid bullet pattern"));
// Only paired markers hugging non-space text: `2 * 3 * r` and `snake__case` stay
static MARKDOWN_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*{1,3}([^*\s](?:[^*]*?[^*\s])?)\*{1,3}").expect("valid emphasis pattern")
});
static MARKDOWN_UNDERSCORE_STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b__([^_\s](?:[^_]*?[^_\s])?)__\b").expect("valid underscore pattern")
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("valid url pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?]+\s+)").expect("valid sentence pattern"));

/// Turn lesson text into plain speakable text.
///
/// Markdown markers are stripped before the HTML pass, which collapses line
/// breaks, and again after it, since html2text renders tags as markdown.
/// URLs are dropped and whitespace is normalized to single spaces.
pub fn clean_text(text: &str) -> String {
    let without_markdown = strip_markdown(text);
    let plain_text = strip_markdown(&from_read(without_markdown.as_bytes(), usize::MAX));
    let without_urls = URL.replace_all(&plain_text, "");
    let normalized = WHITESPACE.replace_all(&without_urls, " ");

    normalized.trim().to_string()
}

fn strip_markdown(text: &str) -> String {
    let without_headings = MARKDOWN_HEADING.replace_all(text, "");
    let without_bullets = MARKDOWN_BULLET.replace_all(&without_headings, "");
    let without_stars = MARKDOWN_EMPHASIS.replace_all(&without_bullets, "$1");
    MARKDOWN_UNDERSCORE_STRONG
        .replace_all(&without_stars, "$1")
        .into_owned()
}

/// Split text into batches that respect sentence boundaries.
/// Each batch is at most `max_len` bytes.
pub fn split_into_batches(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut batches = Vec::new();
    let mut current_batch = String::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(text) {
        push_segment(&mut batches, &mut current_batch, &text[last_end..mat.end()], max_len);
        last_end = mat.end();
    }

    if last_end < text.len() {
        push_segment(&mut batches, &mut current_batch, &text[last_end..], max_len);
    }

    flush(&mut batches, &mut current_batch);
    batches
}

fn push_segment(batches: &mut Vec<String>, current_batch: &mut String, segment: &str, max_len: usize) {
    if !current_batch.is_empty() && current_batch.len() + segment.len() > max_len {
        flush(batches, current_batch);
    }

    if segment.len() > max_len {
        // No sentence boundary to cut on, fall back to characters
        flush(batches, current_batch);
        batches.extend(split_by_chars(segment, max_len));
    } else {
        current_batch.push_str(segment);
    }
}

fn flush(batches: &mut Vec<String>, current_batch: &mut String) {
    let trimmed = current_batch.trim();
    if !trimmed.is_empty() {
        batches.push(trimmed.to_string());
    }
    current_batch.clear();
}

fn split_by_chars(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();

    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > max_len {
            chunks.push(std::mem::take(&mut chunk));
        }
        chunk.push(ch);
    }

    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }

    chunks
}
