use tracing::warn;

use crate::platform::{ChatPlatform, IncomingMessage};

/// Platform-imposed maximum message length.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Split long text for delivery. Cuts prefer the last newline at or before
/// `max_len`, then the last space, then a hard cut (walked back to a UTF-8
/// boundary so slicing doesn't panic). Segments are trimmed at cut points;
/// whitespace-only input yields no segments. Empty input yields a single
/// empty segment.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let mut end = max_len;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // max_len is narrower than the first character; take it whole
            // rather than looping forever.
            end = 1;
            while !rest.is_char_boundary(end) {
                end += 1;
            }
        }
        let window = &rest[..end];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(end);

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    let tail = rest.trim_end();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    chunks
}

/// Send `text` back to the origin: the first segment as a reply to the
/// originating message (without pinging its author), the rest as ordinary
/// follow-ups, in order. Per-segment failures are logged and skipped; earlier
/// segments are never rolled back.
pub async fn deliver<P: ChatPlatform + ?Sized>(
    platform: &P,
    origin: &IncomingMessage,
    text: &str,
) {
    for (index, chunk) in split_message(text, MAX_MESSAGE_LEN).iter().enumerate() {
        let result = if index == 0 {
            platform.reply_to(&origin.channel_id, &origin.id, chunk).await
        } else {
            platform.send_message(&origin.channel_id, chunk).await
        };

        if let Err(e) = result {
            warn!(
                channel_id = %origin.channel_id,
                segment = index,
                "failed to deliver reply segment: {:#}",
                e
            );
        }
    }
}
