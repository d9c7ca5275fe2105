use sha2::{Digest, Sha256};

/// Deterministic image filename for an item: `demo_{id}.png`.
///
/// Characters outside `[A-Za-z0-9_-]` are replaced; when that changes the id,
/// a short hash of the original id keeps distinct ids on distinct files.
pub fn artifact_filename(item_id: &str) -> String {
    let sanitized: String = item_id
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .take(64)
        .collect();
    if sanitized.is_empty() {
        format!("demo_{}.png", short_hash(item_id))
    } else if sanitized == item_id {
        format!("demo_{sanitized}.png")
    } else {
        format!("demo_{sanitized}-{}.png", short_hash(item_id))
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
