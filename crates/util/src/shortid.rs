//! 16-char URL-safe random ids (§4.2), used for request-ids, speech-ids,
//! and segment-ids — anywhere a full UUID would be needlessly wide for a
//! log line.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub fn shortuuid() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_16_chars() {
        let id = shortuuid();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn is_reasonably_unique() {
        let a = shortuuid();
        let b = shortuuid();
        assert_ne!(a, b);
    }
}
