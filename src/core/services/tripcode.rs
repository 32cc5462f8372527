/// Shown when a commenter leaves the name field blank.
pub const ANONYMOUS_AUTHOR: &str = "名無しさん";

const TRIPCODE_LEN: usize = 10;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Rolling 31x hash over UTF-16 code units, wrapped to signed 32 bits.
/// Deliberately unsalted and non-cryptographic so the same secret maps
/// to the same tag on every device, forever.
fn tripcode(secret: &str) -> String {
    let mut h: i32 = 0;
    for unit in secret.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(unit as i32);
    }
    let mut n = (h as i64).unsigned_abs();
    let mut digits = Vec::new();
    loop {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    let encoded = String::from_utf8_lossy(&digits).to_uppercase();
    encoded.chars().take(TRIPCODE_LEN).collect()
}

/// `name#secret` becomes `name ◆TAG`; the secret itself is dropped
/// here and never stored or displayed. Input without a delimiter
/// passes through unchanged, blank input becomes the placeholder.
pub fn derive_display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ANONYMOUS_AUTHOR.to_string();
    }
    match trimmed.split_once('#') {
        None => trimmed.to_string(),
        Some((name, secret)) => {
            let name = if name.is_empty() { ANONYMOUS_AUTHOR } else { name };
            format!("{} ◆{}", name, tripcode(secret))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_name_passes_through() {
        assert_eq!(derive_display_name("Bob"), "Bob");
    }

    #[test]
    fn test_blank_name_gets_placeholder() {
        assert_eq!(derive_display_name(""), ANONYMOUS_AUTHOR);
        assert_eq!(derive_display_name("   "), ANONYMOUS_AUTHOR);
    }

    #[test]
    fn test_deterministic_tag() {
        let a = derive_display_name("Alice#secret1");
        assert_eq!(a, derive_display_name("Alice#secret1"));
        assert!(a.starts_with("Alice ◆"));
    }

    #[test]
    fn test_different_secrets_differ() {
        assert_ne!(derive_display_name("Alice#secret1"), derive_display_name("Alice#secret2"));
    }

    #[test]
    fn test_secret_never_appears_in_output() {
        let out = derive_display_name("Alice#hunter2");
        assert!(!out.contains("hunter2"));
        assert!(!out.contains('#'));
    }

    #[test]
    fn test_only_first_delimiter_splits() {
        let out = derive_display_name("Alice#a#b");
        assert!(out.starts_with("Alice ◆"));
        assert_eq!(out, derive_display_name("Alice#a#b"));
    }

    #[test]
    fn test_tag_is_short_uppercase_base36() {
        let out = derive_display_name("名無し#ひみつのことば");
        let tag = out.rsplit('◆').next().unwrap();
        assert!(tag.len() <= TRIPCODE_LEN);
        assert!(tag.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_empty_name_with_secret_uses_placeholder() {
        let out = derive_display_name("#secret");
        assert!(out.starts_with(ANONYMOUS_AUTHOR));
        assert!(out.contains('◆'));
    }
}
