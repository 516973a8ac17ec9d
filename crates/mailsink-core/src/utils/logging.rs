/// Redaction helpers so captured addresses and content stay out of logs
use regex::Regex;
use std::sync::LazyLock;

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*)").expect("valid address pattern")
});

/// Masks the local part of every address in `text`, keeping the domain
///
/// # Examples
/// ```
/// use mailsink_core::utils::logging::redact_email;
///
/// assert_eq!(redact_email("bob@example.com"), "***@example.com");
/// assert_eq!(redact_email("relay to ops@acme.io now"), "relay to ***@acme.io now");
/// ```
pub fn redact_email(text: &str) -> String {
    ADDRESS_PATTERN
        .replace_all(text, |caps: &regex::Captures| format!("***@{}", &caps[1]))
        .into_owned()
}

/// Replaces message content with its size
pub fn redact_body(body: &[u8]) -> String {
    format!("[{} bytes]", body.len())
}

/// Shows the first characters of a subject line and its length
pub fn redact_subject(subject: &str) -> String {
    const VISIBLE: usize = 3;
    const MIN_LENGTH_TO_REDACT: usize = 6;

    let length = subject.chars().count();
    if length < MIN_LENGTH_TO_REDACT {
        return subject.to_string();
    }

    let preview: String = subject.chars().take(VISIBLE).collect();
    format!("{}...[{} chars]", preview, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email() {
        assert_eq!(redact_email("user@example.com"), "***@example.com");
        assert_eq!(
            redact_email("From: alice@foo.com To: bob@bar.com"),
            "From: ***@foo.com To: ***@bar.com"
        );
        assert_eq!(redact_email("root@localhost"), "***@localhost");
        assert_eq!(redact_email("no address here"), "no address here");
    }

    #[test]
    fn test_redact_body() {
        assert_eq!(redact_body(b"Hello world"), "[11 bytes]");
        assert_eq!(redact_body(b""), "[0 bytes]");
    }

    #[test]
    fn test_redact_subject() {
        assert_eq!(redact_subject("Hi"), "Hi");
        assert_eq!(redact_subject("Quarterly numbers"), "Qua...[17 chars]");
        assert_eq!(redact_subject("Ünïcødé subject"), "Ünï...[15 chars]");
    }
}
