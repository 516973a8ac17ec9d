/// Test data builders and helpers
use base64::Engine;

/// Build a simple test email message
pub fn build_simple_email(from: &str, to: &str, subject: &str, body: &str) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{}\r\n",
        from, to, subject, body
    )
}

/// Build a two-part message: a text part and a base64 attachment
pub fn build_email_with_attachment(
    from: &str,
    to: &str,
    subject: &str,
    text: &str,
    filename: &str,
    attachment: &[u8],
) -> String {
    let boundary = "mailsink-boundary-42";
    let encoded = base64::engine::general_purpose::STANDARD.encode(attachment);
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: text/plain; charset=UTF-8\r\n\
         \r\n\
         {text}\r\n\
         --{boundary}\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Disposition: attachment; filename=\"{filename}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {encoded}\r\n\
         --{boundary}--\r\n"
    )
}
