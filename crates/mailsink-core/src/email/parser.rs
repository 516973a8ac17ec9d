/// Raw message parser using mail-parser crate
use crate::error::MailsinkError;
use crate::models::{Content, Headers, Message, MimeBody, TenantId};
use mail_parser::{Header, MessageParser, PartType};

/// Parses RFC 5322 bytes into a storable [`Message`].
///
/// Header values are kept as written (minus surrounding whitespace) so the
/// raw reconstruction reproduces them.
pub fn parse_message(tenant: TenantId, raw: &[u8]) -> Result<Message, MailsinkError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailsinkError::Parse("unable to parse message".to_string()))?;

    let headers = collect_headers(raw, parsed.headers());
    if headers.is_empty() {
        return Err(MailsinkError::Parse("message has no headers".to_string()));
    }

    let body = split_body(raw);

    // Only direct children of a top-level multipart are exposed as parts
    let mime = match &parsed.root_part().body {
        PartType::Multipart(children) => {
            let parts = children
                .iter()
                .filter_map(|id| parsed.part(*id))
                .map(|part| {
                    let body = slice(raw, part.offset_body as usize, part.offset_end as usize);
                    Content::new(
                        collect_headers(raw, &part.headers),
                        body.trim_end_matches("\r\n").trim_end_matches('\n').to_string(),
                    )
                })
                .collect();
            Some(MimeBody { parts })
        }
        _ => None,
    };

    Ok(Message::new(tenant, headers, body, mime))
}

fn collect_headers(raw: &[u8], headers: &[Header]) -> Headers {
    let mut collected = Headers::new();
    for header in headers {
        // Name as written; the parser's canonical spelling may differ in case
        let field = slice(raw, header.offset_field as usize, header.offset_start as usize);
        let name = field.split(':').next().unwrap_or_default().trim();
        let name = if name.is_empty() { header.name.as_str() } else { name };

        let value = slice(raw, header.offset_start as usize, header.offset_end as usize);
        collected.append(name, value.trim());
    }
    collected
}

fn slice(raw: &[u8], start: usize, end: usize) -> String {
    raw.get(start..end.min(raw.len()))
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

/// Everything after the first blank line
fn split_body(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    [("\r\n\r\n", 4), ("\n\n", 2)]
        .iter()
        .filter_map(|(sep, len)| text.find(sep).map(|pos| pos + len))
        .min()
        .map(|start| text[start..].to_string())
        .unwrap_or_default()
}
