use lettre::Message;
use lettre::message::header::ContentType;

use crate::Result;

/// Build a plain text message. Addresses are parsed here so a bad
/// recipient fails before any connection is made.
pub(crate) fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
    let message = Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;
    Ok(message)
}
