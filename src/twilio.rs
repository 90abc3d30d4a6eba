//! Twilio/WhatsApp provider adapter: form-encoded inbound fields and the
//! TwiML reply envelope.

use serde::Deserialize;

/// The fields Twilio posts that this bot cares about.
#[derive(Debug, Deserialize)]
pub struct TwilioInbound {
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Sender identifier, e.g. "whatsapp:+15550100". Logged only.
    #[serde(rename = "From", default)]
    pub from: String,
}

/// Wrap a reply in the TwiML envelope Twilio expects back from the webhook.
pub fn twiml_reply(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    )
}

/// Escape a string for safe inclusion in XML content.
fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twiml_shape() {
        let xml = twiml_reply("No notices found.");
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>No notices found.</Message></Response>"
        );
    }

    #[test]
    fn test_twiml_escapes_markup() {
        let xml = twiml_reply("latest <keyword> & more");
        assert!(xml.contains("latest &lt;keyword&gt; &amp; more"));
        assert!(!xml.contains("<keyword>"));
    }

    #[test]
    fn test_twiml_escapes_quotes() {
        let xml = twiml_reply("No notices found containing 'exam'.");
        assert!(xml.contains("&apos;exam&apos;"));
    }

    #[test]
    fn test_inbound_field_renames() {
        let inbound: TwilioInbound =
            serde_json::from_str(r#"{"Body": "latest exam", "From": "whatsapp:+15550100"}"#)
                .unwrap();
        assert_eq!(inbound.body, "latest exam");
        assert_eq!(inbound.from, "whatsapp:+15550100");
    }

    #[test]
    fn test_inbound_missing_fields_default_empty() {
        let inbound: TwilioInbound = serde_json::from_str(r#"{"SmsSid": "SM123"}"#).unwrap();
        assert_eq!(inbound.body, "");
        assert_eq!(inbound.from, "");
    }
}
