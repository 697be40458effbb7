//! Gmail retrieval and card-notification parsing.
//!
//! The mail side of ingestion: list matching messages, fetch them in
//! full, pick the best body out of the MIME tree, and pull the amount
//! and merchant out of the text.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::normalize;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Placeholder merchant for notifications that carry an amount but no
/// merchant line.
pub const UNKNOWN_MERCHANT: &str = "알 수 없음";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Gmail authorization rejected; relink the account")]
    Unauthorized,

    #[error("Gmail API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Message retrieval as the ingestion pipeline consumes it.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List message ids matching the query, newest first, capped.
    async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailError>;

    /// Fetch one message in full (headers + MIME tree + part bodies).
    async fn get_message(&self, access_token: &str, id: &str) -> Result<GmailMessage, MailError>;
}

/// Gmail REST client.
pub struct GmailApiClient {
    client: Client,
}

impl GmailApiClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MailError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 {
            return Err(MailError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl Default for GmailApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailProvider for GmailApiClient {
    async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailError> {
        let url = format!("{}/users/me/messages", GMAIL_API_BASE);
        let max_results = max_results.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let listing: MessageListResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        Ok(listing.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, access_token: &str, id: &str) -> Result<GmailMessage, MailError> {
        let url = format!("{}/users/me/messages/{}", GMAIL_API_BASE, id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MailError::Network(e.to_string()))
    }
}

/// Mock mail provider for testing: a scripted mailbox.
pub struct MockMailProvider {
    messages: Vec<GmailMessage>,
}

impl MockMailProvider {
    pub fn new(messages: Vec<GmailMessage>) -> Self {
        Self { messages }
    }

    /// A mailbox with no matching messages.
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
        }
    }
}

#[async_trait]
impl MailProvider for MockMailProvider {
    async fn list_messages(
        &self,
        _access_token: &str,
        _query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailError> {
        Ok(self
            .messages
            .iter()
            .take(max_results as usize)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn get_message(&self, _access_token: &str, id: &str) -> Result<GmailMessage, MailError> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(MailError::Api {
                status: 404,
                body: "message not found".to_string(),
            })
    }
}

// ============================================================================
// Gmail API message types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
    pub body: Option<MessageBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    pub data: Option<String>,
}

/// Fields a card-notification email must yield to become a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailFields {
    pub amount: i64,
    pub merchant_name: String,
}

/// Read a top-level header, case-insensitively.
pub fn header<'a>(message: &'a GmailMessage, name: &str) -> Option<&'a str> {
    message.payload.as_ref().and_then(|payload| {
        payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    })
}

/// Extract the best available text body: a direct non-multipart body
/// first, then the first `text/plain` part, then the first `text/html`
/// part stripped to text. Missing body yields an empty string.
pub fn extract_body(message: &GmailMessage) -> String {
    let Some(payload) = &message.payload else {
        return String::new();
    };

    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        let body = decode_body(data);
        return if looks_like_html(&body) {
            strip_html(&body)
        } else {
            body
        };
    }

    if let Some(part) = find_part(&payload.parts, "text/plain") {
        return decode_body(part.body.as_ref().and_then(|b| b.data.as_deref()).unwrap_or(""));
    }

    if let Some(part) = find_part(&payload.parts, "text/html") {
        let html = decode_body(part.body.as_ref().and_then(|b| b.data.as_deref()).unwrap_or(""));
        return strip_html(&html);
    }

    String::new()
}

/// Depth-first search for the first part of the given MIME type that
/// actually carries body data.
fn find_part<'a>(parts: &'a [MessagePart], mime_type: &str) -> Option<&'a MessagePart> {
    for part in parts {
        if part.mime_type.eq_ignore_ascii_case(mime_type)
            && part.body.as_ref().is_some_and(|b| b.data.is_some())
        {
            return Some(part);
        }
        if let Some(found) = find_part(&part.parts, mime_type) {
            return Some(found);
        }
    }
    None
}

/// Gmail part bodies are base64url; be lenient about padding and the
/// standard alphabet. Undecodable data degrades to an empty body.
fn decode_body(data: &str) -> String {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .or_else(|_| STANDARD.decode(data))
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn looks_like_html(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("<html") || lowered.contains("<!doctype")
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup and collapse runs of whitespace to single spaces.
pub fn strip_html(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3}(?:,\d{3})*|\d+)원").unwrap());
static MERCHANT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"가맹점[:\s]*([^\n]+)").unwrap());

/// Pull the transaction fields out of a notification body. The amount is
/// mandatory; the merchant falls back to a placeholder when absent.
pub fn extract_fields(text: &str) -> Option<EmailFields> {
    let amount_caps = AMOUNT_RE.captures(text)?;
    let amount = normalize::amount_from_text(&amount_caps[1]);

    let merchant_name = MERCHANT_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string());

    Some(EmailFields {
        amount,
        merchant_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE.encode(text.as_bytes())
    }

    fn message_with_payload(payload: MessagePart) -> GmailMessage {
        GmailMessage {
            id: "m-1".to_string(),
            payload: Some(payload),
        }
    }

    fn part(mime_type: &str, body: &str) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            body: Some(MessageBody {
                data: Some(encode(body)),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn direct_plain_body_is_returned_unchanged() {
        let message = message_with_payload(part("text/plain", "승인 12,345원 가맹점: 카페"));
        assert_eq!(extract_body(&message), "승인 12,345원 가맹점: 카페");
    }

    #[test]
    fn plain_part_is_preferred_over_html() {
        let payload = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![
                part("text/html", "<p>ignored</p>"),
                part("text/plain", "plain wins"),
            ],
            ..Default::default()
        };
        assert_eq!(extract_body(&message_with_payload(payload)), "plain wins");
    }

    #[test]
    fn html_fallback_strips_tags_and_collapses_whitespace() {
        let html = "<html><body><div>승인   12,345원</div>\n\n<span>가맹점: 카페</span></body></html>";
        let payload = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![part("text/html", html)],
            ..Default::default()
        };
        assert_eq!(
            extract_body(&message_with_payload(payload)),
            "승인 12,345원 가맹점: 카페"
        );
    }

    #[test]
    fn nested_multipart_parts_are_searched() {
        let inner = MessagePart {
            mime_type: "multipart/alternative".to_string(),
            parts: vec![part("text/plain", "nested body")],
            ..Default::default()
        };
        let payload = MessagePart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![inner],
            ..Default::default()
        };
        assert_eq!(extract_body(&message_with_payload(payload)), "nested body");
    }

    #[test]
    fn direct_html_body_is_stripped() {
        let message = message_with_payload(part(
            "text/html",
            "<!DOCTYPE html><html><b>7,000원</b>  결제</html>",
        ));
        assert_eq!(extract_body(&message), "7,000원 결제");
    }

    #[test]
    fn missing_body_yields_empty_string() {
        let message = GmailMessage {
            id: "m-2".to_string(),
            payload: None,
        };
        assert_eq!(extract_body(&message), "");

        let empty = message_with_payload(MessagePart::default());
        assert_eq!(extract_body(&empty), "");
    }

    #[test]
    fn fields_require_an_amount() {
        assert!(extract_fields("가맹점: 카페, no amount here").is_none());
    }

    #[test]
    fn fields_parse_amount_and_merchant() {
        let fields = extract_fields("승인 12,345원 가맹점: 스타벅스 강남점\n감사합니다").expect("fields");
        assert_eq!(fields.amount, 12345);
        assert_eq!(fields.merchant_name, "스타벅스 강남점");
    }

    #[test]
    fn missing_merchant_defaults_to_placeholder() {
        let fields = extract_fields("결제 금액 5,000원").expect("fields");
        assert_eq!(fields.amount, 5000);
        assert_eq!(fields.merchant_name, UNKNOWN_MERCHANT);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let payload = MessagePart {
            headers: vec![MessageHeader {
                name: "From".to_string(),
                value: "Hyundai Card <noreply@hyundaicard.com>".to_string(),
            }],
            ..Default::default()
        };
        let message = message_with_payload(payload);
        assert_eq!(
            header(&message, "from"),
            Some("Hyundai Card <noreply@hyundaicard.com>")
        );
        assert_eq!(header(&message, "Subject"), None);
    }
}
