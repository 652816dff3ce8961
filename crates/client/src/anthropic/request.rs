//! Messages API request body and the extraction prompt.

use serde::Serialize;

/// Placeholder replaced by the page text.
const TEXT_SLOT: &str = "{text}";

/// Instruction template sent with every extraction call.
///
/// One call returns both the framework agreement and every corporate
/// commitment found on the page.
pub const EXTRACTION_PROMPT: &str = r#"The text below comes from a US government page. Decide whether it describes a bilateral technology or trade partnership between the United States and another country.

Page text:
{text}

If the page is NOT about such a partnership, reply with exactly {"is_tpd": false}.

Otherwise reply with one JSON object of this shape:
{
  "is_tpd": true,
  "parent": {
    "title": "short title of the agreement",
    "summary": "one sentence, at most 200 characters",
    "country_code": "GBR|JPN|KOR",
    "date_signed": "YYYY-MM-DD or null",
    "signatories": ["name", "name"],
    "sectors": ["AI", "Nuclear Energy"],
    "total_value_usd": integer or null,
    "status": "ACTIVE|PENDING|COMPLETED"
  },
  "children": [
    {
      "title": "short title of the commitment",
      "summary": "one sentence, at most 150 characters",
      "parties": ["company", "company"],
      "deal_value_usd": integer or null,
      "sector": "Aviation & Defense",
      "commitment_details": "what was committed",
      "status": "ACTIVE|PENDING|COMPLETED"
    }
  ]
}

Rules:
- List every individual corporate commitment (investments, purchases, partnerships).
- Dollar amounts are whole integers: "$36.2 billion" becomes 36200000000.
- Country codes: GBR for the United Kingdom, JPN for Japan, KOR for South Korea.
- Use null for anything the page does not state.
- Output the JSON only, without markdown or commentary."#;

/// Fill the extraction template with page text.
pub fn build_prompt(text: &str) -> String {
    EXTRACTION_PROMPT.replacen(TEXT_SLOT, text, 1)
}

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl MessagesRequest {
    /// Single-turn extraction request for `text`.
    pub fn extraction(model: &str, max_tokens: u32, text: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            messages: vec![Message { role: "user", content: build_prompt(text) }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_inserts_text_once() {
        let prompt = build_prompt("Korean Air: $36.2 billion");
        assert!(prompt.contains("Page text:\nKorean Air: $36.2 billion\n"));
        assert!(!prompt.contains(TEXT_SLOT));
    }

    #[test]
    fn test_text_with_braces_is_not_reinterpreted() {
        let prompt = build_prompt("literal {text} in page");
        assert!(prompt.contains("literal {text} in page"));
    }

    #[test]
    fn test_request_serialization() {
        let req = MessagesRequest::extraction("claude-3-5-haiku-20241022", 2048, "page");
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["model"], "claude-3-5-haiku-20241022");
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value["messages"][0]["content"].as_str().unwrap().contains("page"));
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }
}
