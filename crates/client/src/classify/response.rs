//! Parsing model replies into typed classifications and output records.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tpd_core::AppConfig;
use tpd_core::models::{Deal, DealStatus, DealType, RawCandidate, SourceDocument};

use super::ClassifyError;

/// Country code used when the reply names none.
const FALLBACK_COUNTRY: &str = "USA";

/// Relevance decision for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    NotRelevant,
    Relevant(DealPayload),
}

/// Parent and children of a relevant reply, each validated on its own.
///
/// An item that fails validation keeps its reason instead of a value, so one
/// bad child never discards its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct DealPayload {
    /// ISO code from the parent, or `USA` when absent.
    pub country: String,
    pub parent: Result<ParentFields, String>,
    pub children: Vec<Result<ChildFields, String>>,
}

/// Framework-level deal as described by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParentFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub date_signed: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signatories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sectors: Vec<String>,
    #[serde(default, deserialize_with = "lax_int")]
    pub total_value_usd: Option<i64>,
    #[serde(default = "active", deserialize_with = "status")]
    pub status: DealStatus,
}

impl Default for ParentFields {
    fn default() -> Self {
        Self {
            title: None,
            summary: None,
            date_signed: None,
            signatories: Vec::new(),
            sectors: Vec::new(),
            total_value_usd: None,
            status: DealStatus::Active,
        }
    }
}

/// One commitment under a framework deal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChildFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parties: Vec<String>,
    #[serde(default, deserialize_with = "lax_int")]
    pub deal_value_usd: Option<i64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub commitment_details: Option<String>,
    #[serde(default = "active", deserialize_with = "status")]
    pub status: DealStatus,
}

impl Classification {
    /// Interpret a parsed reply (live or cached).
    ///
    /// The envelope must be well formed (`parent` an object, `children` an
    /// array); the items inside are validated individually.
    pub fn from_value(value: &Value) -> Result<Self, ClassifyError> {
        let Some(object) = value.as_object() else {
            return Err(ClassifyError::Malformed(format!("expected a JSON object, got {}", kind(value))));
        };

        let relevant = object.get("is_tpd").or_else(|| object.get("is_relevant")).and_then(Value::as_bool);
        if relevant != Some(true) {
            return Ok(Classification::NotRelevant);
        }

        let (country, parent) = match object.get("parent") {
            Some(parent) if parent.is_object() => {
                let country =
                    parent.get("country_code").and_then(Value::as_str).filter(|code| !code.trim().is_empty());
                (country, typed::<ParentFields>(parent))
            }
            Some(Value::Null) | None => (None, Ok(ParentFields::default())),
            Some(other) => {
                return Err(ClassifyError::Malformed(format!("parent must be an object, got {}", kind(other))));
            }
        };

        let children = match object.get("children") {
            Some(Value::Array(items)) => items.iter().map(typed::<ChildFields>).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(ClassifyError::Malformed(format!("children must be an array, got {}", kind(other))));
            }
        };

        Ok(Classification::Relevant(DealPayload {
            country: country.unwrap_or(FALLBACK_COUNTRY).to_string(),
            parent,
            children,
        }))
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Classification::Relevant(_))
    }
}

fn typed<T: DeserializeOwned>(item: &Value) -> Result<T, String> {
    T::deserialize(item).map_err(|e| e.to_string())
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = trimmed.split_once('\n').map_or("", |(_, rest)| rest);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a raw model reply into JSON.
///
/// Falls back to the outermost `{...}` span when the reply wraps the object
/// in prose.
pub fn parse_reply(reply: &str) -> Result<Value, ClassifyError> {
    let body = strip_fences(reply);

    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let span = body.find('{').zip(body.rfind('}')).filter(|(start, end)| start < end);
            match span {
                Some((start, end)) => serde_json::from_str(&body[start..=end])
                    .map_err(|_| ClassifyError::Malformed(format!("invalid JSON: {first_err}"))),
                None => Err(ClassifyError::Malformed(format!("invalid JSON: {first_err}"))),
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers, whole floats and numeric strings; `null` is absent.
fn lax_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                    _ => Err(D::Error::custom(format!("value is not an integer: {n}"))),
                }
            }
        }
        Some(Value::String(s)) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            cleaned.parse::<i64>().map(Some).map_err(|_| D::Error::custom(format!("value is not an integer: {s:?}")))
        }
        Some(other) => Err(D::Error::custom(format!("value is not an integer: {other}"))),
    }
}

fn active() -> DealStatus {
    DealStatus::Active
}

/// Upper-case status string; `null` reads as `ACTIVE`.
fn status<'de, D>(deserializer: D) -> Result<DealStatus, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(DealStatus::Active),
        Some(s) => DealStatus::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown status {s:?}"))),
    }
}

/// Records built from one relevant classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    pub parent: Option<Deal>,
    pub children: Vec<Deal>,
    /// Why individual items were dropped.
    pub rejected: Vec<String>,
}

/// Build output records for `candidate`.
///
/// The parent id is `tpd-{country}-{counter}`; children are numbered from 1
/// under it. A parent that failed validation is dropped but its children are
/// still built against its id.
pub fn build_records(payload: &DealPayload, candidate: &RawCandidate, counter: u64, config: &AppConfig) -> Records {
    let country = payload.country.as_str();
    let parent_id = format!("tpd-{}-{}", country.to_lowercase(), counter);

    let mut records = Records::default();

    match &payload.parent {
        Ok(fields) => records.parent = Some(parent_deal(fields, candidate, &parent_id, country, config)),
        Err(reason) => {
            tracing::error!("failed to build parent {}: {}", parent_id, reason);
            records.rejected.push(format!("{parent_id}: {reason}"));
        }
    }

    for (idx, item) in payload.children.iter().enumerate() {
        let child_id = format!("{parent_id}-{:03}", idx + 1);
        match item {
            Ok(fields) => records.children.push(child_deal(fields, candidate, &child_id, &parent_id, country)),
            Err(reason) => {
                tracing::error!("failed to build child {}: {}", child_id, reason);
                records.rejected.push(format!("{child_id}: {reason}"));
            }
        }
    }

    records
}

fn parent_deal(fields: &ParentFields, candidate: &RawCandidate, id: &str, country: &str, config: &AppConfig) -> Deal {
    let date = if candidate.raw_date.is_empty() {
        fields.date_signed.clone().unwrap_or_default()
    } else {
        candidate.raw_date.clone()
    };

    Deal {
        id: id.to_string(),
        parent_id: None,
        source_id: candidate.source_id.clone(),
        source_url: candidate.source_url.clone(),
        title: fields.title.clone().unwrap_or_else(|| candidate.title.clone()),
        summary: fields.summary.clone().unwrap_or_default(),
        deal_type: DealType::Trade,
        status: fields.status,
        parties: vec!["United States".to_string(), config.country_name(country)],
        deal_value_usd: fields.total_value_usd,
        country: country.to_string(),
        date,
        date_signed: fields.date_signed.clone(),
        tags: Vec::new(),
        sectors: fields.sectors.clone(),
        signatories: fields.signatories.clone(),
        source_documents: vec![SourceDocument {
            label: format!("{} source", candidate.source_name),
            url: candidate.source_url.clone(),
        }],
        commitment_details: None,
    }
}

fn child_deal(fields: &ChildFields, candidate: &RawCandidate, id: &str, parent_id: &str, country: &str) -> Deal {
    Deal {
        id: id.to_string(),
        parent_id: Some(parent_id.to_string()),
        source_id: String::new(),
        source_url: candidate.source_url.clone(),
        title: fields.title.clone().unwrap_or_default(),
        summary: fields.summary.clone().unwrap_or_default(),
        deal_type: DealType::Business,
        status: fields.status,
        parties: fields.parties.clone(),
        deal_value_usd: fields.deal_value_usd,
        country: country.to_string(),
        date: candidate.raw_date.clone(),
        date_signed: None,
        tags: Vec::new(),
        sectors: fields.sector.iter().filter(|s| !s.is_empty()).cloned().collect(),
        signatories: Vec::new(),
        source_documents: Vec::new(),
        commitment_details: fields.commitment_details.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> RawCandidate {
        RawCandidate {
            title: "US-Japan Technology Prosperity Deal".into(),
            source_url: "https://www.whitehouse.gov/fact-sheets/us-japan/".into(),
            source_id: "wh-2025-10-28".into(),
            snippet: String::new(),
            raw_date: "2025-10-28".into(),
            source_name: "whitehouse".into(),
        }
    }

    fn payload(value: Value) -> DealPayload {
        match Classification::from_value(&value).unwrap() {
            Classification::Relevant(payload) => payload,
            Classification::NotRelevant => panic!("expected relevant"),
        }
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{\"is_tpd\": false}\n```"), "{\"is_tpd\": false}");
        assert_eq!(strip_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_reply_fenced() {
        let value = parse_reply("```json\n{\"is_tpd\": true, \"children\": []}\n```").unwrap();
        assert_eq!(value["is_tpd"], true);
    }

    #[test]
    fn test_parse_reply_with_prose() {
        let value = parse_reply("Here is the data:\n{\"is_tpd\": false}\nLet me know.").unwrap();
        assert_eq!(value, json!({"is_tpd": false}));
    }

    #[test]
    fn test_parse_reply_malformed() {
        assert!(matches!(parse_reply("I could not find a deal."), Err(ClassifyError::Malformed(_))));
        assert!(matches!(parse_reply("{\"is_tpd\": tru"), Err(ClassifyError::Malformed(_))));
    }

    #[test]
    fn test_not_relevant() {
        assert_eq!(Classification::from_value(&json!({"is_tpd": false})).unwrap(), Classification::NotRelevant);
        assert_eq!(Classification::from_value(&json!({})).unwrap(), Classification::NotRelevant);
        assert!(matches!(Classification::from_value(&json!([1, 2])), Err(ClassifyError::Malformed(_))));
    }

    #[test]
    fn test_is_relevant_alias() {
        let classification = Classification::from_value(&json!({"is_relevant": true, "parent": {}})).unwrap();
        assert!(classification.is_relevant());
    }

    #[test]
    fn test_payload_items_typed_individually() {
        let payload = payload(json!({
            "is_tpd": true,
            "parent": {"country_code": "KOR", "sectors": ["Shipbuilding"], "status": "PENDING"},
            "children": [
                {"title": "Hanwha Philly Shipyard", "deal_value_usd": "5,000,000,000"},
                {"title": "Unknown status", "status": "DRAFT"}
            ]
        }));

        assert_eq!(payload.country, "KOR");
        let parent = payload.parent.as_ref().unwrap();
        assert_eq!(parent.status, DealStatus::Pending);
        assert_eq!(parent.sectors, vec!["Shipbuilding"]);

        let first = payload.children[0].as_ref().unwrap();
        assert_eq!(first.deal_value_usd, Some(5_000_000_000));
        assert_eq!(first.status, DealStatus::Active);
        assert!(payload.children[1].as_ref().unwrap_err().contains("DRAFT"));
    }

    #[test]
    fn test_null_parent_defaults() {
        let payload = payload(json!({"is_tpd": true, "parent": null}));
        assert_eq!(payload.country, "USA");
        assert_eq!(payload.parent, Ok(ParentFields::default()));
        assert!(payload.children.is_empty());
    }

    #[test]
    fn test_children_wrong_type_is_malformed() {
        let result = Classification::from_value(&json!({"is_tpd": true, "children": "none"}));
        assert!(matches!(result, Err(ClassifyError::Malformed(_))));
    }

    #[test]
    fn test_build_parent_and_children() {
        let payload = payload(json!({
            "is_tpd": true,
            "parent": {
                "title": "US-Japan Technology Prosperity Deal",
                "summary": "Framework for AI and nuclear cooperation.",
                "country_code": "JPN",
                "date_signed": "2025-10-27",
                "signatories": ["Donald Trump", "Sanae Takaichi"],
                "sectors": ["AI", "Nuclear Energy"],
                "total_value_usd": 550000000000i64,
                "status": "ACTIVE"
            },
            "children": [
                {"title": "Westinghouse reactors", "parties": ["Westinghouse"], "deal_value_usd": 100000000000i64,
                 "sector": "Nuclear Energy", "status": "PENDING"},
                {"title": "GE Vernova turbines", "deal_value_usd": "25000000000", "sector": ""}
            ]
        }));

        let records = build_records(&payload, &candidate(), 7, &AppConfig::default());
        let parent = records.parent.unwrap();
        assert_eq!(parent.id, "tpd-jpn-7");
        assert_eq!(parent.deal_type, DealType::Trade);
        assert_eq!(parent.parties, vec!["United States", "Japan"]);
        assert_eq!(parent.deal_value_usd, Some(550_000_000_000));
        assert_eq!(parent.date, "2025-10-28");
        assert_eq!(parent.date_signed.as_deref(), Some("2025-10-27"));
        assert_eq!(parent.source_documents[0].label, "whitehouse source");
        assert_eq!(parent.source_id, "wh-2025-10-28");

        assert_eq!(records.children.len(), 2);
        assert_eq!(records.children[0].id, "tpd-jpn-7-001");
        assert_eq!(records.children[0].parent_id.as_deref(), Some("tpd-jpn-7"));
        assert_eq!(records.children[0].status, DealStatus::Pending);
        assert_eq!(records.children[0].sectors, vec!["Nuclear Energy"]);
        assert_eq!(records.children[1].id, "tpd-jpn-7-002");
        assert_eq!(records.children[1].deal_value_usd, Some(25_000_000_000));
        assert!(records.children[1].sectors.is_empty());
        assert_eq!(records.children[1].deal_type, DealType::Business);
        assert!(records.rejected.is_empty());
    }

    #[test]
    fn test_invalid_children_skipped_individually() {
        let payload = payload(json!({
            "is_tpd": true,
            "parent": {"country_code": "GBR"},
            "children": [
                {"title": "Bad status", "status": "MAYBE"},
                {"title": "Fractional value", "deal_value_usd": 12.5},
                {"title": "Wrong parties", "parties": "Microsoft"},
                {"title": "Good one", "deal_value_usd": 30000000000.0}
            ]
        }));

        let records = build_records(&payload, &candidate(), 1, &AppConfig::default());
        assert_eq!(records.children.len(), 1);
        assert_eq!(records.children[0].id, "tpd-gbr-1-004");
        assert_eq!(records.children[0].deal_value_usd, Some(30_000_000_000));
        assert_eq!(records.rejected.len(), 3);
        assert_eq!(
            records.parent.unwrap().parties,
            vec!["United States", "United Kingdom of Great Britain and Northern Ireland"]
        );
    }

    #[test]
    fn test_bad_parent_keeps_children() {
        let payload = payload(json!({
            "is_tpd": true,
            "parent": {"country_code": "KOR", "status": "SIGNED"},
            "children": [{"title": "Korean Air aircraft purchase"}]
        }));

        let records = build_records(&payload, &candidate(), 3, &AppConfig::default());
        assert!(records.parent.is_none());
        assert_eq!(records.children[0].parent_id.as_deref(), Some("tpd-kor-3"));
        assert_eq!(records.rejected.len(), 1);
    }

    #[test]
    fn test_missing_country_and_nulls() {
        let payload = payload(json!({
            "is_tpd": true,
            "parent": {"country_code": null, "title": null, "sectors": null, "total_value_usd": null},
            "children": null
        }));

        let mut raw = candidate();
        raw.raw_date = String::new();
        let parent = build_records(&payload, &raw, 2, &AppConfig::default()).parent.unwrap();
        assert_eq!(parent.id, "tpd-usa-2");
        assert_eq!(parent.title, raw.title);
        assert!(parent.sectors.is_empty());
        assert_eq!(parent.deal_value_usd, None);
        assert_eq!(parent.parties, vec!["United States", "USA"]);
        assert_eq!(parent.date, "");
    }
}
