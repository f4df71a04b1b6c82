use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_SOURCE: &str = "manual";
pub const DEFAULT_DUE: &str = "< 7 days";
pub const MISSING_NAME: &str = "Please provide at least a contract name.";

/// Stored contract record, one element of the contracts file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub source: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub contractor: String,
    #[serde(rename = "type", default, deserialize_with = "loose_string_or_empty")]
    pub contract_type: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub start: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub end: String,
    #[serde(
        default,
        serialize_with = "compact_number",
        deserialize_with = "loose_number"
    )]
    pub total: f64,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub due: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub pdf_file: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub contract_text: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub created_at: String,
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub updated_at: String,
    /// Fields written by other tools, kept so a rewrite does not drop them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contract {
    pub fn has_full_text(&self) -> bool {
        !self.contract_text.trim().is_empty()
    }
}

/// Body of `POST /api/contracts`. Every field is optional and the legacy
/// UI spellings (`contractName`, `totalCost`, ...) are accepted alongside
/// the stored names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContractInput {
    #[serde(deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub source: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(rename = "contractName", deserialize_with = "loose_string")]
    pub contract_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub contractor: Option<String>,
    #[serde(rename = "contractorName", deserialize_with = "loose_string")]
    pub contractor_name: Option<String>,
    #[serde(rename = "type", deserialize_with = "loose_string")]
    pub contract_type: Option<String>,
    #[serde(rename = "contractType", deserialize_with = "loose_string")]
    pub contract_type_alias: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub start: Option<String>,
    #[serde(rename = "startDate", deserialize_with = "loose_string")]
    pub start_date: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub end: Option<String>,
    #[serde(rename = "endDate", deserialize_with = "loose_string")]
    pub end_date: Option<String>,
    pub total: Option<Value>,
    #[serde(rename = "totalCost")]
    pub total_cost: Option<Value>,
    #[serde(deserialize_with = "loose_string")]
    pub due: Option<String>,
    #[serde(rename = "pdfFile", deserialize_with = "loose_string")]
    pub pdf_file: Option<String>,
    #[serde(rename = "pdfFileName", deserialize_with = "loose_string")]
    pub pdf_file_name: Option<String>,
    #[serde(rename = "contractText", deserialize_with = "loose_string")]
    pub contract_text: Option<String>,
}

impl ContractInput {
    /// Name after alias resolution; empty when none was given.
    pub fn resolved_name(&self) -> String {
        first_non_empty(&[&self.name, &self.contract_name])
    }

    /// Caller-supplied id, if any.
    pub fn supplied_id(&self) -> Option<String> {
        Some(first_non_empty(&[&self.id])).filter(|id| !id.is_empty())
    }

    /// Builds the normalized record. `previous` is the record being replaced,
    /// whose creation time is carried over.
    pub fn into_contract(
        self,
        id: String,
        now: DateTime<Utc>,
        previous: Option<&Contract>,
    ) -> Result<Contract, String> {
        let name = self.resolved_name();
        if name.trim().is_empty() {
            return Err(MISSING_NAME.to_string());
        }

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let created_at = previous
            .map(|p| p.created_at.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| timestamp.clone());

        let total = self
            .total
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.total_cost.as_ref())
            .map(coerce_number)
            .unwrap_or(0.0);

        Ok(Contract {
            id,
            source: first_non_empty(&[&self.source]).or_if_empty(|| DEFAULT_SOURCE.to_string()),
            name,
            contractor: first_non_empty(&[&self.contractor, &self.contractor_name]),
            contract_type: first_non_empty(&[&self.contract_type, &self.contract_type_alias]),
            phone: first_non_empty(&[&self.phone]),
            start: first_non_empty(&[&self.start, &self.start_date]),
            end: first_non_empty(&[&self.end, &self.end_date]),
            total,
            due: first_non_empty(&[&self.due]).or_if_empty(|| DEFAULT_DUE.to_string()),
            pdf_file: first_non_empty(&[&self.pdf_file, &self.pdf_file_name]),
            contract_text: self.contract_text.unwrap_or_default(),
            created_at,
            updated_at: timestamp,
            extra: Map::new(),
        })
    }
}

trait OrIfEmpty {
    fn or_if_empty(self, f: impl FnOnce() -> String) -> String;
}

impl OrIfEmpty for String {
    fn or_if_empty(self, f: impl FnOnce() -> String) -> String {
        if self.is_empty() { f() } else { self }
    }
}

fn first_non_empty(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Numeric coercion for user-entered amounts. Anything unparseable is 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn loose_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_to_string(Value::deserialize(deserializer)?))
}

fn loose_string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn loose_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_number(&Value::deserialize(deserializer)?))
}

fn compact_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[cfg(test)]
mod contract_tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> ContractInput {
        serde_json::from_value(value).expect("Failed to parse input")
    }

    #[test]
    fn test_defaults_are_applied() {
        let now = Utc::now();
        let raw = input(json!({ "name": "MSA-2026" }));
        assert_eq!(raw.supplied_id(), None);
        let contract = raw.into_contract("c1".into(), now, None).unwrap();

        assert_eq!(contract.source, "manual");
        assert_eq!(contract.due, "< 7 days");
        assert_eq!(contract.total, 0.0);
        assert_eq!(contract.created_at, contract.updated_at);
        assert!(contract.created_at.ends_with('Z'));

        let json = serde_json::to_value(&contract).unwrap();
        assert_eq!(json["total"], json!(0));
        assert_eq!(json["type"], json!(""));
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn test_aliases_are_resolved() {
        let now = Utc::now();
        let raw = input(json!({
            "id": 42,
            "contractName": "Lease",
            "contractorName": "ACME",
            "contractType": "rent",
            "startDate": "2026-01-01",
            "endDate": "2026-12-31",
            "totalCost": "1500.50",
            "pdfFileName": "lease.pdf"
        }));
        let id = raw.supplied_id().unwrap();
        let contract = raw.into_contract(id, now, None).unwrap();

        assert_eq!(contract.id, "42");
        assert_eq!(contract.name, "Lease");
        assert_eq!(contract.contractor, "ACME");
        assert_eq!(contract.contract_type, "rent");
        assert_eq!(contract.start, "2026-01-01");
        assert_eq!(contract.end, "2026-12-31");
        assert_eq!(contract.total, 1500.5);
        assert_eq!(contract.pdf_file, "lease.pdf");
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let now = Utc::now();
        let raw = input(json!({ "name": "   " }));
        let err = raw.into_contract("1".into(), now, None).unwrap_err();
        assert_eq!(err, MISSING_NAME);
    }

    #[test]
    fn test_created_at_survives_replace() {
        let earlier = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let first = input(json!({ "id": "c1", "name": "A" }))
            .into_contract("c1".into(), earlier, None)
            .unwrap();
        let second = input(json!({ "id": "c1", "name": "B" }))
            .into_contract("c1".into(), now, Some(&first))
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_ne!(second.updated_at, first.updated_at);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(12)), 12.0);
        assert_eq!(coerce_number(&json!(" 7.25 ")), 7.25);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert_eq!(coerce_number(&json!([1])), 0.0);
    }

    #[test]
    fn test_stored_record_keeps_unknown_fields() {
        let stored = json!({
            "id": 17,
            "name": "Old",
            "total": 3.5,
            "reviewer": "jane"
        });
        let contract: Contract = serde_json::from_value(stored).unwrap();
        assert_eq!(contract.id, "17");
        assert_eq!(contract.extra.get("reviewer"), Some(&json!("jane")));

        let back = serde_json::to_value(&contract).unwrap();
        assert_eq!(back["reviewer"], json!("jane"));
        assert_eq!(back["total"], json!(3.5));
    }

    #[test]
    fn test_stored_record_with_loose_scalars() {
        let stored = json!({
            "id": "1",
            "name": "A",
            "phone": 5551234,
            "due": null,
            "pdfFile": false,
            "total": "1200.50"
        });
        let contract: Contract = serde_json::from_value(stored).unwrap();
        assert_eq!(contract.phone, "5551234");
        assert_eq!(contract.due, "");
        assert_eq!(contract.pdf_file, "false");
        assert_eq!(contract.total, 1200.5);

        let contract: Contract =
            serde_json::from_value(json!({ "id": "2", "name": "B", "total": null })).unwrap();
        assert_eq!(contract.total, 0.0);
    }
}
