use crate::error::{ReconcileError, Result};
use crate::normalize::{parse_amount, parse_date, to_wire_date};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Ordered alias lists for the canonical GL fields. Matching is
/// case-sensitive on the source keys; the first alias present wins.
pub const ACCOUNT_ALIASES: [&str; 4] = ["n° compte", "numero_compte", "compte", "N° Compte"];
pub const LABEL_ALIASES: [&str; 4] = ["libellé", "libelle", "description", "Libellé"];
pub const DATE_ALIASES: [&str; 3] = ["date", "Date", "DATE"];
pub const DEBIT_ALIASES: [&str; 3] = ["débit", "debit", "DÉBIT"];
pub const CREDIT_ALIASES: [&str; 3] = ["crédit", "credit", "CRÉDIT"];

/// Keys under which a GL document may carry its entry list.
const GL_LIST_KEYS: [&str; 3] = ["ecritures_comptables", "ecritures", "lignes"];

/// One canonical general-ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub account: String,
    pub label: String,
    pub date: Option<NaiveDate>,
    pub debit: f64,
    pub credit: f64,
    pub net: f64,
}

impl Entry {
    /// Normalizes a raw GL record. Returns `None` when the record has no
    /// account number; amounts and dates that fail to parse fall back to
    /// zero / `None` but the entry is retained.
    pub fn from_raw(raw: &Map<String, Value>) -> Option<Entry> {
        let account = probe_string(raw, &ACCOUNT_ALIASES)?;
        if account.is_empty() {
            return None;
        }

        let label = probe_string(raw, &LABEL_ALIASES).unwrap_or_default();
        let date = probe_string(raw, &DATE_ALIASES).and_then(|s| parse_date(&s));
        let debit = probe_amount(raw, &DEBIT_ALIASES);
        let credit = probe_amount(raw, &CREDIT_ALIASES);

        Some(Entry {
            account,
            label,
            date,
            debit,
            credit,
            net: debit - credit,
        })
    }

    /// Renders the entry back into the GL wire shape.
    pub fn to_wire(&self) -> Value {
        json!({
            "n° compte": self.account,
            "libellé": self.label,
            "date": self.date.map(to_wire_date).unwrap_or_default(),
            "débit": self.debit,
            "crédit": self.credit,
        })
    }
}

/// One canonical bank-statement operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankOperation {
    pub date: Option<NaiveDate>,
    pub nature: String,
    pub montant: f64,
    #[serde(rename = "type")]
    pub operation_type: String,
}

impl BankOperation {
    pub fn from_raw(raw: &Map<String, Value>) -> Option<BankOperation> {
        let nature = raw.get("nature").map(value_to_string)?;
        if nature.is_empty() {
            return None;
        }

        let date = raw
            .get("date")
            .map(value_to_string)
            .and_then(|s| parse_date(&s));
        let montant = raw.get("montant").map(parse_amount).unwrap_or(0.0);
        let operation_type = raw
            .get("type")
            .map(value_to_string)
            .unwrap_or_default();

        Some(BankOperation {
            date,
            nature,
            montant,
            operation_type,
        })
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "date": self.date.map(to_wire_date).unwrap_or_default(),
            "nature": self.nature,
            "montant": self.montant,
            "type": self.operation_type,
        })
    }
}

/// Pulls and normalizes the entry list of a GL document. A document that has
/// none of the known list keys is an input-shape error.
pub fn extract_entries(document: &Value) -> Result<Vec<Entry>> {
    let list = GL_LIST_KEYS
        .iter()
        .find_map(|key| document.get(*key))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ReconcileError::InputShape("no ecritures_comptables list in document".to_string())
        })?;

    Ok(list
        .iter()
        .filter_map(Value::as_object)
        .filter_map(Entry::from_raw)
        .collect())
}

/// Pulls and normalizes the operation list of an RL document.
pub fn extract_operations(document: &Value) -> Result<Vec<BankOperation>> {
    let list = document
        .get("operations")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ReconcileError::InputShape("no operations list in document".to_string())
        })?;

    Ok(list
        .iter()
        .filter_map(Value::as_object)
        .filter_map(BankOperation::from_raw)
        .collect())
}

fn probe_string(raw: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|key| raw.get(*key))
        .map(value_to_string)
}

fn probe_amount(raw: &Map<String, Value>, aliases: &[&str]) -> f64 {
    aliases
        .iter()
        .find_map(|key| raw.get(*key))
        .map(parse_amount)
        .unwrap_or(0.0)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
