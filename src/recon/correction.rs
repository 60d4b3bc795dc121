use crate::entry::LABEL_ALIASES;
use crate::error::{ReconcileError, Result};
use crate::store::DocumentStore;
use log::info;
use serde_json::{Map, Value};

/// What a correction changed in the target document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOutcome {
    pub document_id: String,
    pub removed: usize,
    pub added: usize,
}

/// Applies a user-edited correction to one document.
///
/// For a GL the entry list is partitioned into entries whose label does not
/// contain the alert reference plus the replacement entries; an RL is
/// partitioned the same way over operation natures. Source documents take a
/// shallow merge. Every other key of the document is preserved and the body
/// is persisted as a whole-document replace. Applying the same correction
/// twice yields the same document as applying it once.
pub fn apply_correction<S: DocumentStore>(
    store: &mut S,
    document_id: &str,
    alert_ref: &str,
    new_content: &Value,
) -> Result<CorrectionOutcome> {
    let mut document = store.get_document(document_id)?;

    let outcome = if document.get("ecritures_comptables").is_some() {
        rewrite_list(
            &mut document,
            "ecritures_comptables",
            alert_ref,
            new_content,
            &LABEL_ALIASES,
            document_id,
        )?
    } else if document.get("operations").is_some() {
        rewrite_list(
            &mut document,
            "operations",
            alert_ref,
            new_content,
            &["nature"],
            document_id,
        )?
    } else {
        merge_document(&mut document, new_content, document_id)?
    };

    if outcome.removed == 0 && outcome.added == 0 {
        // Reference miss with nothing to add: succeed without writing.
        return Ok(outcome);
    }

    store.save_document(document_id, &serde_json::to_string(&document)?)?;
    info!(
        "correction applied to {}: {} removed, {} added",
        document_id, outcome.removed, outcome.added
    );
    Ok(outcome)
}

fn rewrite_list(
    document: &mut Value,
    list_key: &str,
    alert_ref: &str,
    new_content: &Value,
    carrier_aliases: &[&str],
    document_id: &str,
) -> Result<CorrectionOutcome> {
    let replacements = replacement_records(new_content, list_key)?;

    let list = document
        .get_mut(list_key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| {
            ReconcileError::InputShape(format!("{} is not a list in {}", list_key, document_id))
        })?;

    let before = list.len();
    list.retain(|record| !record_carries_ref(record, carrier_aliases, alert_ref));
    let removed = before - list.len();

    let added = replacements.len();
    list.extend(replacements);

    Ok(CorrectionOutcome {
        document_id: document_id.to_string(),
        removed,
        added,
    })
}

/// The replacement records: either a bare array or an object wrapping the
/// array under the document's own list key.
fn replacement_records(new_content: &Value, list_key: &str) -> Result<Vec<Value>> {
    match new_content {
        Value::Array(records) => Ok(records.clone()),
        Value::Object(map) => match map.get(list_key) {
            Some(Value::Array(records)) => Ok(records.clone()),
            Some(_) => Err(ReconcileError::InputShape(format!(
                "{} in the correction payload is not a list",
                list_key
            ))),
            None => Ok(Vec::new()),
        },
        Value::Null => Ok(Vec::new()),
        _ => Err(ReconcileError::InputShape(
            "correction payload must be a list or an object".to_string(),
        )),
    }
}

fn record_carries_ref(record: &Value, carrier_aliases: &[&str], alert_ref: &str) -> bool {
    let Some(map) = record.as_object() else {
        return false;
    };
    carrier_aliases
        .iter()
        .find_map(|key| map.get(*key))
        .and_then(Value::as_str)
        .map(|carrier| carrier.contains(alert_ref))
        .unwrap_or(false)
}

fn merge_document(
    document: &mut Value,
    new_content: &Value,
    document_id: &str,
) -> Result<CorrectionOutcome> {
    let updates: &Map<String, Value> = new_content.as_object().ok_or_else(|| {
        ReconcileError::InputShape("source-document correction must be an object".to_string())
    })?;

    let target = document.as_object_mut().ok_or_else(|| {
        ReconcileError::InputShape(format!("document {} is not an object", document_id))
    })?;

    let mut added = 0;
    for (key, value) in updates {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            added += 1;
        }
    }

    Ok(CorrectionOutcome {
        document_id: document_id.to_string(),
        removed: 0,
        added,
    })
}
