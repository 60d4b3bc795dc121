use crate::entry::{BankOperation, Entry};
use crate::store::{doc_reference, DocumentKind, StoredDocument};
use serde_json::Value;
use std::collections::BTreeMap;

/// One invoice or cheque document participating in a reconciliation pass.
#[derive(Debug, Clone)]
pub struct SourceDocRecord {
    pub document_id: String,
    pub kind: DocumentKind,
    pub reference: Option<String>,
    pub content: Value,
}

impl SourceDocRecord {
    pub fn new(kind: DocumentKind, stored: StoredDocument) -> Self {
        let reference = doc_reference(&stored.content);
        SourceDocRecord {
            document_id: stored.document_id,
            kind,
            reference,
            content: stored.content,
        }
    }
}

/// Bidirectional reference indexes over GL entries, RL operations, and
/// source documents. A reference matches an entry iff it occurs as a
/// case-sensitive substring of the entry label (GL) or operation nature
/// (RL); multiple hits per reference are preserved as lists.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    pub gl_by_ref: BTreeMap<String, Vec<Entry>>,
    pub rl_by_ref: BTreeMap<String, Vec<BankOperation>>,
    pub docs_by_ref: BTreeMap<String, SourceDocRecord>,
}

impl ReferenceIndex {
    pub fn build(
        entries: &[Entry],
        operations: &[BankOperation],
        documents: &[SourceDocRecord],
    ) -> Self {
        let mut index = ReferenceIndex::default();

        for document in documents {
            let Some(reference) = document.reference.as_deref() else {
                continue;
            };

            let gl_hits: Vec<Entry> = entries
                .iter()
                .filter(|e| e.label.contains(reference))
                .cloned()
                .collect();
            if !gl_hits.is_empty() {
                index.gl_by_ref.insert(reference.to_string(), gl_hits);
            }

            let rl_hits: Vec<BankOperation> = operations
                .iter()
                .filter(|op| op.nature.contains(reference))
                .cloned()
                .collect();
            if !rl_hits.is_empty() {
                index.rl_by_ref.insert(reference.to_string(), rl_hits);
            }

            index
                .docs_by_ref
                .insert(reference.to_string(), document.clone());
        }

        index
    }

    pub fn gl_entries(&self, reference: &str) -> &[Entry] {
        self.gl_by_ref
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rl_operations(&self, reference: &str) -> &[BankOperation] {
        self.rl_by_ref
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
