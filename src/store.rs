use crate::error::{ReconcileError, Result};
use serde_json::Value;

/// The four document families the core reconciles over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    GrandLivre,
    Releve,
    Facture,
    Cheque,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::GrandLivre => "grandlivre",
            DocumentKind::Releve => "releve",
            DocumentKind::Facture => "facture",
            DocumentKind::Cheque => "cheque",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document_id: String,
    pub content: Value,
}

/// Fetch/save contract the host provides. Documents are opaque JSON bodies
/// addressed by id; `save_document` is an atomic whole-body replace.
pub trait DocumentStore {
    /// Most recently stored document of a kind, if any.
    fn get_latest(&self, kind: DocumentKind) -> Result<Option<StoredDocument>>;

    fn get_document(&self, document_id: &str) -> Result<Value>;

    fn save_document(&mut self, document_id: &str, json_content: &str) -> Result<()>;

    /// All stored documents of a kind, in storage order.
    fn list_documents(&self, kind: DocumentKind) -> Result<Vec<StoredDocument>>;

    fn get_invoice(&self, reference: &str) -> Result<Option<Value>> {
        find_by_reference(self.list_documents(DocumentKind::Facture)?, reference)
    }

    fn get_cheque(&self, reference: &str) -> Result<Option<Value>> {
        find_by_reference(self.list_documents(DocumentKind::Cheque)?, reference)
    }
}

/// Reads a known field from a source document, looking first at the top
/// level and then inside the `info payment` block invoices nest it under.
pub fn doc_field<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    document.get(key).or_else(|| {
        document
            .get("info payment")
            .and_then(|payment| payment.get(key))
    })
}

/// The reference token a source document carries, if any.
pub fn doc_reference(document: &Value) -> Option<String> {
    ["Numéro Facture", "Numéro de Chèque"]
        .iter()
        .find_map(|key| doc_field(document, key))
        .and_then(|value| match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn find_by_reference(
    documents: Vec<StoredDocument>,
    reference: &str,
) -> Result<Option<Value>> {
    Ok(documents
        .into_iter()
        .find(|doc| doc_reference(&doc.content).as_deref() == Some(reference))
        .map(|doc| doc.content))
}

/// In-memory store used by tests and by hosts without a durable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<(DocumentKind, StoredDocument)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn insert(&mut self, document_id: &str, kind: DocumentKind, content: Value) {
        self.documents.push((
            kind,
            StoredDocument {
                document_id: document_id.to_string(),
                content,
            },
        ));
    }
}

impl DocumentStore for MemoryStore {
    fn get_latest(&self, kind: DocumentKind) -> Result<Option<StoredDocument>> {
        Ok(self
            .documents
            .iter()
            .rev()
            .find(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, doc)| doc.clone()))
    }

    fn get_document(&self, document_id: &str) -> Result<Value> {
        self.documents
            .iter()
            .find(|(_, doc)| doc.document_id == document_id)
            .map(|(_, doc)| doc.content.clone())
            .ok_or_else(|| ReconcileError::NotFound(document_id.to_string()))
    }

    fn save_document(&mut self, document_id: &str, json_content: &str) -> Result<()> {
        let content: Value = serde_json::from_str(json_content)?;
        match self
            .documents
            .iter_mut()
            .find(|(_, doc)| doc.document_id == document_id)
        {
            Some((_, doc)) => {
                doc.content = content;
                Ok(())
            }
            None => Err(ReconcileError::NotFound(document_id.to_string())),
        }
    }

    fn list_documents(&self, kind: DocumentKind) -> Result<Vec<StoredDocument>> {
        Ok(self
            .documents
            .iter()
            .filter(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}
