//! Cross-document reconciliation: reference indexing, the anomaly rules,
//! alert storage with corrective guides, and correction write-back.

pub mod alert;
pub mod correction;
pub mod detector;
pub mod guides;
pub mod index;

pub use alert::{
    risk_score, Alert, AlertKind, AlertSource, AlertStatus, AlertStore, AlertWithGuide,
    RiskLevel, RiskScore, Severity, ValidationReport,
};
pub use correction::{apply_correction, CorrectionOutcome};
pub use detector::{AnomalyDetector, DetectionContext};
pub use guides::{guide_for_kind, kind_for_title, resolve_guide, Guide};
pub use index::{ReferenceIndex, SourceDocRecord};

use crate::config::DetectionConfig;
use crate::entry::{extract_entries, extract_operations};
use crate::error::{ReconcileError, Result};
use crate::store::{DocumentKind, DocumentStore};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

/// Outcome of one detection pass.
#[derive(Debug, Serialize)]
pub struct PassReport {
    pub generated_at: String,
    pub gl_document_id: Option<String>,
    pub rl_document_id: Option<String>,
    pub document_count: usize,
    pub alert_ids: Vec<String>,
    pub risk: alert::RiskScore,
}

/// Drives one reconciliation pass: snapshot the latest GL, RL and source
/// documents from the store, index them, run the detector, and record the
/// alerts. Passes are idempotent given identical inputs; a fresh pass
/// supersedes the previous alerts of the same documents.
pub struct ReconciliationPass<'a> {
    config: &'a DetectionConfig,
}

impl<'a> ReconciliationPass<'a> {
    pub fn new(config: &'a DetectionConfig) -> Self {
        ReconciliationPass { config }
    }

    pub fn run<S: DocumentStore>(
        &self,
        store: &S,
        alerts: &mut AlertStore,
    ) -> Result<PassReport> {
        let gl = store.get_latest(DocumentKind::GrandLivre)?;
        let rl = store.get_latest(DocumentKind::Releve)?;

        let (gl_document_id, entries) = match &gl {
            Some(doc) => (
                Some(doc.document_id.clone()),
                Self::tolerate_shape(extract_entries(&doc.content), &doc.document_id)?,
            ),
            None => (None, Vec::new()),
        };
        let (rl_document_id, operations) = match &rl {
            Some(doc) => (
                Some(doc.document_id.clone()),
                Self::tolerate_shape(extract_operations(&doc.content), &doc.document_id)?,
            ),
            None => (None, Vec::new()),
        };

        let mut documents: Vec<SourceDocRecord> = Vec::new();
        for kind in [DocumentKind::Facture, DocumentKind::Cheque] {
            for stored in store.list_documents(kind)? {
                documents.push(SourceDocRecord::new(kind, stored));
            }
        }

        let document_count =
            documents.len() + gl.iter().count() + rl.iter().count();

        let index = ReferenceIndex::build(&entries, &operations, &documents);
        let ctx = DetectionContext {
            index: &index,
            entries: &entries,
            operations: &operations,
            documents: &documents,
            gl_document_id: gl_document_id.as_deref().unwrap_or(""),
            rl_document_id: rl_document_id.as_deref().unwrap_or(""),
        };

        let detected = AnomalyDetector::new(self.config).detect(&ctx);
        let risk = alert::risk_score(detected.iter(), document_count);

        let mut covered: Vec<&str> = documents.iter().map(|d| d.document_id.as_str()).collect();
        covered.extend(gl_document_id.as_deref());
        covered.extend(rl_document_id.as_deref());
        alerts.clear_documents(covered);

        let alert_ids = alerts.record_all(detected);

        info!(
            "reconciliation pass: {} entries, {} operations, {} documents, {} alerts (risk {})",
            entries.len(),
            operations.len(),
            documents.len(),
            alert_ids.len(),
            risk.score
        );

        Ok(PassReport {
            generated_at: Utc::now().to_rfc3339(),
            gl_document_id,
            rl_document_id,
            document_count,
            alert_ids,
            risk,
        })
    }

    /// Input-shape problems in one document silence that document without
    /// failing the pass; store errors stay fatal.
    fn tolerate_shape<T>(result: Result<Vec<T>>, document_id: &str) -> Result<Vec<T>> {
        match result {
            Ok(items) => Ok(items),
            Err(ReconcileError::InputShape(message)) => {
                warn!("skipping document {}: {}", document_id, message);
                Ok(Vec::new())
            }
            Err(other) => Err(other),
        }
    }
}

/// Convenience wrapper mirroring the shape of a one-shot host call.
pub fn run_pass<S: DocumentStore>(
    store: &S,
    config: &DetectionConfig,
    alerts: &mut AlertStore,
) -> Result<PassReport> {
    ReconciliationPass::new(config).run(store, alerts)
}
