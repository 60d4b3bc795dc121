//! # Ledger Reconciler
//!
//! A library for analyzing general-ledger documents extracted from accounting
//! paperwork and reconciling them against bank statements and source
//! documents (invoices, cheques).
//!
//! ## Core Concepts
//!
//! - **GL (Grand Livre)**: the full set of accounting entries, arriving as a
//!   heterogeneously shaped JSON document.
//! - **RL (Relevé)**: the bank statement, a list of dated operations.
//! - **Reference**: an invoice or cheque number correlating entries across
//!   GL, RL and source documents by substring match.
//! - **Snapshot**: the analytic characteristics of one ledger document
//!   (totals, per-type balances, movements, ratios, anomalies).
//! - **Alert**: one detected reconciliation anomaly, bound to the document
//!   that a correction would edit and to a corrective guide template.
//!
//! ## Example
//!
//! ```rust
//! use ledger_reconciler::LedgerProcessor;
//! use serde_json::json;
//!
//! let document = json!({
//!     "ecritures_comptables": [
//!         { "n° compte": "512100", "libellé": "Encaissement FAC001",
//!           "date": "03/01/2024", "débit": 1200.0, "crédit": 0 },
//!         { "n° compte": "411000", "libellé": "Facture FAC001 - InfoVista Ltd",
//!           "date": "03/01/2024", "débit": 0, "crédit": 1200.0 },
//!     ],
//! });
//!
//! let snapshot = LedgerProcessor::process(&document, "grand_livre.json");
//! assert_eq!(snapshot.entry_count, 2);
//! assert_eq!(snapshot.balance, 0.0);
//! ```

pub mod analytics;
pub mod classify;
pub mod config;
pub mod entry;
pub mod error;
pub mod indicators;
pub mod normalize;
pub mod recon;
pub mod store;

pub use analytics::{analyze, empty_snapshot, LedgerSnapshot, SnapshotSummary};
pub use classify::{classify_account, AccountType};
pub use config::DetectionConfig;
pub use entry::{extract_entries, extract_operations, BankOperation, Entry};
pub use error::{ReconcileError, Result};
pub use indicators::{compute_kpis, KpiSummary};
pub use recon::{
    apply_correction, run_pass, Alert, AlertKind, AlertSource, AlertStatus, AlertStore,
    ReconciliationPass, Severity,
};
pub use store::{DocumentKind, DocumentStore, MemoryStore, StoredDocument};

use log::info;
use serde_json::Value;
use std::collections::BTreeMap;

/// Façade over the analytics flow: raw document JSON in, characteristics
/// snapshot out. Shape problems never escape; they come back as the zero
/// snapshot carrying an `error` field.
pub struct LedgerProcessor;

impl LedgerProcessor {
    pub fn process(document: &Value, source_file: &str) -> LedgerSnapshot {
        match entry::extract_entries(document) {
            Ok(entries) => {
                let snapshot = analytics::analyze(&entries, source_file);
                info!(
                    "processed {}: {} entries analyzed",
                    source_file, snapshot.entry_count
                );
                snapshot
            }
            Err(error) => analytics::empty_snapshot(source_file, error.to_string()),
        }
    }

    pub fn process_json(raw: &str, source_file: &str) -> LedgerSnapshot {
        match serde_json::from_str::<Value>(raw) {
            Ok(document) => Self::process(&document, source_file),
            Err(error) => analytics::empty_snapshot(source_file, error.to_string()),
        }
    }

    /// Batch counterpart of [`LedgerProcessor::process`]; each document is
    /// independent and a failure in one never affects the others.
    pub fn process_many(
        documents: impl IntoIterator<Item = (String, Value)>,
    ) -> BTreeMap<String, LedgerSnapshot> {
        documents
            .into_iter()
            .map(|(source_file, document)| {
                let snapshot = Self::process(&document, &source_file);
                (source_file, snapshot)
            })
            .collect()
    }

    /// Dashboard indicators for a GL document, including the opening bank
    /// balance carried by the document header.
    pub fn kpis(document: &Value) -> KpiSummary {
        let entries = entry::extract_entries(document).unwrap_or_default();
        indicators::compute_kpis(&entries, opening_balance(document))
    }
}

/// The `solde_depart` figure of a GL header, zero when absent.
fn opening_balance(document: &Value) -> f64 {
    document
        .get("informations_generales")
        .and_then(|info| info.get("solde_depart"))
        .map(normalize::parse_amount)
        .unwrap_or(0.0)
}
