use crate::recon::guides::{resolve_guide, Guide};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed taxonomy of reconciliation anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "FACTURE_NON_RAPPROCHEE_GL")]
    FactureNonRapprochee,
    #[serde(rename = "CHEQUE_NON_COMPTABILISE_GL")]
    ChequeNonComptabilise,
    #[serde(rename = "CHEQUE_EMIS_NON_ENCAISSE_GL")]
    ChequeEmisNonEncaisse,
    #[serde(rename = "CHEQUE_ENCAISSE_NON_EMIS_GL")]
    ChequeEncaisseNonEmis,
    #[serde(rename = "CHEQUE_INCOHERENT_GL")]
    ChequeIncoherent,
    #[serde(rename = "ECART_MONTANT")]
    EcartMontant,
    #[serde(rename = "NUMERO_MANQUANT")]
    NumeroManquant,
    #[serde(rename = "JOUR_NON_OUVRABLE")]
    JourNonOuvrable,
}

impl AlertKind {
    pub fn code(&self) -> &'static str {
        match self {
            AlertKind::FactureNonRapprochee => "FACTURE_NON_RAPPROCHEE_GL",
            AlertKind::ChequeNonComptabilise => "CHEQUE_NON_COMPTABILISE_GL",
            AlertKind::ChequeEmisNonEncaisse => "CHEQUE_EMIS_NON_ENCAISSE_GL",
            AlertKind::ChequeEncaisseNonEmis => "CHEQUE_ENCAISSE_NON_EMIS_GL",
            AlertKind::ChequeIncoherent => "CHEQUE_INCOHERENT_GL",
            AlertKind::EcartMontant => "ECART_MONTANT",
            AlertKind::NumeroManquant => "NUMERO_MANQUANT",
            AlertKind::JourNonOuvrable => "JOUR_NON_OUVRABLE",
        }
    }

    /// Relative weight of the kind in the pass risk score.
    fn risk_weight(&self) -> u32 {
        match self {
            AlertKind::EcartMontant | AlertKind::ChequeIncoherent => 6,
            AlertKind::FactureNonRapprochee => 5,
            AlertKind::ChequeNonComptabilise
            | AlertKind::ChequeEmisNonEncaisse
            | AlertKind::ChequeEncaisseNonEmis => 4,
            AlertKind::NumeroManquant => 3,
            AlertKind::JourNonOuvrable => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    fn risk_weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 8,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }
}

/// Which document family the alert's descriptive fields were read from, and
/// therefore which side a correction would edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSource {
    #[serde(rename = "GL")]
    Gl,
    #[serde(rename = "RL")]
    Rl,
    #[serde(rename = "DOCUMENT")]
    Document,
}

/// Review state of an alert in the validation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Validated,
    Corrected,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    #[serde(rename = "ref")]
    pub reference: String,
    pub document_id: String,
    pub source: AlertSource,
    pub description: String,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant_gl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant_releve: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom_client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_facture: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentaire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modification: Option<String>,
}

impl Alert {
    /// A new active alert with the mandatory fields; descriptive fields are
    /// filled by the detector. The id is assigned by the store.
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        reference: impl Into<String>,
        document_id: impl Into<String>,
        source: AlertSource,
        description: impl Into<String>,
    ) -> Alert {
        Alert {
            id: String::new(),
            kind,
            severity,
            reference: reference.into(),
            document_id: document_id.into(),
            source,
            description: description.into(),
            status: AlertStatus::Active,
            title: None,
            date: None,
            montant: None,
            montant_gl: None,
            montant_releve: None,
            delta: None,
            nom_client: None,
            type_facture: None,
            operation_type: None,
            commentaire: None,
            date_modification: None,
        }
    }
}

/// A stored alert together with its resolved corrective guide, if any.
#[derive(Debug)]
pub struct AlertWithGuide<'a> {
    pub alert: &'a Alert,
    pub guide: Option<&'static Guide>,
}

/// Keeps alerts addressed by opaque id. A fresh detection pass supersedes
/// any previous alert sharing the same `(document_id, kind, ref)` tuple.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: BTreeMap<String, Alert>,
    next_id: u64,
}

impl AlertStore {
    pub fn new() -> Self {
        AlertStore::default()
    }

    /// Records one alert, superseding earlier alerts for the same tuple.
    /// Returns the assigned id.
    pub fn record(&mut self, mut alert: Alert) -> String {
        self.alerts.retain(|_, existing| {
            !(existing.document_id == alert.document_id
                && existing.kind == alert.kind
                && existing.reference == alert.reference)
        });

        self.next_id += 1;
        let id = format!("ALT-{:06}", self.next_id);
        alert.id = id.clone();
        self.alerts.insert(id.clone(), alert);
        id
    }

    pub fn record_all(&mut self, alerts: impl IntoIterator<Item = Alert>) -> Vec<String> {
        alerts.into_iter().map(|a| self.record(a)).collect()
    }

    /// Drops every alert bound to one of the given documents. A detection
    /// pass calls this first so that alerts no longer detected disappear
    /// instead of lingering as stale state.
    pub fn clear_documents<'a>(&mut self, document_ids: impl IntoIterator<Item = &'a str>) {
        let ids: Vec<&str> = document_ids.into_iter().collect();
        self.alerts
            .retain(|_, alert| !ids.contains(&alert.document_id.as_str()));
    }

    /// Full record plus resolved guide; guide resolution falls back from the
    /// alert kind to its localized title.
    pub fn get(&self, alert_id: &str) -> Option<AlertWithGuide<'_>> {
        self.alerts.get(alert_id).map(|alert| AlertWithGuide {
            guide: resolve_guide(Some(alert.kind), alert.title.as_deref()),
            alert,
        })
    }

    pub fn all(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Moves an alert through the validation workflow. Returns false when
    /// the id is unknown.
    pub fn update_status(
        &mut self,
        alert_id: &str,
        status: AlertStatus,
        commentaire: Option<&str>,
    ) -> bool {
        match self.alerts.get_mut(alert_id) {
            Some(alert) => {
                alert.status = status;
                alert.commentaire = commentaire.map(str::to_string);
                alert.date_modification = Some(Utc::now().to_rfc3339());
                true
            }
            None => false,
        }
    }

    pub fn validation_report(&self) -> ValidationReport {
        let mut by_status: BTreeMap<AlertStatus, usize> = BTreeMap::new();
        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();

        for alert in self.alerts.values() {
            *by_status.entry(alert.status).or_default() += 1;
            *by_severity.entry(alert.severity).or_default() += 1;
        }

        ValidationReport {
            generated_at: Utc::now().to_rfc3339(),
            total_alerts: self.alerts.len(),
            by_status,
            by_severity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub generated_at: String,
    pub total_alerts: usize,
    pub by_status: BTreeMap<AlertStatus, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskScore {
    pub score: u32,
    pub level: RiskLevel,
    pub total_alerts: usize,
    pub total_documents: usize,
}

/// Aggregates a pass's alerts into a 0-100 risk score. Per-alert weights
/// combine severity and kind; the sum is normalized by document count and
/// compressed logarithmically so large batches do not saturate the scale.
pub fn risk_score<'a>(
    alerts: impl IntoIterator<Item = &'a Alert>,
    total_documents: usize,
) -> RiskScore {
    let mut weighted = 0u32;
    let mut total_alerts = 0usize;
    for alert in alerts {
        weighted += alert.severity.risk_weight() * alert.kind.risk_weight();
        total_alerts += 1;
    }

    if total_alerts == 0 || total_documents == 0 {
        return RiskScore {
            score: 0,
            level: RiskLevel::Low,
            total_alerts,
            total_documents,
        };
    }

    let normalized = weighted as f64 / total_documents.max(1) as f64;
    let score = (30.0 * (normalized + 1.0).ln()).min(100.0) as u32;

    let level = if score >= 70 {
        RiskLevel::Critical
    } else if score >= 40 {
        RiskLevel::High
    } else if score >= 20 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskScore {
        score,
        level,
        total_alerts,
        total_documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert(document_id: &str, reference: &str) -> Alert {
        Alert::new(
            AlertKind::EcartMontant,
            Severity::High,
            reference,
            document_id,
            AlertSource::Gl,
            "Écart de montant",
        )
    }

    #[test]
    fn test_record_assigns_ids() {
        let mut store = AlertStore::new();
        let id_a = store.record(sample_alert("gl-1", "FAC001"));
        let id_b = store.record(sample_alert("gl-1", "FAC002"));
        assert_ne!(id_a, id_b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&id_a).unwrap().alert.reference, "FAC001");
    }

    #[test]
    fn test_fresh_pass_supersedes() {
        let mut store = AlertStore::new();
        let old_id = store.record(sample_alert("gl-1", "FAC001"));
        let new_id = store.record(sample_alert("gl-1", "FAC001"));

        assert_eq!(store.len(), 1);
        assert!(store.get(&old_id).is_none());
        assert!(store.get(&new_id).is_some());
    }

    #[test]
    fn test_distinct_tuples_coexist() {
        let mut store = AlertStore::new();
        store.record(sample_alert("gl-1", "FAC001"));
        store.record(sample_alert("gl-2", "FAC001"));
        let mut other_kind = sample_alert("gl-1", "FAC001");
        other_kind.kind = AlertKind::JourNonOuvrable;
        store.record(other_kind);

        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_clear_documents() {
        let mut store = AlertStore::new();
        store.record(sample_alert("gl-1", "FAC001"));
        store.record(sample_alert("gl-2", "FAC002"));

        store.clear_documents(["gl-1"]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all().next().unwrap().document_id, "gl-2");
    }

    #[test]
    fn test_guide_is_resolved_on_fetch() {
        let mut store = AlertStore::new();
        let id = store.record(sample_alert("gl-1", "FAC001"));
        let fetched = store.get(&id).unwrap();
        assert!(fetched.guide.is_some());
    }

    #[test]
    fn test_status_workflow() {
        let mut store = AlertStore::new();
        let id = store.record(sample_alert("gl-1", "FAC001"));

        assert!(store.update_status(&id, AlertStatus::Validated, Some("confirmé")));
        let alert = store.get(&id).unwrap().alert;
        assert_eq!(alert.status, AlertStatus::Validated);
        assert_eq!(alert.commentaire.as_deref(), Some("confirmé"));
        assert!(alert.date_modification.is_some());

        assert!(!store.update_status("ALT-999999", AlertStatus::Rejected, None));
    }

    #[test]
    fn test_validation_report() {
        let mut store = AlertStore::new();
        let id = store.record(sample_alert("gl-1", "FAC001"));
        store.record(sample_alert("gl-1", "FAC002"));
        store.update_status(&id, AlertStatus::Corrected, None);

        let report = store.validation_report();
        assert_eq!(report.total_alerts, 2);
        assert_eq!(report.by_status[&AlertStatus::Active], 1);
        assert_eq!(report.by_status[&AlertStatus::Corrected], 1);
        assert_eq!(report.by_severity[&Severity::High], 2);
    }

    #[test]
    fn test_risk_score_empty() {
        let no_alerts: Vec<Alert> = Vec::new();
        let score = risk_score(no_alerts.iter(), 10);
        assert_eq!(score.score, 0);
        assert_eq!(score.level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_score_scales_with_alerts() {
        let few = vec![sample_alert("gl-1", "A")];
        let many: Vec<Alert> = (0..40)
            .map(|i| sample_alert("gl-1", &format!("R{i}")))
            .collect();

        let low = risk_score(few.iter(), 4);
        let high = risk_score(many.iter(), 4);
        assert!(high.score > low.score);
        assert!(high.score <= 100);
    }

    #[test]
    fn test_kind_wire_codes() {
        assert_eq!(
            serde_json::to_string(&AlertKind::FactureNonRapprochee).unwrap(),
            "\"FACTURE_NON_RAPPROCHEE_GL\""
        );
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(serde_json::to_string(&AlertSource::Gl).unwrap(), "\"GL\"");
    }
}
