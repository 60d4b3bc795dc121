use crate::classify::{classify_account, AccountType};
use crate::config::DetectionConfig;
use crate::entry::{BankOperation, Entry};
use crate::normalize::extract_counterparty_name;
use crate::recon::alert::{Alert, AlertKind, AlertSource, Severity};
use crate::recon::index::{ReferenceIndex, SourceDocRecord};
use crate::store::{doc_field, DocumentKind};
use chrono::{Datelike, NaiveDate, Weekday};

/// Everything one detection pass reads: consistent snapshots of the GL, the
/// RL, the source documents, and the reference index built over them.
pub struct DetectionContext<'a> {
    pub index: &'a ReferenceIndex,
    pub entries: &'a [Entry],
    pub operations: &'a [BankOperation],
    pub documents: &'a [SourceDocRecord],
    pub gl_document_id: &'a str,
    pub rl_document_id: &'a str,
}

/// Applies the eight reconciliation rules over a detection context.
pub struct AnomalyDetector<'a> {
    config: &'a DetectionConfig,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a DetectionConfig) -> Self {
        AnomalyDetector { config }
    }

    /// Runs every rule and returns the alerts of this pass. Deterministic:
    /// identical inputs and configuration produce the identical alert set.
    pub fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        self.check_missing_numbers(ctx, &mut alerts);
        self.check_invoices(ctx, &mut alerts);
        self.check_cheques(ctx, &mut alerts);
        self.check_business_days(ctx, &mut alerts);
        alerts
    }

    fn check_invoices(&self, ctx: &DetectionContext<'_>, alerts: &mut Vec<Alert>) {
        for (reference, document) in &ctx.index.docs_by_ref {
            if document.kind != DocumentKind::Facture {
                continue;
            }

            let gl_entries = ctx.index.gl_entries(reference);
            if gl_entries.is_empty() {
                continue;
            }

            let origin: Vec<&Entry> = gl_entries
                .iter()
                .filter(|e| {
                    matches!(
                        classify_account(&e.account),
                        AccountType::Clients
                            | AccountType::Fournisseurs
                            | AccountType::Charges
                            | AccountType::Achats
                    )
                })
                .collect();
            let has_bank_entry = gl_entries
                .iter()
                .any(|e| classify_account(&e.account) == AccountType::Banque);

            if !origin.is_empty() && !has_bank_entry && self.config.alert_on_missing_transactions
            {
                let lead = origin[0];
                let amount = gl_amount(gl_entries);
                let mut alert = Alert::new(
                    AlertKind::FactureNonRapprochee,
                    self.severity_for(amount),
                    reference.clone(),
                    ctx.gl_document_id,
                    AlertSource::Gl,
                    format!(
                        "Facture {} enregistrée au compte {} sans écriture bancaire",
                        reference, lead.account
                    ),
                );
                alert.montant_gl = Some(amount);
                alert.date = lead.date;
                alert.nom_client = Some(extract_counterparty_name(&lead.label));
                alert.type_facture = Some(invoice_side(&lead.account).to_string());
                alerts.push(alert);
            }

            let rl_operations = ctx.index.rl_operations(reference);
            if !rl_operations.is_empty() {
                let amount_gl = gl_amount(gl_entries);
                let amount_rl = rl_amount(rl_operations);
                let delta = (amount_gl - amount_rl).abs();

                if delta > self.config.amount_tolerance(amount_gl, amount_rl) {
                    let mut alert = Alert::new(
                        AlertKind::EcartMontant,
                        self.severity_for(delta),
                        reference.clone(),
                        ctx.gl_document_id,
                        AlertSource::Gl,
                        format!(
                            "Écart de {:.2}€ entre le grand livre ({:.2}€) et le relevé ({:.2}€) pour {}",
                            delta, amount_gl, amount_rl, reference
                        ),
                    );
                    alert.montant_gl = Some(amount_gl);
                    alert.montant_releve = Some(amount_rl);
                    alert.delta = Some(delta);
                    alert.date = rl_operations[0].date;
                    alerts.push(alert);
                }
            }
        }
    }

    fn check_cheques(&self, ctx: &DetectionContext<'_>, alerts: &mut Vec<Alert>) {
        for (reference, document) in &ctx.index.docs_by_ref {
            if document.kind != DocumentKind::Cheque {
                continue;
            }

            let gl_entries = ctx.index.gl_entries(reference);
            let rl_operations = ctx.index.rl_operations(reference);

            let emission: Vec<&Entry> = gl_entries
                .iter()
                .filter(|e| classify_account(&e.account) != AccountType::Banque)
                .collect();
            let has_bank_entry = gl_entries.len() > emission.len();

            let emitter = doc_field(&document.content, "Emetteur")
                .and_then(|v| v.as_str())
                .unwrap_or("Inconnu")
                .to_string();
            let cheque_amount = doc_field(&document.content, "Montant du Chèque")
                .map(crate::normalize::parse_amount)
                .unwrap_or(0.0);

            if !rl_operations.is_empty() && gl_entries.is_empty() {
                if self.config.alert_on_missing_transactions {
                    let amount = rl_amount(rl_operations);
                    let mut alert = Alert::new(
                        AlertKind::ChequeNonComptabilise,
                        self.severity_for(amount),
                        reference.clone(),
                        ctx.gl_document_id,
                        AlertSource::Gl,
                        format!(
                            "Chèque N°{} présent sur le relevé mais absent du grand livre",
                            reference
                        ),
                    );
                    alert.montant = Some(amount);
                    alert.montant_releve = Some(amount);
                    alert.date = rl_operations[0].date;
                    alert.nom_client = Some(emitter.clone());
                    alerts.push(alert);
                }
            } else if !rl_operations.is_empty() && emission.is_empty() {
                if self.config.alert_on_missing_transactions {
                    let amount = rl_amount(rl_operations);
                    let mut alert = Alert::new(
                        AlertKind::ChequeEncaisseNonEmis,
                        self.severity_for(amount),
                        reference.clone(),
                        ctx.gl_document_id,
                        AlertSource::Gl,
                        format!(
                            "Chèque N°{} encaissé sans écriture d'émission au grand livre",
                            reference
                        ),
                    );
                    alert.montant = Some(amount);
                    alert.montant_releve = Some(amount);
                    alert.date = rl_operations[0].date;
                    alert.nom_client = Some(emitter.clone());
                    alerts.push(alert);
                }
            } else if rl_operations.is_empty() && !emission.is_empty() && !has_bank_entry {
                let amount = if cheque_amount != 0.0 {
                    cheque_amount
                } else {
                    gl_amount(gl_entries)
                };
                let mut alert = Alert::new(
                    AlertKind::ChequeEmisNonEncaisse,
                    self.severity_for(amount),
                    reference.clone(),
                    ctx.gl_document_id,
                    AlertSource::Gl,
                    format!(
                        "Chèque N°{} émis au grand livre mais jamais encaissé",
                        reference
                    ),
                );
                alert.montant = Some(amount);
                alert.montant_gl = Some(gl_amount(gl_entries));
                alert.date = emission[0].date;
                alert.nom_client = Some(emitter.clone());
                alerts.push(alert);
            }

            if !gl_entries.is_empty() && !rl_operations.is_empty() {
                let amount_gl = gl_amount(gl_entries);
                let amount_rl = rl_amount(rl_operations);
                let delta = (amount_gl - amount_rl).abs();

                if delta > self.config.amount_tolerance(amount_gl, amount_rl) {
                    let mut alert = Alert::new(
                        AlertKind::ChequeIncoherent,
                        self.severity_for(delta),
                        reference.clone(),
                        ctx.gl_document_id,
                        AlertSource::Gl,
                        format!(
                            "Chèque N°{}: {:.2}€ au grand livre contre {:.2}€ sur le relevé",
                            reference, amount_gl, amount_rl
                        ),
                    );
                    alert.montant_gl = Some(amount_gl);
                    alert.montant_releve = Some(amount_rl);
                    alert.delta = Some(delta);
                    alert.nom_client = Some(emitter);
                    alerts.push(alert);
                }
            }
        }
    }

    fn check_missing_numbers(&self, ctx: &DetectionContext<'_>, alerts: &mut Vec<Alert>) {
        for document in ctx.documents {
            if document.reference.is_some() {
                continue;
            }

            let missing_key = match document.kind {
                DocumentKind::Cheque => "Numéro de Chèque",
                _ => "Numéro Facture",
            };
            alerts.push(Alert::new(
                AlertKind::NumeroManquant,
                Severity::Medium,
                "",
                document.document_id.clone(),
                AlertSource::Document,
                format!("Champ {} absent du document {}", missing_key, document.document_id),
            ));
        }
    }

    fn check_business_days(&self, ctx: &DetectionContext<'_>, alerts: &mut Vec<Alert>) {
        for entry in ctx.entries {
            let Some(date) = entry.date else { continue };
            if self.is_non_business_day(date) {
                let mut alert = Alert::new(
                    AlertKind::JourNonOuvrable,
                    Severity::Medium,
                    entry.label.clone(),
                    ctx.gl_document_id,
                    AlertSource::Gl,
                    format!(
                        "Écriture du {} (compte {}) passée un jour non ouvrable",
                        date, entry.account
                    ),
                );
                alert.date = Some(date);
                alert.montant = Some(entry.net);
                alerts.push(alert);
            }
        }

        for operation in ctx.operations {
            let Some(date) = operation.date else { continue };
            if self.is_non_business_day(date) {
                let mut alert = Alert::new(
                    AlertKind::JourNonOuvrable,
                    Severity::Medium,
                    operation.nature.clone(),
                    ctx.rl_document_id,
                    AlertSource::Rl,
                    format!("Opération bancaire du {} passée un jour non ouvrable", date),
                );
                alert.date = Some(date);
                alert.montant = Some(operation.montant);
                alert.operation_type = Some(operation.operation_type.clone());
                alerts.push(alert);
            }
        }
    }

    fn is_non_business_day(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.config.is_holiday(date)
    }

    fn severity_for(&self, amount: f64) -> Severity {
        let magnitude = amount.abs();
        if magnitude >= self.config.critical_amount_threshold {
            Severity::Critical
        } else if magnitude >= self.config.high_amount_threshold {
            Severity::High
        } else if magnitude >= self.config.medium_amount_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Amount the GL carries for a reference: the bank-side movement when one
/// exists, the largest movement otherwise.
fn gl_amount(entries: &[Entry]) -> f64 {
    let bank_max = entries
        .iter()
        .filter(|e| classify_account(&e.account) == AccountType::Banque)
        .map(|e| e.net.abs())
        .fold(0.0, f64::max);
    if bank_max > 0.0 {
        bank_max
    } else {
        entries.iter().map(|e| e.net.abs()).fold(0.0, f64::max)
    }
}

fn rl_amount(operations: &[BankOperation]) -> f64 {
    operations
        .iter()
        .map(|op| op.montant.abs())
        .fold(0.0, f64::max)
}

fn invoice_side(account: &str) -> &'static str {
    match classify_account(account) {
        AccountType::Clients => "client",
        AccountType::Fournisseurs => "fournisseur",
        _ => "autre",
    }
}
