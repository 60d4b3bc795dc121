use crate::entry::Entry;
use crate::normalize::extract_counterparty_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headline accounting indicators derived from the ledger, plus the
/// per-category account breakdown the treasury/clients/suppliers/VAT views
/// are built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KpiSummary {
    pub solde_banque: f64,
    pub encaissements: f64,
    pub creances_clients: f64,
    pub dettes_fournisseurs: f64,
    pub tva_deductible: f64,
    pub tva_collectee: f64,
    pub chiffre_affaires: f64,
    pub charges: f64,
    pub resultat_brut: f64,
    pub tva_a_declarer: f64,
    pub liquidite_disponible: f64,
    pub comptes_details: AccountBreakdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountBreakdown {
    pub banque: Vec<AccountSummary>,
    pub clients: Vec<AccountSummary>,
    pub fournisseurs: Vec<AccountSummary>,
    pub tva: Vec<AccountSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub numero: String,
    pub libelle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    pub debit: f64,
    pub credit: f64,
    pub solde: f64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tva_type: Option<String>,
}

/// Computes the dashboard indicators. `solde_depart` is the opening bank
/// balance carried by the GL header, zero when absent.
pub fn compute_kpis(entries: &[Entry], solde_depart: f64) -> KpiSummary {
    let mut summary = KpiSummary::default();

    let debit_512 = sum_debits(entries, "512");
    let credit_512 = sum_credits(entries, "512");
    summary.solde_banque = solde_depart + debit_512 - credit_512;
    summary.encaissements = credit_512;

    summary.creances_clients =
        (sum_debits(entries, "411") - sum_credits(entries, "411")).max(0.0);
    summary.dettes_fournisseurs =
        (sum_credits(entries, "401") - sum_debits(entries, "401")).max(0.0);

    summary.tva_deductible = sum_debits(entries, "44566");
    summary.tva_collectee = sum_credits(entries, "44571");
    summary.chiffre_affaires = sum_credits(entries, "706");
    summary.charges = sum_debits(entries, "6");

    summary.resultat_brut = summary.chiffre_affaires - summary.charges;
    summary.tva_a_declarer = summary.tva_collectee - summary.tva_deductible;
    summary.liquidite_disponible = summary.solde_banque;

    summary.comptes_details = account_breakdown(entries);
    summary
}

fn sum_debits(entries: &[Entry], prefix: &str) -> f64 {
    entries
        .iter()
        .filter(|e| e.account.starts_with(prefix))
        .map(|e| e.debit)
        .sum()
}

fn sum_credits(entries: &[Entry], prefix: &str) -> f64 {
    entries
        .iter()
        .filter(|e| e.account.starts_with(prefix))
        .map(|e| e.credit)
        .sum()
}

fn account_breakdown(entries: &[Entry]) -> AccountBreakdown {
    struct Grouped {
        label: String,
        debit: f64,
        credit: f64,
    }

    let mut groups: BTreeMap<String, Grouped> = BTreeMap::new();
    for entry in entries {
        let group = groups.entry(entry.account.clone()).or_insert_with(|| Grouped {
            label: entry.label.clone(),
            debit: 0.0,
            credit: 0.0,
        });
        group.debit += entry.debit;
        group.credit += entry.credit;
    }

    let mut breakdown = AccountBreakdown::default();
    for (numero, group) in groups {
        if numero.starts_with("512") {
            breakdown.banque.push(AccountSummary {
                numero,
                libelle: group.label,
                nom: None,
                debit: group.debit,
                credit: group.credit,
                solde: group.credit - group.debit,
                tva_type: None,
            });
        } else if numero.starts_with("411") {
            // Debtor balance: a positive solde is an outstanding receivable.
            let nom = extract_counterparty_name(&group.label);
            breakdown.clients.push(AccountSummary {
                libelle: format!("{} ({})", nom, numero),
                numero,
                nom: Some(nom),
                debit: group.debit,
                credit: group.credit,
                solde: group.debit - group.credit,
                tva_type: None,
            });
        } else if numero.starts_with("401") {
            let nom = extract_counterparty_name(&group.label);
            breakdown.fournisseurs.push(AccountSummary {
                libelle: format!("{} ({})", nom, numero),
                numero,
                nom: Some(nom),
                debit: group.debit,
                credit: group.credit,
                solde: group.credit - group.debit,
                tva_type: None,
            });
        } else if numero.starts_with("445") {
            let lowered = group.label.to_lowercase();
            let tva_type = if numero.starts_with("44566") || lowered.contains("deductible") {
                "deductible"
            } else if numero.starts_with("44571") || lowered.contains("collecte") {
                "collectee"
            } else {
                "autre"
            };
            breakdown.tva.push(AccountSummary {
                numero,
                libelle: group.label,
                nom: None,
                debit: group.debit,
                credit: group.credit,
                solde: group.credit - group.debit,
                tva_type: Some(tva_type.to_string()),
            });
        }
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account: &str, label: &str, debit: f64, credit: f64) -> Entry {
        Entry {
            account: account.to_string(),
            label: label.to_string(),
            date: None,
            debit,
            credit,
            net: debit - credit,
        }
    }

    #[test]
    fn test_headline_indicators() {
        let entries = vec![
            entry("512100", "Encaissement FAC001 - InfoVista Ltd", 1200.0, 200.0),
            entry("411000", "Facture FAC001 - InfoVista Ltd", 1200.0, 1200.0),
            entry("401000", "Facture F-778 - Fournier SARL", 0.0, 600.0),
            entry("445660", "TVA déductible", 120.0, 0.0),
            entry("445710", "TVA collectée", 0.0, 200.0),
            entry("706000", "Prestations", 0.0, 1000.0),
            entry("611000", "Sous-traitance", 450.0, 0.0),
        ];

        let kpis = compute_kpis(&entries, 500.0);
        assert_eq!(kpis.solde_banque, 500.0 + 1200.0 - 200.0);
        assert_eq!(kpis.encaissements, 200.0);
        assert_eq!(kpis.creances_clients, 0.0);
        assert_eq!(kpis.dettes_fournisseurs, 600.0);
        assert_eq!(kpis.tva_deductible, 120.0);
        assert_eq!(kpis.tva_collectee, 200.0);
        assert_eq!(kpis.chiffre_affaires, 1000.0);
        assert_eq!(kpis.charges, 450.0);
        assert_eq!(kpis.resultat_brut, 550.0);
        assert_eq!(kpis.tva_a_declarer, 80.0);
        assert_eq!(kpis.liquidite_disponible, kpis.solde_banque);
    }

    #[test]
    fn test_receivables_never_negative() {
        let entries = vec![entry("411000", "Avoir client", 0.0, 300.0)];
        let kpis = compute_kpis(&entries, 0.0);
        assert_eq!(kpis.creances_clients, 0.0);
    }

    #[test]
    fn test_breakdown_names_and_signs() {
        let entries = vec![
            entry("512100", "Compte courant", 300.0, 1000.0),
            entry("411200", "Facture FAC010 - InfoVista Ltd", 900.0, 100.0),
            entry("401100", "Achat - Fournier SARL", 100.0, 700.0),
            entry("445660", "TVA déductible sur achats", 50.0, 20.0),
        ];

        let breakdown = account_breakdown(&entries);
        let bank = &breakdown.banque[0];
        assert_eq!(bank.solde, 700.0);

        let client = &breakdown.clients[0];
        assert_eq!(client.nom.as_deref(), Some("InfoVista Ltd"));
        assert_eq!(client.libelle, "InfoVista Ltd (411200)");
        assert_eq!(client.solde, 800.0);

        let supplier = &breakdown.fournisseurs[0];
        assert_eq!(supplier.solde, 600.0);

        let tva = &breakdown.tva[0];
        assert_eq!(tva.tva_type.as_deref(), Some("deductible"));
        assert_eq!(tva.solde, -30.0);
    }
}
