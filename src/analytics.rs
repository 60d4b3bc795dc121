use crate::classify::{classify_account, AccountType};
use crate::entry::Entry;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Net amounts above this threshold are reported as significant movements.
const SIGNIFICANT_AMOUNT: f64 = 10_000.0;
/// Significant-entry and active-account lists are capped at the top 10.
const TOP_MOVEMENTS: usize = 10;
/// Ledger anomalies are capped to keep downstream consumers bounded.
const MAX_ANOMALIES: usize = 20;
/// Labels inside the snapshot are truncated to this many characters.
const LABEL_TRUNCATION: usize = 50;

/// Full analytic characteristics of one ledger document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub entry_count: usize,
    pub total_debit: f64,
    pub total_credit: f64,
    pub balance: f64,
    pub accounts_by_type: BTreeMap<AccountType, Vec<Entry>>,
    pub balances_by_type: BTreeMap<AccountType, TypeBalance>,
    pub movements: Movements,
    pub ratios: Ratios,
    pub date_analysis: DateAnalysis,
    pub anomalies: Vec<LedgerAnomaly>,
    pub account_details: BTreeMap<String, AccountDetail>,
    pub source_file: String,
    pub processed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeBalance {
    pub total_debit: f64,
    pub total_credit: f64,
    pub balance: f64,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Movements {
    pub largest_debit: f64,
    pub largest_credit: f64,
    pub mean_debit: f64,
    pub mean_credit: f64,
    pub significant_entries: Vec<SignificantEntry>,
    pub most_active_accounts: Vec<AccountActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificantEntry {
    pub account: String,
    pub label: String,
    pub amount: f64,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account: String,
    pub entry_count: usize,
}

/// Financial ratios; a ratio is omitted when its denominator is zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ratios {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_rotation_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateAnalysis {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub duration_days: i64,
    pub monthly_distribution: BTreeMap<String, usize>,
    pub entries_without_date: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAnomalyKind {
    Duplicate,
    LargeAmount,
    UnusualAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAnomaly {
    pub kind: LedgerAnomalyKind,
    pub description: String,
    pub account: String,
    pub amount: f64,
    pub date: Option<NaiveDate>,
}

/// Condensed view of a snapshot for dashboard headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub entry_count: usize,
    pub balance: f64,
    pub account_count: usize,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub anomaly_count: usize,
    pub account_types: Vec<AccountType>,
}

impl LedgerSnapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            entry_count: self.entry_count,
            balance: self.balance,
            account_count: self.account_details.len(),
            period_start: self.date_analysis.period_start,
            period_end: self.date_analysis.period_end,
            anomaly_count: self.anomalies.len(),
            account_types: self.balances_by_type.keys().copied().collect(),
        }
    }
}

/// Computes the full characteristics snapshot over canonical entries.
pub fn analyze(entries: &[Entry], source_file: &str) -> LedgerSnapshot {
    let total_debit: f64 = entries.iter().map(|e| e.debit).sum();
    let total_credit: f64 = entries.iter().map(|e| e.credit).sum();

    let mut accounts_by_type: BTreeMap<AccountType, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        accounts_by_type
            .entry(classify_account(&entry.account))
            .or_default()
            .push(entry.clone());
    }

    let balances_by_type: BTreeMap<AccountType, TypeBalance> = accounts_by_type
        .iter()
        .map(|(account_type, type_entries)| {
            let debit: f64 = type_entries.iter().map(|e| e.debit).sum();
            let credit: f64 = type_entries.iter().map(|e| e.credit).sum();
            (
                *account_type,
                TypeBalance {
                    total_debit: debit,
                    total_credit: credit,
                    balance: debit - credit,
                    entry_count: type_entries.len(),
                },
            )
        })
        .collect();

    LedgerSnapshot {
        entry_count: entries.len(),
        total_debit,
        total_credit,
        balance: total_debit - total_credit,
        movements: analyze_movements(entries),
        ratios: compute_ratios(total_debit, total_credit, &balances_by_type),
        date_analysis: analyze_dates(entries),
        anomalies: detect_ledger_anomalies(entries),
        account_details: detailed_account_stats(entries),
        accounts_by_type,
        balances_by_type,
        source_file: source_file.to_string(),
        processed_at: Utc::now().to_rfc3339(),
        error: None,
    }
}

/// Zero snapshot used when a document cannot be analyzed at all.
pub fn empty_snapshot(source_file: &str, error: impl Into<String>) -> LedgerSnapshot {
    LedgerSnapshot {
        entry_count: 0,
        total_debit: 0.0,
        total_credit: 0.0,
        balance: 0.0,
        accounts_by_type: BTreeMap::new(),
        balances_by_type: BTreeMap::new(),
        movements: Movements::default(),
        ratios: Ratios::default(),
        date_analysis: DateAnalysis::default(),
        anomalies: Vec::new(),
        account_details: BTreeMap::new(),
        source_file: source_file.to_string(),
        processed_at: Utc::now().to_rfc3339(),
        error: Some(error.into()),
    }
}

fn analyze_movements(entries: &[Entry]) -> Movements {
    let debits: Vec<f64> = entries.iter().map(|e| e.debit).filter(|d| *d > 0.0).collect();
    let credits: Vec<f64> = entries.iter().map(|e| e.credit).filter(|c| *c > 0.0).collect();

    let mut movements = Movements::default();

    if !debits.is_empty() {
        movements.largest_debit = debits.iter().cloned().fold(0.0, f64::max);
        movements.mean_debit = debits.iter().sum::<f64>() / debits.len() as f64;
    }
    if !credits.is_empty() {
        movements.largest_credit = credits.iter().cloned().fold(0.0, f64::max);
        movements.mean_credit = credits.iter().sum::<f64>() / credits.len() as f64;
    }

    movements.significant_entries = entries
        .iter()
        .filter(|e| e.net.abs() > SIGNIFICANT_AMOUNT)
        .take(TOP_MOVEMENTS)
        .map(|e| SignificantEntry {
            account: e.account.clone(),
            label: truncate_label(&e.label),
            amount: e.net,
            date: e.date,
        })
        .collect();

    let mut activity: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        *activity.entry(entry.account.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<AccountActivity> = activity
        .into_iter()
        .map(|(account, entry_count)| AccountActivity {
            account: account.to_string(),
            entry_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.entry_count
            .cmp(&a.entry_count)
            .then_with(|| a.account.cmp(&b.account))
    });
    ranked.truncate(TOP_MOVEMENTS);
    movements.most_active_accounts = ranked;

    movements
}

fn compute_ratios(
    total_debit: f64,
    total_credit: f64,
    balances: &BTreeMap<AccountType, TypeBalance>,
) -> Ratios {
    let balance_of = |account_type: AccountType| {
        balances
            .get(&account_type)
            .map(|b| b.balance)
            .unwrap_or(0.0)
    };

    let bank = balance_of(AccountType::Banque);
    let suppliers = balance_of(AccountType::Fournisseurs).abs();
    let equity = balance_of(AccountType::Capitaux);
    let purchases = balance_of(AccountType::Achats);
    let stocks = balance_of(AccountType::Stocks);

    Ratios {
        balance_ratio: (total_debit != 0.0).then(|| total_credit / total_debit),
        liquidity_ratio: (suppliers != 0.0).then(|| bank / suppliers),
        debt_ratio: (equity != 0.0).then(|| bank / equity),
        stock_rotation_ratio: (stocks != 0.0).then(|| purchases / stocks),
    }
}

fn analyze_dates(entries: &[Entry]) -> DateAnalysis {
    let mut analysis = DateAnalysis::default();

    let mut dates: Vec<NaiveDate> = Vec::new();
    for entry in entries {
        match entry.date {
            Some(date) => dates.push(date),
            None => analysis.entries_without_date += 1,
        }
    }

    if let (Some(start), Some(end)) = (dates.iter().min(), dates.iter().max()) {
        analysis.period_start = Some(*start);
        analysis.period_end = Some(*end);
        analysis.duration_days = (*end - *start).num_days();
    }

    for date in dates {
        let month_key = format!("{:04}-{:02}", date.year(), date.month());
        *analysis.monthly_distribution.entry(month_key).or_default() += 1;
    }

    analysis
}

fn detect_ledger_anomalies(entries: &[Entry]) -> Vec<LedgerAnomaly> {
    let mut anomalies = Vec::new();

    // Duplicates: identical (account, date, net) seen more than once.
    let mut seen: HashSet<(String, Option<NaiveDate>, u64)> = HashSet::new();
    for entry in entries {
        let signature = (entry.account.clone(), entry.date, entry.net.to_bits());
        if !seen.insert(signature) {
            anomalies.push(LedgerAnomaly {
                kind: LedgerAnomalyKind::Duplicate,
                description: format!(
                    "Écriture dupliquée détectée pour le compte {}",
                    entry.account
                ),
                account: entry.account.clone(),
                amount: entry.net,
                date: entry.date,
            });
        }
    }

    // Outliers: |net| beyond the 95th percentile of nonzero amounts.
    let mut magnitudes: Vec<f64> = entries
        .iter()
        .map(|e| e.net.abs())
        .filter(|m| *m != 0.0)
        .collect();
    if !magnitudes.is_empty() {
        magnitudes.sort_by(|a, b| a.total_cmp(b));
        let threshold = percentile(&magnitudes, 95.0);
        for entry in entries {
            if entry.net.abs() > threshold {
                anomalies.push(LedgerAnomaly {
                    kind: LedgerAnomalyKind::LargeAmount,
                    description: format!("Montant anormalement élevé: {:.2}€", entry.net),
                    account: entry.account.clone(),
                    amount: entry.net,
                    date: entry.date,
                });
            }
        }
    }

    // Accounts outside the classification table.
    for entry in entries {
        if classify_account(&entry.account) == AccountType::Autres {
            anomalies.push(LedgerAnomaly {
                kind: LedgerAnomalyKind::UnusualAccount,
                description: format!("Compte inhabituel détecté: {}", entry.account),
                account: entry.account.clone(),
                amount: entry.net,
                date: entry.date,
            });
        }
    }

    anomalies.truncate(MAX_ANOMALIES);
    anomalies
}

fn detailed_account_stats(entries: &[Entry]) -> BTreeMap<String, AccountDetail> {
    let mut details: BTreeMap<String, AccountDetail> = BTreeMap::new();
    let mut label_counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for entry in entries {
        let detail = details.entry(entry.account.clone()).or_default();
        detail.entry_count += 1;
        detail.total_debit += entry.debit;
        detail.total_credit += entry.credit;
        detail.balance = detail.total_debit - detail.total_credit;

        if let Some(date) = entry.date {
            detail.earliest_date = Some(match detail.earliest_date {
                Some(current) => current.min(date),
                None => date,
            });
            detail.latest_date = Some(match detail.latest_date {
                Some(current) => current.max(date),
                None => date,
            });
        }

        if !entry.label.is_empty() {
            *label_counts
                .entry(entry.account.clone())
                .or_default()
                .entry(entry.label.clone())
                .or_default() += 1;
        }
    }

    for (account, labels) in label_counts {
        if let Some(detail) = details.get_mut(&account) {
            if let Some((label, _)) = labels.into_iter().max_by_key(|(_, count)| *count) {
                detail.principal_label = label;
            }
        }
    }

    details
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDetail {
    pub entry_count: usize,
    pub total_debit: f64,
    pub total_credit: f64,
    pub balance: f64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub principal_label: String,
}

fn truncate_label(label: &str) -> String {
    label.chars().take(LABEL_TRUNCATION).collect()
}

/// Linear-interpolation percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [single] => *single,
        _ => {
            let rank = p / 100.0 * (sorted.len() - 1) as f64;
            let low = rank.floor() as usize;
            let high = rank.ceil() as usize;
            let fraction = rank - low as f64;
            sorted[low] + (sorted[high] - sorted[low]) * fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account: &str, label: &str, date: Option<&str>, debit: f64, credit: f64) -> Entry {
        Entry {
            account: account.to_string(),
            label: label.to_string(),
            date: date.and_then(crate::normalize::parse_date),
            debit,
            credit,
            net: debit - credit,
        }
    }

    #[test]
    fn test_two_entry_ledger() {
        let entries = vec![
            entry("512100", "Encaissement", Some("03/01/2024"), 100.0, 0.0),
            entry("411000", "Facture client", Some("03/01/2024"), 0.0, 100.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(snapshot.entry_count, 2);
        assert_eq!(snapshot.balance, 0.0);
        assert_eq!(
            snapshot.balances_by_type[&AccountType::Banque].balance,
            100.0
        );
        assert_eq!(
            snapshot.balances_by_type[&AccountType::Clients].balance,
            -100.0
        );
    }

    #[test]
    fn test_balance_identity_and_partition() {
        let entries = vec![
            entry("512100", "a", None, 10.0, 0.0),
            entry("401000", "b", None, 0.0, 4.0),
            entry("999", "c", None, 2.5, 1.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(
            snapshot.balance,
            snapshot.total_debit - snapshot.total_credit
        );

        let partitioned: usize = snapshot
            .balances_by_type
            .values()
            .map(|b| b.entry_count)
            .sum();
        assert_eq!(partitioned, snapshot.entry_count);
    }

    #[test]
    fn test_duplicate_anomalies() {
        let entries = vec![
            entry("401000", "x", Some("03/01/2024"), 500.0, 0.0),
            entry("401000", "x", Some("03/01/2024"), 500.0, 0.0),
            entry("401000", "x", Some("03/01/2024"), 500.0, 0.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        let duplicates: Vec<_> = snapshot
            .anomalies
            .iter()
            .filter(|a| a.kind == LedgerAnomalyKind::Duplicate)
            .collect();
        assert_eq!(duplicates.len(), 2);
    }

    #[test]
    fn test_large_amount_anomaly() {
        let mut entries: Vec<Entry> = (0..20)
            .map(|i| entry("601000", "achat", None, 100.0 + i as f64, 0.0))
            .collect();
        entries.push(entry("601000", "énorme", None, 50_000.0, 0.0));

        let snapshot = analyze(&entries, "gl.json");
        assert!(snapshot
            .anomalies
            .iter()
            .any(|a| a.kind == LedgerAnomalyKind::LargeAmount && a.amount == 50_000.0));
    }

    #[test]
    fn test_unusual_account_anomaly() {
        let entries = vec![entry("999", "mystère", None, 10.0, 0.0)];
        let snapshot = analyze(&entries, "gl.json");
        assert!(snapshot
            .anomalies
            .iter()
            .any(|a| a.kind == LedgerAnomalyKind::UnusualAccount));
    }

    #[test]
    fn test_anomaly_ceiling() {
        let entries: Vec<Entry> = (0..30)
            .map(|_| entry("401000", "x", Some("03/01/2024"), 500.0, 0.0))
            .collect();

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(snapshot.anomalies.len(), 20);
    }

    #[test]
    fn test_significant_entries() {
        let entries = vec![
            entry("512100", &"très long libellé ".repeat(10), None, 15_000.0, 0.0),
            entry("512100", "petit", None, 50.0, 0.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(snapshot.movements.significant_entries.len(), 1);
        assert!(snapshot.movements.significant_entries[0].label.chars().count() <= 50);
    }

    #[test]
    fn test_movement_means() {
        let entries = vec![
            entry("512100", "", None, 100.0, 0.0),
            entry("512100", "", None, 300.0, 0.0),
            entry("411000", "", None, 0.0, 60.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(snapshot.movements.largest_debit, 300.0);
        assert_eq!(snapshot.movements.mean_debit, 200.0);
        assert_eq!(snapshot.movements.largest_credit, 60.0);
        assert_eq!(snapshot.movements.mean_credit, 60.0);
    }

    #[test]
    fn test_most_active_accounts() {
        let entries = vec![
            entry("512100", "", None, 1.0, 0.0),
            entry("512100", "", None, 1.0, 0.0),
            entry("411000", "", None, 1.0, 0.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        assert_eq!(
            snapshot.movements.most_active_accounts[0],
            AccountActivity {
                account: "512100".to_string(),
                entry_count: 2
            }
        );
    }

    #[test]
    fn test_ratios_omitted_on_zero_denominator() {
        let entries = vec![entry("512100", "", None, 100.0, 0.0)];
        let snapshot = analyze(&entries, "gl.json");
        assert!(snapshot.ratios.balance_ratio.is_some());
        assert!(snapshot.ratios.liquidity_ratio.is_none());
        assert!(snapshot.ratios.debt_ratio.is_none());
        assert!(snapshot.ratios.stock_rotation_ratio.is_none());

        let rendered = serde_json::to_value(&snapshot.ratios).unwrap();
        assert!(rendered.get("liquidity_ratio").is_none());
    }

    #[test]
    fn test_date_analysis() {
        let entries = vec![
            entry("512100", "", Some("03/01/2024"), 1.0, 0.0),
            entry("512100", "", Some("15/02/2024"), 1.0, 0.0),
            entry("512100", "", None, 1.0, 0.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        let dates = &snapshot.date_analysis;
        assert_eq!(dates.period_start, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(dates.period_end, NaiveDate::from_ymd_opt(2024, 2, 15));
        assert_eq!(dates.duration_days, 43);
        assert_eq!(dates.entries_without_date, 1);
        assert_eq!(dates.monthly_distribution["2024-01"], 1);
        assert_eq!(dates.monthly_distribution["2024-02"], 1);
    }

    #[test]
    fn test_account_details() {
        let entries = vec![
            entry("411000", "Facture A", Some("03/01/2024"), 100.0, 0.0),
            entry("411000", "Facture A", Some("10/01/2024"), 50.0, 0.0),
            entry("411000", "Règlement", Some("20/01/2024"), 0.0, 150.0),
        ];

        let snapshot = analyze(&entries, "gl.json");
        let detail = &snapshot.account_details["411000"];
        assert_eq!(detail.entry_count, 3);
        assert_eq!(detail.balance, 0.0);
        assert_eq!(detail.earliest_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(detail.latest_date, NaiveDate::from_ymd_opt(2024, 1, 20));
        assert_eq!(detail.principal_label, "Facture A");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = empty_snapshot("bad.json", "missing list");
        assert_eq!(snapshot.entry_count, 0);
        assert_eq!(snapshot.balance, 0.0);
        assert!(snapshot.accounts_by_type.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some("missing list"));
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 50.0), 2.5);
        assert_eq!(percentile(&values, 95.0), 3.85);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn test_snapshot_summary() {
        let entries = vec![
            entry("512100", "", Some("03/01/2024"), 10.0, 0.0),
            entry("411000", "", None, 0.0, 10.0),
        ];
        let summary = analyze(&entries, "gl.json").summary();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.account_count, 2);
        assert_eq!(summary.account_types.len(), 2);
    }
}
