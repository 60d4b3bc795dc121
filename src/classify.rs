use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic class of a ledger account, assigned from the account number by
/// the pattern table below.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Banque,
    Clients,
    Fournisseurs,
    TvaDeductible,
    TvaCollectee,
    Ventes,
    Achats,
    Charges,
    Immobilisations,
    Stocks,
    Capitaux,
    Autres,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Banque => "banque",
            AccountType::Clients => "clients",
            AccountType::Fournisseurs => "fournisseurs",
            AccountType::TvaDeductible => "tva_deductible",
            AccountType::TvaCollectee => "tva_collectee",
            AccountType::Ventes => "ventes",
            AccountType::Achats => "achats",
            AccountType::Charges => "charges",
            AccountType::Immobilisations => "immobilisations",
            AccountType::Stocks => "stocks",
            AccountType::Capitaux => "capitaux",
            AccountType::Autres => "autres",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered classification table. First match wins, so more specific prefixes
/// must stay ahead of broader ones (the VAT entries ahead of `charges`).
static ACCOUNT_PATTERNS: Lazy<Vec<(AccountType, Regex)>> = Lazy::new(|| {
    [
        (AccountType::Banque, r"^512\d*"),
        (AccountType::Clients, r"^411\d*"),
        (AccountType::Fournisseurs, r"^401\d*"),
        (AccountType::TvaDeductible, r"^445661\d*"),
        (AccountType::TvaCollectee, r"^445711\d*"),
        (AccountType::Ventes, r"^70\d*"),
        (AccountType::Achats, r"^60\d*"),
        (AccountType::Charges, r"^6\d*"),
        (AccountType::Immobilisations, r"^2\d*"),
        (AccountType::Stocks, r"^3\d*"),
        (AccountType::Capitaux, r"^1\d*"),
    ]
    .into_iter()
    .map(|(account_type, pattern)| {
        (account_type, Regex::new(pattern).expect("account pattern"))
    })
    .collect()
});

/// Classifies an account number. Numbers matching no pattern fall back to
/// [`AccountType::Autres`].
pub fn classify_account(account: &str) -> AccountType {
    ACCOUNT_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(account))
        .map(|(account_type, _)| *account_type)
        .unwrap_or(AccountType::Autres)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_table() {
        assert_eq!(classify_account("512200"), AccountType::Banque);
        assert_eq!(classify_account("411000"), AccountType::Clients);
        assert_eq!(classify_account("401000"), AccountType::Fournisseurs);
        assert_eq!(classify_account("445661000"), AccountType::TvaDeductible);
        assert_eq!(classify_account("445711000"), AccountType::TvaCollectee);
        assert_eq!(classify_account("701000"), AccountType::Ventes);
        assert_eq!(classify_account("601000"), AccountType::Achats);
        assert_eq!(classify_account("611000"), AccountType::Charges);
        assert_eq!(classify_account("215000"), AccountType::Immobilisations);
        assert_eq!(classify_account("370000"), AccountType::Stocks);
        assert_eq!(classify_account("101000"), AccountType::Capitaux);
        assert_eq!(classify_account("999"), AccountType::Autres);
        assert_eq!(classify_account(""), AccountType::Autres);
    }

    #[test]
    fn test_specific_prefixes_win() {
        // 445661/445711 are not swallowed by the broader charges pattern.
        assert_ne!(classify_account("445661"), AccountType::Charges);
        assert_ne!(classify_account("445711"), AccountType::Charges);
        // A plain 445 account matches nothing in the table.
        assert_eq!(classify_account("445000"), AccountType::Autres);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccountType::TvaDeductible).unwrap(),
            "\"tva_deductible\""
        );
        assert_eq!(
            serde_json::from_str::<AccountType>("\"banque\"").unwrap(),
            AccountType::Banque
        );
    }
}
