use crate::recon::alert::AlertKind;

/// Corrective template attached to an alert kind. Guides are data: the
/// detector never hard-codes correction logic, it only binds a kind, and
/// the UI renders whatever the guide suggests.
#[derive(Debug)]
pub struct Guide {
    pub title: &'static str,
    pub action: &'static str,
    /// Default counter-account for the corrective entry.
    pub suggested_account: &'static str,
    /// Pure function of `(reference, counterparty_name)`.
    pub label_template: fn(&str, &str) -> String,
    pub counter_entry_hint: &'static str,
}

impl Guide {
    pub fn suggested_label(&self, reference: &str, name: &str) -> String {
        (self.label_template)(reference, name)
    }
}

static FACTURE_NON_RAPPROCHEE: Guide = Guide {
    title: "Facture non rapprochée",
    action: "Ajouter l'écriture d'encaissement manquante sur le compte bancaire",
    suggested_account: "512200",
    label_template: |reference, name| format!("Encaissement {} - {}", reference, name),
    counter_entry_hint: "Contrepartie sur le compte d'origine 411xxx ou 401xxx",
};

static CHEQUE_NON_COMPTABILISE: Guide = Guide {
    title: "Chèque non comptabilisé",
    action: "Enregistrer le chèque constaté sur le relevé dans le grand livre",
    suggested_account: "512200",
    label_template: |reference, name| format!("Chèque N°{} - {}", reference, name),
    counter_entry_hint: "Contrepartie 401xxx (fournisseur) ou 6xxxxx (charge)",
};

static CHEQUE_EMIS_NON_ENCAISSE: Guide = Guide {
    title: "Chèque émis non encaissé",
    action: "Vérifier l'encaissement du chèque ou constater le chèque en circulation",
    suggested_account: "512200",
    label_template: |reference, name| format!("Chèque émis N°{} - {}", reference, name),
    counter_entry_hint: "Contrepartie 401xxx, à pointer lors du rapprochement suivant",
};

static CHEQUE_ENCAISSE_NON_EMIS: Guide = Guide {
    title: "Chèque encaissé non émis",
    action: "Ajouter l'écriture d'émission manquante pour le chèque encaissé",
    suggested_account: "411000",
    label_template: |reference, name| format!("Chèque encaissé N°{} - {}", reference, name),
    counter_entry_hint: "Contrepartie 512xxx (banque)",
};

static CHEQUE_INCOHERENT: Guide = Guide {
    title: "Chèque incohérent",
    action: "Régulariser l'écart entre le montant comptabilisé et le montant encaissé",
    suggested_account: "658000",
    label_template: |reference, name| format!("Régularisation chèque N°{} - {}", reference, name),
    counter_entry_hint: "Contrepartie 512xxx; 658000 pour la perte sur écart",
};

static ECART_MONTANT: Guide = Guide {
    title: "Écart de montant",
    action: "Corriger le montant de l'écriture ou constater l'écart",
    suggested_account: "658000",
    label_template: |reference, name| format!("Régularisation écart {} - {}", reference, name),
    counter_entry_hint: "Contrepartie 512xxx (banque)",
};

static NUMERO_MANQUANT: Guide = Guide {
    title: "Numéro de document manquant",
    action: "Compléter le numéro de facture ou de chèque sur le document source",
    suggested_account: "411000",
    label_template: |reference, name| format!("Facture {} - {}", reference, name),
    counter_entry_hint: "Aucune contrepartie; correction du document source uniquement",
};

static JOUR_NON_OUVRABLE: Guide = Guide {
    title: "Transaction un jour non ouvrable",
    action: "Vérifier la date de l'écriture et la corriger si elle est erronée",
    suggested_account: "512200",
    label_template: |reference, name| format!("Correction date {} - {}", reference, name),
    counter_entry_hint: "Aucune contrepartie; seule la date est en cause",
};

/// Direct guide lookup by kind.
pub fn guide_for_kind(kind: AlertKind) -> &'static Guide {
    match kind {
        AlertKind::FactureNonRapprochee => &FACTURE_NON_RAPPROCHEE,
        AlertKind::ChequeNonComptabilise => &CHEQUE_NON_COMPTABILISE,
        AlertKind::ChequeEmisNonEncaisse => &CHEQUE_EMIS_NON_ENCAISSE,
        AlertKind::ChequeEncaisseNonEmis => &CHEQUE_ENCAISSE_NON_EMIS,
        AlertKind::ChequeIncoherent => &CHEQUE_INCOHERENT,
        AlertKind::EcartMontant => &ECART_MONTANT,
        AlertKind::NumeroManquant => &NUMERO_MANQUANT,
        AlertKind::JourNonOuvrable => &JOUR_NON_OUVRABLE,
    }
}

/// Localized alert titles registered as aliases for a kind. Titles arriving
/// from older payloads resolve through this table.
const TITLE_ALIASES: [(&str, AlertKind); 10] = [
    ("Facture non rapprochée", AlertKind::FactureNonRapprochee),
    ("Chèque non comptabilisé", AlertKind::ChequeNonComptabilise),
    ("Chèque émis non encaissé", AlertKind::ChequeEmisNonEncaisse),
    ("Chèque encaissé non émis", AlertKind::ChequeEncaisseNonEmis),
    ("Chèque incohérent", AlertKind::ChequeIncoherent),
    ("Écart de montant", AlertKind::EcartMontant),
    ("Ecart de montant", AlertKind::EcartMontant),
    ("Numéro de document manquant", AlertKind::NumeroManquant),
    ("Numéro manquant", AlertKind::NumeroManquant),
    ("Transaction un jour non ouvrable", AlertKind::JourNonOuvrable),
];

pub fn kind_for_title(title: &str) -> Option<AlertKind> {
    TITLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == title)
        .map(|(_, kind)| *kind)
}

/// Guide resolution: by kind first, then by localized title through the
/// alias table. `None` when both miss; the UI degrades to read-only.
pub fn resolve_guide(kind: Option<AlertKind>, title: Option<&str>) -> Option<&'static Guide> {
    kind.or_else(|| title.and_then(kind_for_title))
        .map(guide_for_kind)
}
