//! Declarative mapping from canonical fields to the source labels that feed them.
//!
//! Each field has an ordered chain of alias sets. The resolver walks the chain
//! and stops at the first set that yields a value for the requested year.

/// Statement group a label is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Income,
    Balance,
}

/// Canonical fields resolved through label aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Sales,
    CurrentAssets,
    CurrentLiabilities,
    FinancialDebts,
    Equity,
    IntangibleAssets,
    NetIncome,
    Eps,
}

impl CanonicalField {
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Sales => "sales",
            CanonicalField::CurrentAssets => "current_assets",
            CanonicalField::CurrentLiabilities => "current_liabilities",
            CanonicalField::FinancialDebts => "financial_debts",
            CanonicalField::Equity => "equity",
            CanonicalField::IntangibleAssets => "intangible_assets",
            CanonicalField::NetIncome => "net_income",
            CanonicalField::Eps => "eps",
        }
    }
}

/// How the labels of one alias set combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Add every matching value across all labels.
    Sum,
    /// Take the value of the first label (in list order) that matches.
    FirstMatch,
}

#[derive(Debug, Clone, Copy)]
pub struct AliasSet {
    pub labels: &'static [&'static str],
    pub aggregation: Aggregation,
}

/// Resolution rule for one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: CanonicalField,
    pub statement: Statement,
    /// Tried in order; later sets are fallbacks.
    pub chain: &'static [AliasSet],
}

pub const FIELD_ALIASES: &[FieldAliases] = &[
    FieldAliases {
        field: CanonicalField::Sales,
        statement: Statement::Income,
        chain: &[AliasSet {
            labels: &["Operating Revenue", "Total Revenue"],
            aggregation: Aggregation::FirstMatch,
        }],
    },
    FieldAliases {
        field: CanonicalField::CurrentAssets,
        statement: Statement::Balance,
        chain: &[AliasSet {
            labels: &["Current Assets", "Other Current Assets"],
            aggregation: Aggregation::Sum,
        }],
    },
    FieldAliases {
        field: CanonicalField::CurrentLiabilities,
        statement: Statement::Balance,
        chain: &[AliasSet {
            labels: &["Current Liabilities", "Other Current Liabilities"],
            aggregation: Aggregation::Sum,
        }],
    },
    FieldAliases {
        field: CanonicalField::FinancialDebts,
        statement: Statement::Balance,
        chain: &[
            AliasSet {
                labels: &[
                    "Derivative Product Liabilities",
                    "Long Term Debt And Capital Lease Obligation",
                ],
                aggregation: Aggregation::Sum,
            },
            AliasSet {
                labels: &["Long Term Debt And Capital Lease Obligation"],
                aggregation: Aggregation::Sum,
            },
        ],
    },
    FieldAliases {
        field: CanonicalField::Equity,
        statement: Statement::Balance,
        chain: &[AliasSet {
            labels: &["Stockholders Equity", "Common Stock Equity"],
            aggregation: Aggregation::FirstMatch,
        }],
    },
    FieldAliases {
        field: CanonicalField::IntangibleAssets,
        statement: Statement::Balance,
        chain: &[AliasSet {
            labels: &["Goodwill And Other Intangible Assets"],
            aggregation: Aggregation::FirstMatch,
        }],
    },
    FieldAliases {
        // "Net Income" is reported too but does not carry the same values.
        field: CanonicalField::NetIncome,
        statement: Statement::Income,
        chain: &[AliasSet {
            labels: &["Net Income Continuous Operations"],
            aggregation: Aggregation::FirstMatch,
        }],
    },
    FieldAliases {
        field: CanonicalField::Eps,
        statement: Statement::Income,
        chain: &[AliasSet {
            labels: &["Basic EPS"],
            aggregation: Aggregation::FirstMatch,
        }],
    },
];

/// Look up the alias rule for a field.
pub fn aliases_for(field: CanonicalField) -> Option<&'static FieldAliases> {
    FIELD_ALIASES.iter().find(|rule| rule.field == field)
}
