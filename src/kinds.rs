//! Registry of the table kinds the pipeline understands.
//!
//! Each [`TableKind`] owns its column layout, the coercions the cleaner applies,
//! the invariants the post-clean validator checks and the mapping onto the
//! store's lower_snake_case columns. Adding a kind means adding a variant here.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Parse to a calendar date, falling back to `YYYY.MM.DD.`.
    Date,
    /// Parse to an integer or float.
    Numeric,
    /// Trim surrounding whitespace.
    Trim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub column: &'static str,
    pub coercion: Coercion,
}

/// One column as it appears in the source and in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub store: &'static str,
    pub sql_type: &'static str,
}

const fn col(source: &'static str, store: &'static str, sql_type: &'static str) -> ColumnSpec {
    ColumnSpec {
        source,
        store,
        sql_type,
    }
}

const SPENDING_COLUMNS: &[ColumnSpec] = &[
    col("Title", "title", "TEXT"),
    col("Date", "date", "TEXT"),
    col("Amount", "amount", "REAL"),
    col("Currency", "currency", "TEXT"),
    col("In EUR", "in_eur", "REAL"),
    col("Category", "category", "TEXT"),
    col("Payment Method", "payment_method", "TEXT"),
    col("City", "city", "TEXT"),
    col("Country", "country", "TEXT"),
    col("Comment", "comment", "TEXT"),
];

const PLACES_COLUMNS: &[ColumnSpec] = &[
    col("Order", "order", "INTEGER"),
    col("Arrival_Date", "arrival_date", "TEXT"),
    col("Nights", "nights", "INTEGER"),
    col("Country", "country", "TEXT"),
    col("City", "city", "TEXT"),
    col("Host_Name", "host_name", "TEXT"),
    col("Couchsurfing_FLG", "couchsurfing_flg", "TEXT"),
    col("G_FLG", "g_flg", "TEXT"),
    col("Bike_FLG", "bike_flg", "TEXT"),
    col("Gender", "gender", "TEXT"),
    col("Hosts_Personality_Point", "hosts_personality_point", "INTEGER"),
    col("Location_Point", "location_point", "INTEGER"),
    col("Comfort", "comfort", "TEXT"),
    col("Comment", "comment", "TEXT"),
];

const SPENDING_RULES: &[ColumnRule] = &[
    ColumnRule {
        column: "Date",
        coercion: Coercion::Date,
    },
    ColumnRule {
        column: "Amount",
        coercion: Coercion::Numeric,
    },
    ColumnRule {
        column: "Title",
        coercion: Coercion::Trim,
    },
];

const PLACES_RULES: &[ColumnRule] = &[
    ColumnRule {
        column: "Arrival_Date",
        coercion: Coercion::Date,
    },
    ColumnRule {
        column: "Nights",
        coercion: Coercion::Numeric,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Spending,
    Places,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Spending, TableKind::Places];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Spending => "spending",
            TableKind::Places => "places",
        }
    }

    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            TableKind::Spending => SPENDING_COLUMNS,
            TableKind::Places => PLACES_COLUMNS,
        }
    }

    pub fn coercions(self) -> &'static [ColumnRule] {
        match self {
            TableKind::Spending => SPENDING_RULES,
            TableKind::Places => PLACES_RULES,
        }
    }

    /// Required columns used when the configuration names none: every coerced column.
    pub fn default_required_columns(self) -> Vec<String> {
        self.coercions()
            .iter()
            .map(|rule| rule.column.to_string())
            .collect()
    }

    /// Columns that must hold the coerced type once cleaning is done.
    pub fn typed_columns(self) -> impl Iterator<Item = ColumnRule> {
        self.coercions()
            .iter()
            .copied()
            .filter(|rule| rule.coercion != Coercion::Trim)
    }

    pub fn non_negative_columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Spending => &[],
            TableKind::Places => &["Nights"],
        }
    }

    pub fn store_column(self, source: &str) -> Option<&'static str> {
        self.columns()
            .iter()
            .find(|spec| spec.source == source)
            .map(|spec| spec.store)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
