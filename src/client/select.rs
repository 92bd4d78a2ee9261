use serde_json::Value;

/// Ordering applied to a read query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// A read query over one table: at most one equality filter and at most
/// one ordering column. This is the full shape the repositories need;
/// richer predicates are out of scope.
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub filter: Option<(String, Value)>,
    pub order: Option<OrderBy>,
}

impl Select {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter on `column`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((column.into(), value.into()));
        self
    }

    /// Orders results by `column`, newest-style descending.
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    /// Orders results by `column` ascending.
    #[must_use]
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            descending: false,
        });
        self
    }
}
