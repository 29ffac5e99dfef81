use std::fmt;

/// A single-row lookup against an inference model:
/// `SELECT <field> FROM <model> WHERE <column>="<text>"`.
///
/// The text is only ever rendered through [`escape_literal`], so callers
/// hand over raw article text and never quote it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    field: String,
    model: String,
    column: String,
    text: String,
}

impl SelectQuery {
    pub fn new(
        field: impl Into<String>,
        model: impl Into<String>,
        column: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            model: model.into(),
            column: column.into(),
            text: text.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The unescaped input text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT {} FROM {} WHERE {}=\"{}\";",
            self.field,
            self.model,
            self.column,
            escape_literal(&self.text)
        )
    }
}

/// Makes `text` safe to inline between double quotes.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push('\''),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}
