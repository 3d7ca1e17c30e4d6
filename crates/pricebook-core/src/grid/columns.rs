use crate::model::{CellKind, Field};

/// One grid column bound to a line-item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: Field,
    pub title: &'static str,
    /// Preferred display width in characters.
    pub width: u16,
}

impl Column {
    #[must_use]
    pub const fn new(field: Field) -> Self {
        let width = match field {
            Field::ProductName => 28,
            Field::Notes => 24,
            Field::ProductCode | Field::ContainerSize => 12,
            Field::EffectiveDate | Field::ExpirationDate => 11,
            Field::UnitPrice | Field::MinimumPrice => 10,
            Field::Uom => 5,
        };
        Self {
            field,
            title: field.title(),
            width,
        }
    }

    #[must_use]
    pub const fn is_select(&self) -> bool {
        matches!(self.field.kind(), CellKind::Select)
    }
}

/// Every editable field, in display order.
#[must_use]
pub fn default_columns() -> Vec<Column> {
    Field::ALL.iter().map(|&f| Column::new(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_field_order() {
        let columns = default_columns();
        assert_eq!(columns.len(), Field::ALL.len());
        assert_eq!(columns[0].field, Field::ProductCode);
        assert!(columns.iter().any(Column::is_select));
        assert!(columns.iter().all(|c| c.width > 0 && !c.title.is_empty()));
    }
}
