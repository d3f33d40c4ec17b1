use crate::datum::DataType;
use itertools::Itertools;
use std::fmt;
use std::slice::Iter;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Column {
    pub data_type: DataType,
    pub desc: String,
}

/// Ordered tuple descriptor. Column names are advisory: two schemas are
/// equal iff their types are pairwise equal.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
}

pub type SchemaRef = Arc<Schema>;

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl Eq for Schema {}

impl Schema {
    pub fn from_slice(type_and_names: &[(DataType, String)]) -> Self {
        Self {
            columns: type_and_names
                .iter()
                .map(|(data_type, desc)| Column {
                    data_type: *data_type,
                    desc: desc.clone(),
                })
                .collect_vec(),
        }
    }
    pub fn len(&self) -> usize {
        self.columns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    pub fn iter(&self) -> Iter<Column> {
        self.columns.iter()
    }
    pub fn column_at(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }
    pub fn type_at(&self, idx: usize) -> DataType {
        self.columns[idx].data_type
    }
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.desc == name)
    }
    /// Bytes one record of this schema occupies on a page.
    pub fn size_in_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.data_type.size_in_bytes())
            .sum()
    }
    /// Same types, names rewritten to `alias.name`.
    pub fn with_prefix(&self, alias: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    data_type: c.data_type,
                    desc: format!("{}.{}", alias, c.desc),
                })
                .collect_vec(),
        }
    }
    /// Concatenation of two descriptors, left columns first.
    pub fn concat(left: &Schema, right: &Schema) -> Self {
        Self {
            columns: left
                .columns
                .iter()
                .chain(right.columns.iter())
                .cloned()
                .collect_vec(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({})",
            self.columns
                .iter()
                .map(|c| format!("{} {}", c.desc, c.data_type))
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_ints(names: (&str, &str)) -> Schema {
        Schema::from_slice(&[
            (DataType::new_int(), names.0.to_string()),
            (DataType::new_int(), names.1.to_string()),
        ])
    }

    #[test]
    fn equality_ignores_names() {
        assert_eq!(two_ints(("a", "b")), two_ints(("x", "y")));
        let with_char = Schema::from_slice(&[
            (DataType::new_int(), "a".to_string()),
            (DataType::new_char(16), "b".to_string()),
        ]);
        assert_ne!(two_ints(("a", "b")), with_char);
    }

    #[test]
    fn size_is_sum_of_type_sizes() {
        let schema = Schema::from_slice(&[
            (DataType::new_int(), "a".to_string()),
            (DataType::new_char(128), "b".to_string()),
        ]);
        assert_eq!(schema.size_in_bytes(), 4 + 4 + 128);
    }

    #[test]
    fn prefix_and_concat() {
        let schema = two_ints(("a", "b")).with_prefix("t");
        assert_eq!(schema.index_of("t.a"), Some(0));
        assert_eq!(schema.index_of("a"), None);
        let joined = Schema::concat(&schema, &two_ints(("c", "d")));
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.index_of("c"), Some(2));
    }
}
