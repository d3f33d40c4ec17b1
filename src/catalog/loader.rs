use super::CatalogError;
use crate::datum::{DataType, Datum};
use crate::db::Database;
use crate::storage::{HeapFile, StorageError, TableId};
use crate::table::{Schema, TableError, Tuple};
use crate::transaction::TransactionId;
use csv::ReaderBuilder;
use itertools::Itertools;
use log::info;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

///
/// Schema file format, one table per line:
///
///     path | name type, name type, ... | primaryKeyName?
///
/// with `type` one of `int`, `string`. Paths are resolved relative to
/// the schema file. Blank lines and `#` comments are skipped.
///
pub fn load_schema(db: &Database, path: impl AsRef<Path>) -> Result<Vec<TableId>, LoaderError> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let text = std::fs::read_to_string(path)?;
    let mut tables = vec![];
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts = line.split('|').map(str::trim).collect_vec();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(LoaderError::Parse(line_no + 1, line.to_string()));
        }
        let columns = parts[1]
            .split(',')
            .map(|column| {
                let mut words = column.split_whitespace();
                match (words.next(), words.next(), words.next()) {
                    (Some(name), Some("int"), None) => {
                        Ok((DataType::new_int(), name.to_string()))
                    }
                    (Some(name), Some("string"), None) => Ok((
                        DataType::new_char(db.config().string_len),
                        name.to_string(),
                    )),
                    _ => Err(LoaderError::Parse(line_no + 1, column.to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let primary_key = parts.get(2).copied().unwrap_or("");
        let table_path = base.join(parts[0]);
        let name = Path::new(parts[0])
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| parts[0].to_string());
        let schema = Arc::new(Schema::from_slice(&columns));
        let file = Arc::new(HeapFile::open(table_path, schema, db.config())?);
        tables.push(db.catalog().add_table(file, &name, primary_key));
    }
    Ok(tables)
}

/// Bulk-loads header-less CSV rows into `table` through the buffer pool
/// under `tid`. Returns the number of tuples inserted.
pub fn load_csv(
    db: &Database,
    tid: TransactionId,
    table: TableId,
    path: impl AsRef<Path>,
) -> Result<usize, LoaderError> {
    let schema = db.catalog().schema(table)?;
    let mut reader = ReaderBuilder::new().has_headers(false).from_path(path)?;
    let mut count = 0;
    for record in reader.records() {
        let record = record?;
        if record.len() != schema.len() {
            return Err(LoaderError::Parse(count + 1, record.iter().join(",")));
        }
        let values = record
            .iter()
            .zip(schema.iter())
            .map(|(field, column)| match column.data_type {
                DataType::Int => field
                    .trim()
                    .parse::<i32>()
                    .map(Datum::Int)
                    .map_err(|_| LoaderError::Parse(count + 1, field.to_string())),
                DataType::Char(_) => Ok(Datum::from(field)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tuple = Tuple::new(schema.clone(), values)?;
        db.buffer_pool().insert_tuple(db, tid, table, tuple)?;
        count += 1;
    }
    info!("loaded {} tuples into table {}", count, table);
    Ok(count)
}

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed input at line {0}: {1}")]
    Parse(usize, String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::storage::HeapFileIterator;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn schema_file_registers_tables() {
        let dir = TempDir::new().unwrap();
        let schema_path = dir.path().join("catalog.schema");
        let mut f = std::fs::File::create(&schema_path).unwrap();
        writeln!(f, "# test catalog").unwrap();
        writeln!(f, "emp.dat | id int, name string | id").unwrap();
        writeln!(f, "dept.dat | id int, city string").unwrap();
        drop(f);

        let db = Database::new();
        let tables = load_schema(&db, &schema_path).unwrap();
        assert_eq!(tables.len(), 2);
        let emp = db.catalog().table_id_of("emp").unwrap();
        assert_eq!(db.catalog().primary_key(emp).unwrap(), "id");
        let schema = db.catalog().schema(emp).unwrap();
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(
            schema.type_at(1),
            DataType::new_char(db.config().string_len)
        );
        let dept = db.catalog().table_id_of("dept").unwrap();
        assert_eq!(db.catalog().primary_key(dept).unwrap(), "");
    }

    #[test]
    fn malformed_schema_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let schema_path = dir.path().join("catalog.schema");
        std::fs::write(&schema_path, "emp.dat | id integer | id\n").unwrap();
        let db = Database::new();
        assert!(matches!(
            load_schema(&db, &schema_path),
            Err(LoaderError::Parse(1, _))
        ));
    }

    #[test]
    fn csv_rows_become_tuples() {
        let dir = TempDir::new().unwrap();
        let schema_path = dir.path().join("catalog.schema");
        std::fs::write(&schema_path, "emp.dat | id int, name string | id\n").unwrap();
        let csv_path = dir.path().join("emp.csv");
        std::fs::write(&csv_path, "1,ann\n2,bob\n").unwrap();

        let db = Database::new();
        load_schema(&db, &schema_path).unwrap();
        let table = db.catalog().table_id_of("emp").unwrap();
        let tid = TransactionId::new();
        assert_eq!(load_csv(&db, tid, table, &csv_path).unwrap(), 2);
        let mut iter = HeapFileIterator::new(db.clone(), tid, table).unwrap();
        let mut names = vec![];
        while let Some(tuple) = iter.next_tuple().unwrap() {
            names.push(tuple.value_at(1).to_string());
        }
        assert_eq!(names, vec!["ann", "bob"]);
        db.transaction_complete(tid, true).unwrap();
    }
}
