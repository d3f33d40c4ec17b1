use super::{RecordId, SchemaRef, TableError};
use crate::datum::Datum;
use itertools::Itertools;
use std::fmt;

/// One row: a descriptor, a matching array of values, and, once stored,
/// the record id naming its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    schema: SchemaRef,
    values: Vec<Datum>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(schema: SchemaRef, values: Vec<Datum>) -> Result<Self, TableError> {
        if values.len() != schema.len()
            || !values
                .iter()
                .zip(schema.iter())
                .all(|(datum, column)| datum.matches_type(&column.data_type))
        {
            return Err(TableError::DatumSchemaNotMatch);
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
    pub fn values(&self) -> &[Datum] {
        &self.values
    }
    pub fn value_at(&self, idx: usize) -> &Datum {
        &self.values[idx]
    }
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }
    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }
    /// Rebind to an equal descriptor (used when renaming columns through
    /// an alias); values are untouched.
    pub fn with_schema(mut self, schema: SchemaRef) -> Result<Self, TableError> {
        if *schema != *self.schema {
            return Err(TableError::DatumSchemaNotMatch);
        }
        self.schema = schema;
        Ok(self)
    }
    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut bytes = Vec::with_capacity(self.schema.size_in_bytes());
        for (datum, column) in self.values.iter().zip(self.schema.iter()) {
            bytes.extend(datum.clone().into_bytes(&column.data_type)?);
        }
        Ok(bytes)
    }
    pub fn from_bytes(schema: SchemaRef, bytes: &[u8]) -> Result<Self, TableError> {
        let mut values = Vec::with_capacity(schema.len());
        let mut offset = 0;
        for column in schema.iter() {
            let size = column.data_type.size_in_bytes();
            values.push(Datum::from_bytes(
                &column.data_type,
                &bytes[offset..offset + size],
            )?);
            offset += size;
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.values.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::DataType;
    use crate::table::Schema;
    use std::sync::Arc;

    fn schema() -> SchemaRef {
        Arc::new(Schema::from_slice(&[
            (DataType::new_int(), "id".to_string()),
            (DataType::new_char(8), "name".to_string()),
        ]))
    }

    #[test]
    fn arity_and_types_are_checked() {
        assert!(Tuple::new(schema(), vec![Datum::Int(1)]).is_err());
        assert!(Tuple::new(schema(), vec![Datum::Int(1), Datum::Int(2)]).is_err());
        assert!(Tuple::new(schema(), vec![Datum::Int(1), Datum::from("x")]).is_ok());
    }

    #[test]
    fn byte_round_trip() {
        let tuple = Tuple::new(schema(), vec![Datum::Int(42), Datum::from("ann")]).unwrap();
        let bytes = tuple.to_bytes().unwrap();
        assert_eq!(bytes.len(), schema().size_in_bytes());
        let back = Tuple::from_bytes(schema(), &bytes).unwrap();
        assert_eq!(back.values(), tuple.values());
    }
}
