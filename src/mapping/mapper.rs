//! Accessor-table field mapper

use super::convert::convert;
use crate::error::{Error, Result};
use crate::record::{MappedRecord, SourceValue};
use crate::schema::Schema;
use crate::types::RoundingMode;
use crate::writer::PartitionedWriter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

type Accessor<T> = Box<dyn Fn(&T) -> std::result::Result<SourceValue, String> + Send + Sync>;

/// Declares how each schema field is read from a domain type `T`
///
/// ```ignore
/// let mapper = FieldMapper::<Nav>::builder()
///     .field("mstar_id", |n: &Nav| n.mstar_id.clone())
///     .field("nav_date", |n: &Nav| n.nav_date)
///     .field("value", |n: &Nav| n.value.clone())
///     .field("amount", |n: &Nav| n.amount.clone())
///     .build(schema)?;
/// ```
pub struct MappingBuilder<T> {
    accessors: Vec<(String, Accessor<T>)>,
    rounding: RoundingMode,
}

impl<T> Default for MappingBuilder<T> {
    fn default() -> Self {
        Self {
            accessors: Vec::new(),
            rounding: RoundingMode::default(),
        }
    }
}

impl<T> MappingBuilder<T> {
    /// Create an empty builder with the default rounding mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind schema field `name` to an infallible accessor
    #[must_use]
    pub fn field<V, F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        V: Into<SourceValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let boxed: Accessor<T> = Box::new(move |item: &T| Ok(accessor(item).into()));
        self.accessors.push((name.into(), boxed));
        self
    }

    /// Bind schema field `name` to an accessor that may fail with a reason
    #[must_use]
    pub fn try_field<V, F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        V: Into<SourceValue>,
        F: Fn(&T) -> std::result::Result<V, String> + Send + Sync + 'static,
    {
        let boxed: Accessor<T> = Box::new(move |item: &T| accessor(item).map(Into::into));
        self.accessors.push((name.into(), boxed));
        self
    }

    /// Set how decimals with excess fractional digits are constrained
    #[must_use]
    pub fn rounding(mut self, mode: RoundingMode) -> Self {
        self.rounding = mode;
        self
    }

    /// Bind the accessors to `schema`
    ///
    /// Accessors naming no schema field, or naming a field twice, are
    /// configuration errors. Schema fields without an accessor are allowed
    /// here but fail every `map` call.
    pub fn build(self, schema: Arc<Schema>) -> Result<FieldMapper<T>> {
        let mut seen = HashSet::new();
        let mut bindings: Vec<Option<Accessor<T>>> = schema.fields().iter().map(|_| None).collect();

        for (name, accessor) in self.accessors {
            if !seen.insert(name.clone()) {
                return Err(Error::config(format!(
                    "accessor for field '{name}' registered twice"
                )));
            }
            let idx = schema.index_of(&name).ok_or_else(|| {
                Error::config(format!(
                    "accessor '{name}' does not match any field of {}",
                    schema.full_name()
                ))
            })?;
            bindings[idx] = Some(accessor);
        }

        for (field, binding) in schema.fields().iter().zip(&bindings) {
            if binding.is_none() {
                warn!(
                    "No accessor for field '{}' of {}; mapping will fail",
                    field.name,
                    schema.full_name()
                );
            }
        }
        debug!(
            "Built mapper for {} ({} fields, rounding {})",
            schema.full_name(),
            schema.len(),
            self.rounding
        );

        Ok(FieldMapper {
            schema,
            bindings,
            rounding: self.rounding,
        })
    }
}

/// Converts domain records of type `T` into schema-ordered records
pub struct FieldMapper<T> {
    schema: Arc<Schema>,
    /// One slot per schema field, in schema order
    bindings: Vec<Option<Accessor<T>>>,
    rounding: RoundingMode,
}

impl<T> std::fmt::Debug for FieldMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMapper")
            .field("schema", &self.schema.full_name())
            .field("bound", &self.bindings.iter().filter(|b| b.is_some()).count())
            .field("rounding", &self.rounding)
            .finish()
    }
}

impl<T> FieldMapper<T> {
    /// Start declaring accessors
    pub fn builder() -> MappingBuilder<T> {
        MappingBuilder::new()
    }

    /// Schema records are mapped to
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Rounding mode applied to decimals
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Map one domain record
    pub fn map(&self, item: &T) -> Result<MappedRecord> {
        let mut record = MappedRecord::with_capacity(self.schema.len());

        for (field, binding) in self.schema.fields().iter().zip(&self.bindings) {
            let accessor = binding
                .as_ref()
                .ok_or_else(|| Error::mapping(&field.name, "no accessor registered"))?;
            let source = accessor(item).map_err(|reason| Error::mapping(&field.name, reason))?;
            let value = convert(field, source, self.rounding)
                .map_err(|reason| Error::mapping(&field.name, reason))?;
            record.push(field.name.clone(), value);
        }

        Ok(record)
    }

    /// Map one domain record and append it to `writer`
    ///
    /// Nothing is buffered unless mapping succeeds. Returns the shard index.
    pub fn map_and_append(&self, item: &T, writer: &mut PartitionedWriter) -> Result<usize> {
        if writer.is_closed() {
            return Err(Error::WriterClosed);
        }
        if !Arc::ptr_eq(&self.schema, writer.schema()) && *self.schema != **writer.schema() {
            return Err(Error::config(format!(
                "mapper schema {} does not match writer schema {}",
                self.schema.full_name(),
                writer.schema().full_name()
            )));
        }

        let record = self.map(item)?;
        writer.append(record)
    }
}
