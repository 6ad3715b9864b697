// RawSleuth - core/graph.rs
//
// Entity graph: Instrument -> Run -> Value <- Property.
//
// Entities live in arenas owned by `EntityGraph` and refer to each other by
// typed ids, so the bidirectional links (Run <-> Value <-> Property, and
// Instrument -> Property) are plain map entries that are always updated
// together inside one `&mut self` call. Nothing outside this module can
// mutate a link, which keeps the graph consistent at every observable point.
//
// Entities are never removed; ids stay valid for the lifetime of the graph.

use crate::core::model::{Aggregate, Cv, InstrumentModel};
use crate::util::error::GraphError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// =============================================================================
// Ids
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            const ENTITY: &'static str = $entity;

            /// Position of the entity in its arena.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} #{}", Self::ENTITY, self.0)
            }
        }
    };
}

entity_id!(
    /// Handle of an `Instrument` in an `EntityGraph`.
    InstrumentId,
    "instrument"
);
entity_id!(
    /// Handle of a `Run` in an `EntityGraph`.
    RunId,
    "run"
);
entity_id!(
    /// Handle of a `Property` in an `EntityGraph`.
    PropertyId,
    "property"
);
entity_id!(
    /// Handle of a `Value` in an `EntityGraph`.
    ValueId,
    "value"
);

// =============================================================================
// Entities
// =============================================================================

/// A mass spectrometer. Owns its runs and accumulates the properties any of
/// its runs has recorded a value for.
#[derive(Debug, Clone, Serialize)]
pub struct Instrument {
    name: String,
    model: InstrumentModel,
    cv: Cv,
    runs: Vec<RunId>,
    properties: BTreeSet<PropertyId>,
}

impl Instrument {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> InstrumentModel {
        self.model
    }

    pub fn cv(&self) -> &Cv {
        &self.cv
    }

    pub fn runs(&self) -> &[RunId] {
        &self.runs
    }

    pub fn properties(&self) -> &BTreeSet<PropertyId> {
        &self.properties
    }
}

/// One acquisition (one raw file) on one instrument.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    name: String,
    storage_name: String,
    sample_date: DateTime<Utc>,
    instrument: InstrumentId,
    values: BTreeMap<PropertyId, ValueId>,
    metadata: BTreeMap<String, String>,
}

impl Run {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical path of the raw file the run was extracted from.
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn sample_date(&self) -> DateTime<Utc> {
        self.sample_date
    }

    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    pub fn values(&self) -> &BTreeMap<PropertyId, ValueId> {
        &self.values
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// A named, typed observable. Shared across runs.
///
/// Two properties are the same entity iff every identifying field matches
/// (`PropertyKey`); same name with a different numeric flag is a distinct
/// property.
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    accession: String,
    cv: Cv,
    numeric: bool,
    values: BTreeMap<RunId, ValueId>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag (`statuslog` or `tunemethod`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }

    pub fn cv(&self) -> &Cv {
        &self.cv
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    pub fn values(&self) -> &BTreeMap<RunId, ValueId> {
        &self.values
    }

}

/// Identifying fields of a `Property`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyKey<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub accession: &'a str,
    pub cv: &'a Cv,
    pub numeric: bool,
}

/// Owned form of `PropertyKey`, used to index properties.
type PropertyIdentity = (String, String, String, Cv, bool);

impl PropertyKey<'_> {
    fn identity(&self) -> PropertyIdentity {
        (
            self.name.to_string(),
            self.kind.to_string(),
            self.accession.to_string(),
            self.cv.clone(),
            self.numeric,
        )
    }
}

/// The aggregate of one property within one run.
#[derive(Debug, Clone, Serialize)]
pub struct Value {
    property: PropertyId,
    run: RunId,
    #[serde(flatten)]
    aggregate: Aggregate,
}

impl Value {
    pub fn property(&self) -> PropertyId {
        self.property
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Arena owning every entity of an extraction or batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityGraph {
    instruments: Vec<Instrument>,
    runs: Vec<Run>,
    properties: Vec<Property>,
    values: Vec<Value>,
    #[serde(skip)]
    property_index: HashMap<PropertyIdentity, PropertyId>,
}

/// Reject a blank (empty or whitespace-only) name or value.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), GraphError> {
    if value.trim().is_empty() {
        return Err(GraphError::InvalidArgument {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Instruments
    // -------------------------------------------------------------------------

    /// Add a new instrument. Instrument names are unique within a graph.
    pub fn add_instrument(
        &mut self,
        name: &str,
        model: InstrumentModel,
        cv: Cv,
    ) -> Result<InstrumentId, GraphError> {
        require_non_empty("instrument name", name)?;
        if self.find_instrument(name).is_some() {
            return Err(GraphError::InvalidArgument {
                field: "instrument name",
                reason: format!("an instrument named '{name}' already exists"),
            });
        }

        let id = InstrumentId(self.instruments.len());
        self.instruments.push(Instrument {
            name: name.to_string(),
            model,
            cv,
            runs: Vec::new(),
            properties: BTreeSet::new(),
        });
        tracing::debug!(instrument = name, model = %model, "Instrument added");
        Ok(id)
    }

    /// Return the instrument named `name`, adding it if absent.
    ///
    /// An existing instrument keeps its model; a mismatch is logged.
    pub fn find_or_add_instrument(
        &mut self,
        name: &str,
        model: InstrumentModel,
        cv: Cv,
    ) -> Result<InstrumentId, GraphError> {
        if let Some(id) = self.find_instrument(name) {
            let existing = self.instruments[id.0].model;
            if existing != model {
                tracing::warn!(
                    instrument = name,
                    existing = %existing,
                    reported = %model,
                    "Run reports a different model than the instrument it is added to"
                );
            }
            return Ok(id);
        }
        self.add_instrument(name, model, cv)
    }

    pub fn find_instrument(&self, name: &str) -> Option<InstrumentId> {
        self.instruments
            .iter()
            .position(|i| i.name == name)
            .map(InstrumentId)
    }

    pub fn instrument(&self, id: InstrumentId) -> Result<&Instrument, GraphError> {
        self.instruments
            .get(id.0)
            .ok_or_else(|| invalid_reference(InstrumentId::ENTITY, id.0))
    }

    pub fn instruments(&self) -> impl Iterator<Item = (InstrumentId, &Instrument)> {
        self.instruments
            .iter()
            .enumerate()
            .map(|(i, e)| (InstrumentId(i), e))
    }

    // -------------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------------

    /// Add a run to `instrument`. Run names are unique per instrument.
    pub fn add_run(
        &mut self,
        instrument: InstrumentId,
        name: &str,
        storage_name: &str,
        sample_date: DateTime<Utc>,
    ) -> Result<RunId, GraphError> {
        self.instrument(instrument)?;
        require_non_empty("run name", name)?;
        require_non_empty("run storage name", storage_name)?;
        if self.find_run(instrument, name).is_some() {
            return Err(GraphError::InvalidArgument {
                field: "run name",
                reason: format!(
                    "instrument '{}' already has a run named '{name}'",
                    self.instruments[instrument.0].name
                ),
            });
        }

        let id = RunId(self.runs.len());
        self.runs.push(Run {
            name: name.to_string(),
            storage_name: storage_name.to_string(),
            sample_date,
            instrument,
            values: BTreeMap::new(),
            metadata: BTreeMap::new(),
        });
        self.instruments[instrument.0].runs.push(id);
        Ok(id)
    }

    pub fn find_run(&self, instrument: InstrumentId, name: &str) -> Option<RunId> {
        let instrument = self.instruments.get(instrument.0)?;
        instrument
            .runs
            .iter()
            .copied()
            .find(|id| self.runs[id.0].name == name)
    }

    pub fn run(&self, id: RunId) -> Result<&Run, GraphError> {
        self.runs
            .get(id.0)
            .ok_or_else(|| invalid_reference(RunId::ENTITY, id.0))
    }

    pub fn runs(&self) -> impl Iterator<Item = (RunId, &Run)> {
        self.runs.iter().enumerate().map(|(i, e)| (RunId(i), e))
    }

    /// Attach a metadata entry to `run`, replacing any entry of the same name.
    pub fn add_metadata(&mut self, run: RunId, name: &str, value: &str) -> Result<(), GraphError> {
        self.run(run)?;
        require_non_empty("metadata name", name)?;
        require_non_empty("metadata value", value)?;
        self.runs[run.0]
            .metadata
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Return the property equal to `key` in every field, creating it if
    /// none exists.
    pub fn find_or_create_property(&mut self, key: PropertyKey<'_>) -> Result<PropertyId, GraphError> {
        let identity = key.identity();
        if let Some(&id) = self.property_index.get(&identity) {
            return Ok(id);
        }
        require_non_empty("property type", key.kind)?;

        let id = PropertyId(self.properties.len());
        self.property_index.insert(identity, id);
        self.properties.push(Property {
            name: key.name.to_string(),
            kind: key.kind.to_string(),
            accession: key.accession.to_string(),
            cv: key.cv.clone(),
            numeric: key.numeric,
            values: BTreeMap::new(),
        });
        tracing::trace!(property = key.name, kind = key.kind, numeric = key.numeric, "Property created");
        Ok(id)
    }

    pub fn find_property(&self, key: PropertyKey<'_>) -> Option<PropertyId> {
        self.property_index.get(&key.identity()).copied()
    }

    pub fn property(&self, id: PropertyId) -> Result<&Property, GraphError> {
        self.properties
            .get(id.0)
            .ok_or_else(|| invalid_reference(PropertyId::ENTITY, id.0))
    }

    pub fn properties(&self) -> impl Iterator<Item = (PropertyId, &Property)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(i, e)| (PropertyId(i), e))
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    /// Record `aggregate` as the value of `property` in `run`.
    ///
    /// Links the value into the property, the run and (through the run) the
    /// instrument. A second value for the same pair replaces the first in
    /// place: the pair keeps its `ValueId`, the fields are the new ones.
    pub fn add_value(
        &mut self,
        property: PropertyId,
        run: RunId,
        aggregate: Aggregate,
    ) -> Result<ValueId, GraphError> {
        self.property(property)?;
        let instrument = self.run(run)?.instrument;

        if let Some(&existing) = self.properties[property.0].values.get(&run) {
            tracing::debug!(
                property = %self.properties[property.0].name,
                run = %self.runs[run.0].name,
                "Replacing existing value"
            );
            self.values[existing.0].aggregate = aggregate;
            return Ok(existing);
        }

        let id = ValueId(self.values.len());
        self.values.push(Value {
            property,
            run,
            aggregate,
        });
        self.properties[property.0].values.insert(run, id);
        self.runs[run.0].values.insert(property, id);
        self.instruments[instrument.0].properties.insert(property);
        Ok(id)
    }

    pub fn value(&self, id: ValueId) -> Result<&Value, GraphError> {
        self.values
            .get(id.0)
            .ok_or_else(|| invalid_reference(ValueId::ENTITY, id.0))
    }

    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values.iter().enumerate().map(|(i, e)| (ValueId(i), e))
    }

    /// The value `run` recorded for `property`, if any.
    pub fn run_value(&self, run: RunId, property: PropertyId) -> Option<&Value> {
        let id = self.runs.get(run.0)?.values.get(&property)?;
        self.values.get(id.0)
    }

    /// The value of `property` originating from `run`, if any.
    pub fn property_value(&self, property: PropertyId, run: RunId) -> Option<&Value> {
        let id = self.properties.get(property.0)?.values.get(&run)?;
        self.values.get(id.0)
    }

    /// Counts of (instruments, runs, properties, values).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.instruments.len(),
            self.runs.len(),
            self.properties.len(),
            self.values.len(),
        )
    }
}

fn invalid_reference(entity: &'static str, id: usize) -> GraphError {
    GraphError::InvalidReference { entity, id }
}
