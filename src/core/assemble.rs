// RawSleuth - core/assemble.rs
//
// Turns the aggregated entries of one pass into Property/Value entities of
// a run.

use crate::core::graph::{EntityGraph, PropertyKey, RunId};
use crate::core::model::{Aggregate, Cv, PassKind};
use crate::core::table::TableKey;
use crate::util::constants::SECTION_JOINER;
use crate::util::error::GraphError;

/// Display name of an entry: `section - name`, or just `name` outside any
/// section.
pub fn property_name(key: &TableKey) -> String {
    if key.section.is_empty() {
        key.name.clone()
    } else {
        format!("{}{SECTION_JOINER}{}", key.section, key.name)
    }
}

/// Add one value per aggregated entry to `run`.
///
/// The property name doubles as its accession. Returns the number of values
/// recorded.
pub fn add_pass_values<'a, I>(
    graph: &mut EntityGraph,
    run: RunId,
    pass: PassKind,
    entries: I,
    cv: &Cv,
) -> Result<usize, GraphError>
where
    I: IntoIterator<Item = (&'a TableKey, &'a Aggregate)>,
{
    let mut added = 0;
    for (key, aggregate) in entries {
        let name = property_name(key);
        let property = graph.find_or_create_property(PropertyKey {
            name: &name,
            kind: pass.type_tag(),
            accession: &name,
            cv,
            numeric: aggregate.is_numeric(),
        })?;
        graph.add_value(property, run, aggregate.clone())?;
        added += 1;
    }

    tracing::debug!(pass = %pass, values = added, "Pass values added to run");
    Ok(added)
}
