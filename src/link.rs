//! Relationship slots: a cross-reference is stored either as bare
//! identifiers or as resolved handles to records owned by the object cache.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;

use crate::cache::Dereference;
use crate::error::CycError;
use crate::identity::Identity;
use crate::record::Record;
use crate::schema::Cardinality;

/// One optional target or an ordered list of targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Refs<T> {
    One(Option<T>),
    Many(Vec<T>),
}

impl<T> Refs<T> {
    pub fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::Single => Refs::One(None),
            Cardinality::Collection => Refs::Many(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Refs::One(target) => target.is_none(),
            Refs::Many(targets) => targets.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Refs::One(target) => usize::from(target.is_some()),
            Refs::Many(targets) => targets.len(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Refs::One(target) => target.as_slice().iter(),
            Refs::Many(targets) => targets.iter(),
        }
    }

    pub fn one(&self) -> Option<&T> {
        self.iter().next()
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Refs::One(target) => target.into_iter().collect(),
            Refs::Many(targets) => targets,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Refs<U> {
        match self {
            Refs::One(target) => Refs::One(target.as_ref().map(f)),
            Refs::Many(targets) => Refs::Many(targets.iter().map(&mut f).collect()),
        }
    }

    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<Refs<U>, E> {
        match self {
            Refs::One(target) => Ok(Refs::One(target.as_ref().map(f).transpose()?)),
            Refs::Many(targets) => Ok(Refs::Many(
                targets.iter().map(&mut f).collect::<Result<_, _>>()?,
            )),
        }
    }
}

/// A resolved target: the record handle plus the identity it was resolved
/// from, so the identifier view never depends on the record being alive.
#[derive(Debug, Clone)]
struct Target {
    identity: Option<Identity>,
    record: Weak<Record>,
}

impl Target {
    fn new(record: &Arc<Record>) -> Self {
        Self {
            identity: record.identity().cloned(),
            record: Arc::downgrade(record),
        }
    }
}

#[derive(Debug, Clone, Default)]
enum LinkState {
    #[default]
    Unset,
    Unresolved(Refs<Identity>),
    Resolved(Refs<Target>),
}

/// A relationship field of a record.
///
/// `ids` never performs I/O. `resolve` dereferences through the cache the
/// first time and keeps non-owning handles on the field afterwards, so later
/// reads of the same field do not go back to the cache. Handles whose cache
/// has since been dropped are dereferenced again from the kept identities.
pub struct Link {
    field: &'static str,
    cardinality: Cardinality,
    state: RwLock<LinkState>,
}

impl Link {
    pub(crate) fn new(field: &'static str, cardinality: Cardinality) -> Self {
        Self {
            field,
            cardinality,
            state: RwLock::new(LinkState::Unset),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.read(), LinkState::Resolved(_))
    }

    /// Identifier view. Resolved targets without an identity are left out.
    pub fn ids(&self) -> Refs<Identity> {
        match &*self.state.read() {
            LinkState::Unset => Refs::empty(self.cardinality),
            LinkState::Unresolved(ids) => ids.clone(),
            LinkState::Resolved(Refs::One(target)) => {
                Refs::One(target.as_ref().and_then(|target| target.identity.clone()))
            }
            LinkState::Resolved(Refs::Many(targets)) => Refs::Many(
                targets
                    .iter()
                    .filter_map(|target| target.identity.clone())
                    .collect(),
            ),
        }
    }

    /// Replaces whatever the field held with bare identifiers.
    pub fn set_ids(&self, ids: Refs<Identity>) {
        *self.state.write() = LinkState::Unresolved(ids);
    }

    /// Replaces whatever the field held with resolved records.
    pub fn set_resolved(&self, records: &Refs<Arc<Record>>) {
        *self.state.write() = LinkState::Resolved(records.map(Target::new));
    }

    /// Resolved view. Targets are looked up with
    /// [`Dereference::dereference_link`], which an [`ObjectCache`] answers
    /// from any detail level it already holds before fetching with none.
    ///
    /// [`ObjectCache`]: crate::cache::ObjectCache
    pub fn resolve(&self, resolver: &dyn Dereference) -> Result<Refs<Arc<Record>>, CycError> {
        let ids = match &*self.state.read() {
            LinkState::Unset => return Ok(Refs::empty(self.cardinality)),
            LinkState::Unresolved(ids) => ids.clone(),
            LinkState::Resolved(targets) => match upgrade(targets) {
                Some(records) => return Ok(records),
                None => self.identities(targets)?,
            },
        };

        let records = ids.try_map(|id| resolver.dereference_link(id))?;

        let mut state = self.state.write();
        // Keep a concurrent writer's value if it replaced the ids meanwhile.
        let replace = match &*state {
            LinkState::Unset => false,
            LinkState::Unresolved(current) => *current == ids,
            LinkState::Resolved(targets) => upgrade(targets).is_none(),
        };
        if replace {
            *state = LinkState::Resolved(records.map(Target::new));
        }
        Ok(records)
    }

    fn identities(&self, targets: &Refs<Target>) -> Result<Refs<Identity>, CycError> {
        targets.try_map(|target| {
            target
                .identity
                .clone()
                .ok_or_else(|| CycError::DanglingReference {
                    field: self.field.to_string(),
                })
        })
    }
}

fn upgrade(targets: &Refs<Target>) -> Option<Refs<Arc<Record>>> {
    targets
        .try_map(|target| target.record.upgrade().ok_or(()))
        .ok()
}

impl Clone for Link {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            cardinality: self.cardinality,
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("field", &self.field)
            .field("resolved", &self.is_resolved())
            .field("ids", &self.ids())
            .finish()
    }
}

impl Serialize for Link {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ids().serialize(serializer)
    }
}
