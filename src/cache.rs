//! Dereferencing cache: identity + detail → shared record.
//!
//! The cache owns every record it resolves. Relationship fields only keep
//! weak handles into it, so reference cycles between records never leak.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::CycError;
use crate::fetch::DocumentFetcher;
use crate::identity::{Detail, Identity};
use crate::record::Record;
use crate::xml::{Document, Node};

const ERROR_ELEMENT: &str = "Error";

/// Turns an identity into a shared record.
pub trait Dereference: Send + Sync {
    fn dereference(&self, identity: &Identity, detail: Option<Detail>)
    -> Result<Arc<Record>, CycError>;

    /// Target of a relationship field. References carry no detail level.
    fn dereference_link(&self, identity: &Identity) -> Result<Arc<Record>, CycError> {
        self.dereference(identity, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: Identity,
    pub detail: Option<Detail>,
}

type Entry = Arc<OnceCell<Arc<Record>>>;

/// Process-lifetime object cache.
///
/// Entries are never evicted. Each key is loaded at most once at a time:
/// concurrent callers for the same key wait on the first load, callers for
/// other keys proceed independently. A failed load leaves the key empty so a
/// later call fetches again.
pub struct ObjectCache<F> {
    fetcher: F,
    entries: DashMap<CacheKey, Entry>,
}

impl<F: DocumentFetcher> ObjectCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            entries: DashMap::new(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn resolve(&self, identity: &Identity, detail: Option<Detail>) -> Result<Arc<Record>, CycError> {
        let key = CacheKey {
            identity: identity.clone(),
            detail,
        };
        // Clone the slot out so the shard lock is released before any I/O.
        let entry: Entry = self.entries.entry(key).or_default().clone();

        if let Some(record) = entry.get() {
            debug!(id = %identity, detail = ?detail, "cache hit");
            return Ok(Arc::clone(record));
        }

        let record = entry.get_or_try_init(|| self.load(identity, detail))?;
        Ok(Arc::clone(record))
    }

    /// Cached record for the key, without fetching.
    pub fn get(&self, identity: &Identity, detail: Option<Detail>) -> Option<Arc<Record>> {
        let key = CacheKey {
            identity: identity.clone(),
            detail,
        };
        self.entries
            .get(&key)
            .and_then(|entry| entry.get().cloned())
    }

    /// Any loaded record for the identity, preferring the detail-less entry.
    pub fn get_any(&self, identity: &Identity) -> Option<Arc<Record>> {
        [None, Some(Detail::Full), Some(Detail::Low), Some(Detail::None)]
            .into_iter()
            .find_map(|detail| self.get(identity, detail))
    }

    pub fn contains(&self, identity: &Identity, detail: Option<Detail>) -> bool {
        self.get(identity, detail).is_some()
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, identity: &Identity, detail: Option<Detail>) -> Result<Arc<Record>, CycError> {
        debug!(id = %identity, detail = ?detail, "cache miss");
        info!(id = %identity, detail = ?detail, "fetching BioCyc object");
        let document = self.fetcher.fetch_document(identity, detail)?;
        let node = find_object(&document, identity).ok_or_else(|| CycError::ObjectNotFound {
            identity: identity.to_string(),
            detail: detail.map(|detail| detail.to_string()),
        })?;
        Ok(Arc::new(Record::parse(node)?))
    }
}

impl<F: DocumentFetcher> Dereference for ObjectCache<F> {
    fn dereference(
        &self,
        identity: &Identity,
        detail: Option<Detail>,
    ) -> Result<Arc<Record>, CycError> {
        self.resolve(identity, detail)
    }

    fn dereference_link(&self, identity: &Identity) -> Result<Arc<Record>, CycError> {
        match self.get_any(identity) {
            Some(record) => {
                debug!(id = %identity, "link target already loaded");
                Ok(record)
            }
            None => self.resolve(identity, None),
        }
    }
}

/// First top-level element of a `ptools-xml` document that names `identity`.
///
/// An `Error` element in that position means the server has no such object.
pub fn find_object<'a>(document: &'a Document, identity: &Identity) -> Option<Node<'a>> {
    let node = document.root().child_elements().find(|node| {
        match (node.attribute("orgid"), node.attribute("frameid")) {
            (Some(orgid), Some(frameid)) => identity.matches(orgid, frameid),
            _ => false,
        }
    })?;
    (node.name() != Some(ERROR_ELEMENT)).then_some(node)
}

impl Identity {
    /// Resolves this identity through `resolver`, typically an [`ObjectCache`].
    pub fn resolve(
        &self,
        resolver: &dyn Dereference,
        detail: Option<Detail>,
    ) -> Result<Arc<Record>, CycError> {
        resolver.dereference(self, detail)
    }
}
