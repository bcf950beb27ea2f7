//! Resolution of user-supplied identifiers against provider catalogues.

use std::fmt;

use crate::error::LifecycleError;
use crate::types::Resource;

/// Catalogue a candidate is resolved against.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKind {
    /// Distribution, application or snapshot images.
    Image,
    /// Droplet sizes.
    Size,
    /// Datacentre regions.
    Region,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Image => "image",
            Self::Size => "size",
            Self::Region => "region",
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum MatchKey {
    Id,
    Name,
    Slug,
}

const MATCH_ORDER: [MatchKey; 3] = [MatchKey::Id, MatchKey::Name, MatchKey::Slug];

impl MatchKey {
    fn matches(self, resource: &Resource, candidate: &str) -> bool {
        match self {
            Self::Id => resource.id.as_ref().is_some_and(|id| id.matches(candidate)),
            Self::Name => resource.name.as_deref() == Some(candidate),
            Self::Slug => resource.slug.as_deref() == Some(candidate),
        }
    }
}

/// Finds the resource identified by `candidate`.
///
/// The whole collection is searched by `id` first, then by `name`, then by
/// `slug`; the first hit wins, so an id match always beats a name match on
/// another entry.
///
/// # Errors
///
/// Returns [`LifecycleError::NoMatch`] when no field of any resource equals
/// the candidate.
pub fn resolve<'a>(
    collection: &'a [Resource],
    candidate: &str,
    kind: ResourceKind,
) -> Result<&'a Resource, LifecycleError> {
    MATCH_ORDER
        .iter()
        .find_map(|key| {
            collection
                .iter()
                .find(|resource| key.matches(resource, candidate))
        })
        .ok_or_else(|| LifecycleError::NoMatch {
            kind,
            candidate: candidate.to_owned(),
        })
}
