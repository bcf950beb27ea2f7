//! Response envelopes of the DigitalOcean v2 API.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{ActionId, ActionRecord, Droplet, SshKey};

#[derive(Debug, Deserialize)]
pub(super) struct DropletEnvelope {
    pub(super) droplet: Droplet,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateEnvelope {
    pub(super) droplet: Droplet,
    #[serde(default)]
    pub(super) links: CreateLinks,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CreateLinks {
    #[serde(default)]
    pub(super) actions: Vec<ActionLink>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActionLink {
    pub(super) id: ActionId,
}

/// Action responses; a `message` means the request was refused even when
/// the status code says otherwise.
#[derive(Debug, Deserialize)]
pub(super) struct ActionEnvelope {
    #[serde(default)]
    pub(super) action: Option<ActionRecord>,
    #[serde(default)]
    pub(super) message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct KeyEnvelope {
    pub(super) ssh_key: SshKey,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub(super) message: Option<String>,
}

/// One page of a collection. The items live under a collection-specific
/// key, so they are kept in the flattened map.
#[derive(Debug, Deserialize)]
pub(super) struct Page {
    #[serde(default)]
    pub(super) links: PageLinks,
    #[serde(flatten)]
    pub(super) body: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PageLinks {
    #[serde(default)]
    pub(super) pages: Option<Pages>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Pages {
    #[serde(default)]
    pub(super) next: Option<String>,
}

impl Page {
    pub(super) fn next(&self) -> Option<&str> {
        self.links
            .pages
            .as_ref()
            .and_then(|pages| pages.next.as_deref())
    }
}
