//! Provider records shared by the orchestration core and the HTTP client.
//!
//! DigitalOcean returns far more fields than the lifecycle needs. The typed
//! structs here expose the handful of fields the core reads and keep every
//! other field in a flattened map, so a droplet record round-trips through
//! the inventory unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw provider identifier.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw provider identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Provider-assigned droplet identifier.
    DropletId
);
numeric_id!(
    /// Handle of an asynchronous provider action.
    ActionId
);
numeric_id!(
    /// Provider-assigned SSH key identifier.
    KeyId
);

/// Identifier of a catalogue resource. Images carry numeric ids; other
/// collections may use strings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// Numeric identifier.
    Number(u64),
    /// Textual identifier.
    Text(String),
}

impl ResourceId {
    /// Returns true when the textual form of the id equals `candidate`.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Number(value) => value.to_string() == candidate,
            Self::Text(value) => value == candidate,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(formatter, "{value}"),
            Self::Text(value) => formatter.write_str(value),
        }
    }
}

/// An image, size or region as listed by the provider.
///
/// Sizes have neither id nor name and regions have no id, so every field is
/// optional on the wire.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Resource {
    /// Provider-assigned identifier.
    #[serde(default)]
    pub id: Option<ResourceId>,
    /// Human-readable label.
    #[serde(default)]
    pub name: Option<String>,
    /// Stable machine label.
    #[serde(default)]
    pub slug: Option<String>,
}

impl Resource {
    /// Returns the value sent to the provider when this resource is used in
    /// a create request: the slug, or the id for slug-less images such as
    /// private snapshots.
    #[must_use]
    pub fn canonical_slug(&self) -> Option<String> {
        self.slug
            .clone()
            .or_else(|| self.id.as_ref().map(ToString::to_string))
    }
}

/// SSH key registered with the provider account.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshKey {
    /// Provider-assigned identifier.
    pub id: KeyId,
    /// Label used for idempotent lookup.
    pub name: String,
    /// Key fingerprint as reported by the provider.
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Public key material.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Progress of an asynchronous provider action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ActionStatus {
    /// The action finished successfully.
    #[serde(rename = "completed")]
    Completed,
    /// The provider gave up on the action.
    #[serde(rename = "errored")]
    Errored,
    /// The action is still running.
    #[serde(rename = "in-progress")]
    InProgress,
    /// Any other status; treated as not yet complete.
    #[serde(other, rename = "pending")]
    Pending,
}

/// Action record returned by the actions endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRecord {
    /// Action handle.
    pub id: ActionId,
    /// Current status.
    pub status: ActionStatus,
    /// Action type, for example `power_on`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Size reference embedded in a droplet record.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SizeRef {
    /// Size slug, for example `512mb`.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// One IPv4 network attached to a droplet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkV4 {
    /// Assigned address.
    pub ip_address: String,
    /// Network type (`public` or `private`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Networks attached to a droplet.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Networks {
    /// IPv4 networks in provider order.
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Canonical droplet record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Droplet {
    /// Provider-assigned identifier.
    pub id: DropletId,
    /// Droplet name.
    pub name: String,
    /// Live status (`new`, `active`, `off`, `archive`).
    pub status: String,
    /// Embedded size object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeRef>,
    /// Size slug as a top-level field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_slug: Option<String>,
    /// Attached networks.
    #[serde(default)]
    pub networks: Networks,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Droplet {
    /// Builds a droplet record carrying only the fields the core reads.
    #[must_use]
    pub fn new(id: DropletId, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: status.into(),
            size: None,
            size_slug: None,
            networks: Networks::default(),
            extra: Map::new(),
        }
    }

    /// Sets the size slug on both the embedded size and the top-level field.
    #[must_use]
    pub fn with_size(mut self, slug: impl Into<String>) -> Self {
        let size_slug: String = slug.into();
        self.size = Some(SizeRef {
            slug: Some(size_slug.clone()),
            extra: Map::new(),
        });
        self.size_slug = Some(size_slug);
        self
    }

    /// Appends an IPv4 network.
    #[must_use]
    pub fn with_ipv4(mut self, address: impl Into<String>) -> Self {
        self.networks.v4.push(NetworkV4 {
            ip_address: address.into(),
            kind: Some(String::from("public")),
            extra: Map::new(),
        });
        self
    }

    /// Returns true when the provider reports the droplet as powered off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.status == "off"
    }

    /// Address of the first IPv4 network entry.
    #[must_use]
    pub fn first_ipv4(&self) -> Option<&str> {
        self.networks.v4.first().map(|net| net.ip_address.as_str())
    }

    /// Current size slug, preferring the embedded size object.
    #[must_use]
    pub fn current_size_slug(&self) -> Option<&str> {
        self.size
            .as_ref()
            .and_then(|size| size.slug.as_deref())
            .or(self.size_slug.as_deref())
    }

    /// Returns a provider field that has no typed accessor.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
