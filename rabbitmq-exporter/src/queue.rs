//! Queue records as returned by the RabbitMQ management API.

use serde::{Deserialize, Deserializer};

/// Queue argument marking an auto-expiring (consumer-scoped) queue.
pub const EXPIRES_ARGUMENT: &str = "x-expires";

/// A single entry of the `GET /api/queues` listing.
///
/// Only the fields exported as metrics are kept; everything else the broker
/// returns is ignored. Counters the broker omits (or reports as `null`, which
/// happens while a queue is still being declared) read as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueRecord {
    /// Queue name, unique within a virtual host.
    pub name: String,

    /// Total messages (ready + unacknowledged).
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: u64,

    /// Sum of message body sizes in bytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_bytes: u64,

    /// Messages ready for delivery.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages_ready: u64,

    /// Messages delivered but not yet acknowledged.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages_unacknowledged: u64,

    /// Number of attached consumers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumers: u64,

    /// Optional queue arguments (`x-expires`, `x-message-ttl`, ...).
    ///
    /// Kept as raw JSON; a value that is not an object has no arguments.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl QueueRecord {
    /// Create a record with the given name and all counters at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether this queue carries an expiry argument.
    ///
    /// Such queues are auto-generated per consumer and are not exported.
    pub fn is_ephemeral(&self) -> bool {
        self.arguments.get(EXPIRES_ARGUMENT).is_some()
    }
}

/// Parse a queue listing body.
///
/// The body must be a JSON array of objects.
pub fn parse_queue_listing(body: &[u8]) -> Result<Vec<QueueRecord>, serde_json::Error> {
    serde_json::from_slice(body)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
