use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Transport failures of a device link.
///
/// Every variant is recoverable: the link reports `Faulted`, backs off and
/// opens a fresh socket.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Local bind address could not be resolved.
    #[error("failed to resolve local address {host:?}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// UDP socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Configured multicast group is not an IPv4 multicast address.
    #[error("invalid multicast group {0:?}")]
    InvalidMulticastGroup(String),

    /// Joining the multicast group failed.
    #[error("failed to join multicast group {group}: {source}")]
    Multicast {
        group: String,
        #[source]
        source: io::Error,
    },

    /// The socket reported a receive error.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// The link's sentence queue was closed.
    #[error("sentence queue closed")]
    QueueClosed,
}
