use std::net::{Ipv4Addr, SocketAddrV4};

use uuid::Uuid;

/// All error types that can occur when interacting with Elgato lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device did not answer, or the connection failed mid-request.
    #[error("light {address} unreachable during {action}: {source}")]
    Unreachable {
        address: SocketAddrV4,
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered with a non-success HTTP status.
    #[error("light {address} rejected {action} with status {status}")]
    Rejected {
        address: SocketAddrV4,
        action: String,
        status: u16,
    },

    /// The device answered with a body that could not be understood.
    #[error("malformed response from {address}: {reason}")]
    MalformedResponse { address: SocketAddrV4, reason: String },

    /// A transition or command was rejected before any network I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The device's product cannot perform the requested operation.
    #[error("light {address} ({product}) does not support {operation}")]
    Unsupported {
        address: SocketAddrV4,
        product: String,
        operation: String,
    },

    /// Failed to serialize a request document.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// The shared HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(reqwest::Error),

    /// A color or scene step could not be parsed from text.
    #[error("invalid color or scene step: {0}")]
    InvalidStep(String),

    /// The light with the given ID is not part of the room.
    #[error("light {light_id:?} not found in room {room:?}")]
    LightNotFound { room: String, light_id: Uuid },

    /// No light in the room lives at the given address.
    #[error("no light with ip {0} in room")]
    DeviceNotFound(Ipv4Addr),

    /// The provided address is invalid (e.g., already in use).
    #[error("light at {address} is invalid because the address is {reason}")]
    InvalidAddress {
        address: SocketAddrV4,
        reason: String,
    },

    /// Discovery was requested on a room that has no discovery source.
    #[error("room {0} has no discovery source")]
    NoDiscovery(String),
}

impl Error {
    /// Create a new unreachable error
    pub fn unreachable(address: SocketAddrV4, action: &str, source: reqwest::Error) -> Self {
        Error::Unreachable {
            address,
            action: action.to_string(),
            source,
        }
    }

    /// Create a new rejected error
    pub fn rejected(address: SocketAddrV4, action: &str, status: u16) -> Self {
        Error::Rejected {
            address,
            action: action.to_string(),
            status,
        }
    }

    /// Create a new malformed response error
    pub fn malformed(address: SocketAddrV4, reason: impl ToString) -> Self {
        Error::MalformedResponse {
            address,
            reason: reason.to_string(),
        }
    }

    /// Create a new invalid request error
    pub fn invalid_request(reason: &str) -> Self {
        Error::InvalidRequest(reason.to_string())
    }

    /// Create a new invalid step error
    pub fn invalid_step(reason: impl ToString) -> Self {
        Error::InvalidStep(reason.to_string())
    }

    /// Create a new unsupported operation error
    pub fn unsupported(address: SocketAddrV4, product: &str, operation: &str) -> Self {
        Error::Unsupported {
            address,
            product: product.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a new light not found error
    pub fn light_not_found(room: &str, light_id: &Uuid) -> Self {
        Error::LightNotFound {
            room: room.to_string(),
            light_id: *light_id,
        }
    }

    /// Create a new invalid address error
    pub fn invalid_address(address: &SocketAddrV4, reason: &str) -> Self {
        Error::InvalidAddress {
            address: *address,
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from talking to a device, as opposed to a
    /// request that never left the process.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Error::Unreachable { .. }
                | Error::Rejected { .. }
                | Error::MalformedResponse { .. }
                | Error::Unsupported { .. }
        )
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
