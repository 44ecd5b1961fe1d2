//! Database access layer.
//!
//! - `credentials`: private key loading and login JWT signing
//! - `connector`: the session and connection factory traits
//! - `snowflake`: REST session client implementing those traits
//! - `browser`: interactive SSO for browser authentication
//! - `manager`: lifecycle of the single shared session

pub mod browser;
pub mod connector;
pub mod credentials;
pub mod manager;
pub mod snowflake;

pub use connector::{Connector, Session, SessionHandle};
pub use credentials::{Credential, PrivateKey, load_credential, load_private_key};
pub use manager::{
    ConnectionManager, ConnectionStatus, DEFAULT_CHECK_INTERVAL, DEFAULT_REFRESH_INTERVAL,
};
pub use snowflake::{SnowflakeConnector, SnowflakeSession};
