//! # tollgate-client
//!
//! Client side of the Tollgate credential lifecycle.
//!
//! - [`RefreshCoordinator`] holds the access credential in memory and makes
//!   sure at most one refresh call is in flight, with a rate limit on top
//! - [`AuthenticatedClient`] attaches the credential to requests and retries
//!   a rejected request exactly once after a refresh
//! - [`SessionEvent`]s tell the application when the session ends
//!
//! The refresh credential itself never reaches this crate's memory: it lives
//! in the HTTP client's cookie jar.
//!
//! ## Example
//!
//! ```ignore
//! use tollgate_client::{AuthenticatedClient, ClientConfig, SessionEvent};
//!
//! let client = AuthenticatedClient::new(ClientConfig::new(base_url))?;
//! client.login("alice", "secret").await?;
//!
//! let mut events = client.coordinator().subscribe();
//! let response = client.send(client.request(Method::GET, "/api/me")?).await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod interceptor;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use coordinator::RefreshCoordinator;
pub use credential::AccessCredential;
pub use error::ClientError;
pub use interceptor::AuthenticatedClient;
pub use session::SessionEvent;
pub use transport::{HttpRefreshTransport, RefreshTransport, TokenResponse};
