//! Client side of the HomeStock session protocol.
//!
//! `ApiClient` talks to the REST API over a cookie-carrying HTTP client,
//! `SessionHandle` tracks whether the user is signed in, and
//! `OptimisticController` keeps a local item mirror ahead of the server.

pub mod api;
pub mod error;
pub mod optimistic;
pub mod session;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use optimistic::{InventoryRemote, Mutation, OptimisticController};
pub use session::{SessionEvent, SessionHandle, SessionState};
