//! Travels - an in-memory HTTP data service for a travel-tracking domain.
//!
//! The service stores three entity kinds (users, locations, visits) and
//! answers point lookups, a user's filtered visit history, a location's
//! filtered average rating, and entity create/update. Everything lives in
//! memory: a process restart starts from the bulk-loaded archive again.
//!
//! # Architecture
//!
//! [`TravelDb`] is the storage-and-query engine: dense id-addressed primary
//! tables, an email uniqueness map, and per-user / per-location visit
//! indices ordered by timestamp, all behind one reader/writer lock. Records
//! carry their canonical JSON encoding so reads answer from cache.
//!
//! The [`loader`] fills the engine from a zip archive before the server in
//! [`server`] starts accepting traffic. The HTTP layer is a thin dispatch
//! onto engine operations; all domain rules live below it.
//!
//! # Example
//!
//! ```
//! use travels::{TravelDb, User, Gender, UserVisitsQuery};
//!
//! let db = TravelDb::new();
//! db.create_user(User {
//!     id: 1,
//!     first_name: "First".into(),
//!     last_name: "User".into(),
//!     email: "foo@bar.com".into(),
//!     gender: Gender::Male,
//!     birth_date: 100_000,
//! })?;
//! let visits = db.get_user_visits(1, &UserVisitsQuery::default())?;
//! assert!(visits.is_empty());
//! # Ok::<(), travels::Error>(())
//! ```

mod codec;
mod error;
mod index;
pub mod loader;
mod model;
#[cfg(feature = "http-server")]
pub mod server;
mod table;
mod travels;

pub use codec::{
    parse_location_patch, parse_user_patch, parse_visit_patch, LocationPatch, UserPatch,
    VisitPatch,
};
pub use error::{Error, Result};
pub use model::{
    EntityId, Gender, Location, LocationAvgQuery, User, UserVisit, UserVisitsQuery,
    UserVisitsResult, Visit,
};
pub use travels::{BulkOutcome, StoreStats, TravelDb};
