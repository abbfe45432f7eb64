pub mod project;

use crate::middlewares::auth::Auth;
use crate::state::State;

/// Abstraction over the notion of a query.
///
/// Implemented on small params structs; handlers call `fetch` on them to
/// retrieve the relevant model instance. This is where the raw SQL lives.
#[async_trait]
pub trait Query {
    /// The type returned when the query resolves.
    type Resolve;
    /// Error type returned if the query fails.
    type Error;
    /// Fetches the model instance from underlying storage.
    async fn fetch(self, auth: Option<&Auth>, state: &State) -> Result<Self::Resolve, Self::Error>;
}

/// Abstraction over the notion of persisting data.
///
/// Implemented on insertable/updatable items. Often these carry a subset of
/// the model's fields (no id yet; the DB assigns one).
#[async_trait]
pub trait Persist {
    /// The return type used to indicate a successful attempt to persist the item.
    type Ret;
    /// Error type returned from unsuccessful attempts to persist the item.
    type Error;
    /// Persist the value to the database held by `state`.
    async fn persist(self, auth: Option<&Auth>, state: &State) -> Result<Self::Ret, Self::Error>;
}
