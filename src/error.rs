use thiserror::Error;

/// Conditions that abort a run.
///
/// Lookup misses are not among them: a place the geocoder cannot resolve
/// becomes a sentinel row and the run moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// The ranking query address could not be geocoded.
    #[error("could not geocode address {0:?}")]
    AddressNotFound(String),

    #[error("no address given")]
    EmptyAddress,

    /// A progress callback asked to stop.
    #[error("cancelled")]
    Cancelled,

    /// Database failures are fatal: a silently dropped write would make an
    /// already-queried place look unattempted on the next run.
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}
