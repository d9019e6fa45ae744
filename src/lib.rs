//! A durable name → coordinates cache fed by rate-limited geocoder lookups,
//! ranked by distance from wherever you happen to be.

pub mod error;
pub mod export;
pub mod geocode;
pub mod populate;
pub mod rank;
pub mod store;

pub use error::Error;
pub use export::{export, Entry};
pub use geocode::{Geocoder, Location, Lookup, Nominatim, RateLimited};
pub use populate::{populate, Summary};
pub use rank::{rank, Ranked};
pub use store::{Record, Store};
