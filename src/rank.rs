use geo::{GeodesicDistance, Point};
use log::debug;

use crate::{
    error::Error,
    geocode::{Geocoder, Lookup},
    store::Store,
};

const METERS_PER_MILE: f64 = 1609.344;

/// A stored place and its distance from the query point.
#[derive(Clone, Debug, PartialEq)]
pub struct Ranked {
    pub name: String,
    pub miles: f64,
}

/// Geocodes `address` and returns every resolved place in the store ordered
/// nearest-first.
///
/// The query address is looked up fresh every time, never cached. Distances
/// are geodesic (ellipsoidal) miles. Ties keep store order; an empty store is
/// an empty ranking, not an error. `on_progress` follows the populate
/// contract: once per stored place, `false` cancels.
pub fn rank<G: Geocoder>(
    store: &Store,
    geocoder: &mut G,
    address: &str,
    mut on_progress: impl FnMut(f64, &str) -> bool,
) -> Result<Vec<Ranked>, Error> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::EmptyAddress);
    }

    let here = match geocoder.lookup(address) {
        Lookup::Found(x) => Point::new(x.lon, x.lat),
        Lookup::NotFound => return Err(Error::AddressNotFound(address.to_string())),
        Lookup::Failed(cause) => {
            debug!("query lookup failed: {cause}");
            return Err(Error::AddressNotFound(address.to_string()));
        }
    };

    let places = store.resolved()?;
    let total = places.len();
    let mut ranked = Vec::with_capacity(total);

    for (i, (name, lat, lon)) in places.into_iter().enumerate() {
        let miles = here.geodesic_distance(&Point::new(lon, lat)) / METERS_PER_MILE;
        if !on_progress((i + 1) as f64 / total as f64, &name) {
            return Err(Error::Cancelled);
        }
        ranked.push(Ranked { name, miles });
    }

    // stable, so equal distances keep store order
    ranked.sort_by(|a, b| a.miles.total_cmp(&b.miles));
    Ok(ranked)
}
