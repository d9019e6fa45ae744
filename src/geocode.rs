use std::{
    thread,
    time::{Duration, Instant},
};

use log::debug;
use serde::Deserialize;
use ureq::{Agent, AgentBuilder};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// A place the geocoder pinned down.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// Display address as reported by the service.
    pub address: String,
}

/// Outcome of a single geocoding attempt.
///
/// `NotFound` and `Failed` are ordinary outcomes, not errors; what to do with
/// a miss is the caller's decision. No retries happen at this layer.
#[derive(Debug)]
pub enum Lookup {
    Found(Location),
    NotFound,
    /// Network or service trouble; carries a description for the logs.
    Failed(String),
}

/// One external "query string to coordinates" capability.
pub trait Geocoder {
    fn lookup(&mut self, query: &str) -> Lookup;
}

/// Client for the Nominatim search endpoint.
pub struct Nominatim {
    agent: Agent,
    base: String,
}

impl Nominatim {
    pub fn new(user_agent: &str) -> Nominatim {
        let agent = AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build();

        Nominatim {
            agent,
            base: NOMINATIM_URL.to_string(),
        }
    }

    /// Point the client at another Nominatim instance.
    pub fn with_base_url(mut self, base: &str) -> Nominatim {
        self.base = base.trim_end_matches('/').to_string();
        self
    }
}

impl Geocoder for Nominatim {
    fn lookup(&mut self, query: &str) -> Lookup {
        debug!("geocoding {query:?}");

        let response = self
            .agent
            .get(&format!("{}/search", self.base))
            .query("q", query)
            .query("format", "jsonv2")
            .query("limit", "1")
            .call();

        match response {
            Ok(response) => match response.into_json::<Vec<Hit>>() {
                Ok(hits) => classify(hits),
                Err(e) => Lookup::Failed(format!("bad response body: {e}")),
            },
            Err(e) => Lookup::Failed(e.to_string()),
        }
    }
}

// Nominatim sends coordinates as strings
#[derive(Deserialize)]
struct Hit {
    lat: String,
    lon: String,
    display_name: String,
}

fn classify(hits: Vec<Hit>) -> Lookup {
    let hit = match hits.into_iter().next() {
        Some(x) => x,
        None => return Lookup::NotFound,
    };

    let (lat, lon) = match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
        (Ok(lat), Ok(lon)) => (lat, lon),
        _ => {
            return Lookup::Failed(format!(
                "unparsable coordinates: {:?} {:?}",
                hit.lat, hit.lon
            ))
        }
    };

    // a hit outside the valid range is no more usable than no hit at all
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Lookup::NotFound;
    }

    Lookup::Found(Location {
        lat,
        lon,
        address: hit.display_name,
    })
}

/// Spaces out calls to the wrapped geocoder.
///
/// The interval is measured from the completion of the previous call; the
/// caller sleeps until it has elapsed, then the request goes out. Every call
/// through the instance counts, whatever its outcome. Nominatim's usage
/// policy caps clients at one request per second, hence the usual interval.
pub struct RateLimited<G> {
    inner: G,
    interval: Duration,
    last: Option<Instant>,
}

impl<G: Geocoder> RateLimited<G> {
    pub fn new(inner: G, interval: Duration) -> RateLimited<G> {
        RateLimited {
            inner,
            interval,
            last: None,
        }
    }
}

impl<G: Geocoder> Geocoder for RateLimited<G> {
    fn lookup(&mut self, query: &str) -> Lookup {
        if let Some(last) = self.last {
            let since = last.elapsed();
            if since < self.interval {
                thread::sleep(self.interval - since);
            }
        }

        let outcome = self.inner.lookup(query);
        self.last = Some(Instant::now());
        outcome
    }
}
