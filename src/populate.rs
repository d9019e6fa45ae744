use log::{debug, info, warn};

use crate::{
    error::Error,
    geocode::{Geocoder, Lookup},
    store::{Record, Store},
};

/// What a populate run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub skipped: usize,
    pub found: usize,
    pub failed: usize,
}

/// Fills the store with coordinates for every name not already in it.
///
/// Names with a record, resolved or sentinel, are skipped without touching
/// the geocoder, so each place costs at most one external lookup over the
/// lifetime of the store. Misses and failures are written back as sentinels
/// and not queried again; purge the row to retry one. Store failures abort
/// the run, lookup failures never do.
///
/// `on_progress` runs exactly once per input name, skipped or not, with the
/// fraction of the list handled so far and a short message. Returning `false`
/// stops the run before the next name; everything already written stays.
pub fn populate<G: Geocoder>(
    store: &Store,
    geocoder: &mut G,
    names: &[String],
    region: &str,
    mut on_progress: impl FnMut(f64, &str) -> bool,
) -> Result<Summary, Error> {
    let mut summary = Summary {
        total: names.len(),
        ..Summary::default()
    };

    for (i, name) in names.iter().enumerate() {
        let message;

        if store.contains(name)? {
            summary.skipped += 1;
            debug!("{name}: already in store");
            message = format!("{name}: cached");
        } else {
            let query = query_for(name, region);
            match geocoder.lookup(&query) {
                Lookup::Found(x) => {
                    store.upsert(&Record::located(name, x.lat, x.lon, &x.address))?;
                    summary.found += 1;
                    debug!("{name}: {}, {}", x.lat, x.lon);
                    message = format!("{name}: found");
                }
                Lookup::NotFound => {
                    store.upsert(&Record::sentinel(name))?;
                    summary.failed += 1;
                    info!("{name}: no match for {query:?}");
                    message = format!("{name}: no match");
                }
                Lookup::Failed(cause) => {
                    store.upsert(&Record::sentinel(name))?;
                    summary.failed += 1;
                    warn!("{name}: lookup failed: {cause}");
                    message = format!("{name}: lookup failed");
                }
            }
        }

        let fraction = (i + 1) as f64 / names.len() as f64;
        if !on_progress(fraction, &message) {
            return Err(Error::Cancelled);
        }
    }

    Ok(summary)
}

/// "Liliha Bakery" + "Honolulu, Hawaii" → "Liliha Bakery, Honolulu, Hawaii"
pub fn query_for(name: &str, region: &str) -> String {
    if region.is_empty() {
        name.to_string()
    } else {
        format!("{name}, {region}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::geocode::Location;

    /// Scripted geocoder: names in `known` resolve, everything else misses.
    /// Remembers every query it was asked.
    struct Fake {
        known: HashMap<String, (f64, f64)>,
        calls: Vec<String>,
    }

    impl Fake {
        fn new(known: &[(&str, f64, f64)]) -> Fake {
            Fake {
                known: known
                    .iter()
                    .map(|(name, lat, lon)| (name.to_string(), (*lat, *lon)))
                    .collect(),
                calls: Vec::new(),
            }
        }
    }

    impl Geocoder for Fake {
        fn lookup(&mut self, query: &str) -> Lookup {
            self.calls.push(query.to_string());
            match self.known.get(query) {
                Some(&(lat, lon)) => Lookup::Found(Location {
                    lat,
                    lon,
                    address: format!("{query} (exact)"),
                }),
                None => Lookup::NotFound,
            }
        }
    }

    struct Broken;

    impl Geocoder for Broken {
        fn lookup(&mut self, _query: &str) -> Lookup {
            Lookup::Failed("connection refused".to_string())
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn writes_hits_and_misses() {
        let store = Store::open_in_memory().unwrap();
        let mut geocoder = Fake::new(&[("Senia, Honolulu, Hawaii", 21.31, -157.86)]);

        let summary = populate(
            &store,
            &mut geocoder,
            &names(&["Senia", "Fook Lam"]),
            "Honolulu, Hawaii",
            |_, _| true,
        )
        .unwrap();

        assert_eq!(
            summary,
            Summary {
                total: 2,
                skipped: 0,
                found: 1,
                failed: 1
            }
        );
        // the miss is a sentinel row, not a gap
        assert!(store.contains("Fook Lam").unwrap());
        assert_eq!(
            store.resolved().unwrap(),
            vec![("Senia".to_string(), 21.31, -157.86)]
        );
    }

    #[test]
    fn region_suffix_goes_on_the_query() {
        let store = Store::open_in_memory().unwrap();
        let mut geocoder = Fake::new(&[]);

        populate(
            &store,
            &mut geocoder,
            &names(&["Liliha Bakery"]),
            "Honolulu, Hawaii",
            |_, _| true,
        )
        .unwrap();

        assert_eq!(geocoder.calls, vec!["Liliha Bakery, Honolulu, Hawaii"]);
    }

    #[test]
    fn known_names_are_never_looked_up_again() {
        let store = Store::open_in_memory().unwrap();
        store.upsert(&Record::sentinel("Fook Lam")).unwrap();
        store
            .upsert(&Record::located("Senia", 21.31, -157.86, "75 N King St"))
            .unwrap();

        let mut geocoder = Fake::new(&[]);
        let summary = populate(
            &store,
            &mut geocoder,
            &names(&["Senia", "Fook Lam"]),
            "Honolulu, Hawaii",
            |_, _| true,
        )
        .unwrap();

        assert!(geocoder.calls.is_empty());
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn rerun_changes_nothing() {
        let store = Store::open_in_memory().unwrap();
        let list = names(&["Senia", "Fook Lam"]);

        let mut first = Fake::new(&[("Senia, Honolulu, Hawaii", 21.31, -157.86)]);
        populate(&store, &mut first, &list, "Honolulu, Hawaii", |_, _| true).unwrap();
        let before = (store.resolved().unwrap(), store.counts().unwrap());

        let mut second = Fake::new(&[("Senia, Honolulu, Hawaii", 21.31, -157.86)]);
        populate(&store, &mut second, &list, "Honolulu, Hawaii", |_, _| true).unwrap();

        assert!(second.calls.is_empty());
        assert_eq!((store.resolved().unwrap(), store.counts().unwrap()), before);
    }

    #[test]
    fn progress_runs_once_per_name_and_reaches_one() {
        let store = Store::open_in_memory().unwrap();
        let mut geocoder = Fake::new(&[]);
        let mut fractions = Vec::new();

        populate(
            &store,
            &mut geocoder,
            &names(&["a", "b", "c"]),
            "",
            |fraction, _| {
                fractions.push(fraction);
                true
            },
        )
        .unwrap();

        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.last(), Some(&1.0));
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        let mut geocoder = Fake::new(&[]);
        let mut called = 0;

        let summary = populate(&store, &mut geocoder, &[], "", |_, _| {
            called += 1;
            true
        })
        .unwrap();

        assert_eq!(summary, Summary::default());
        assert_eq!(called, 0);
    }

    #[test]
    fn failures_become_sentinels_and_the_run_goes_on() {
        let store = Store::open_in_memory().unwrap();

        let summary = populate(
            &store,
            &mut Broken,
            &names(&["Senia", "Fook Lam"]),
            "Honolulu, Hawaii",
            |_, _| true,
        )
        .unwrap();

        assert_eq!(summary.failed, 2);
        assert!(store.contains("Senia").unwrap());
        assert!(store.contains("Fook Lam").unwrap());
        assert!(store.resolved().unwrap().is_empty());
    }

    #[test]
    fn callback_can_cancel() {
        let store = Store::open_in_memory().unwrap();
        let mut geocoder = Fake::new(&[]);

        let result = populate(
            &store,
            &mut geocoder,
            &names(&["a", "b", "c"]),
            "",
            |_, _| false,
        );

        assert!(matches!(result, Err(Error::Cancelled)));
        // the first name was handled and persisted before the stop
        assert!(store.contains("a").unwrap());
        assert!(!store.contains("b").unwrap());
    }
}
