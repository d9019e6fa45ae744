use serde::Serialize;

use crate::{error::Error, populate::query_for, store::Store};

/// One place as the static site consumes it, resolved or not.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: String,
    pub has_coordinates: bool,
}

/// Store state merged back into the input list, one entry per name in input
/// order. Names without a usable coordinate (sentinels, and names never
/// populated at all) get `has_coordinates: false` and the lookup query as a
/// fallback address.
pub fn export(store: &Store, names: &[String], region: &str) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::with_capacity(names.len());

    for name in names {
        let record = store.get(name)?;
        let located = record.and_then(|x| x.coords.map(|coords| (coords, x.address)));

        entries.push(match located {
            Some(((lat, lon), address)) => Entry {
                name: name.clone(),
                latitude: Some(lat),
                longitude: Some(lon),
                address: address.unwrap_or_else(|| query_for(name, region)),
                has_coordinates: true,
            },
            None => Entry {
                name: name.clone(),
                latitude: None,
                longitude: None,
                address: query_for(name, region),
                has_coordinates: false,
            },
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Record;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn keeps_input_order_and_flags_misses() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert(&Record::located("Senia", 21.31, -157.86, "75 N King St, Honolulu"))
            .unwrap();
        store.upsert(&Record::sentinel("Fook Lam")).unwrap();
        // "Azure" was never populated at all

        let entries = export(
            &store,
            &names(&["Fook Lam", "Senia", "Azure"]),
            "Honolulu, Hawaii",
        )
        .unwrap();

        let summary: Vec<(&str, bool)> = entries
            .iter()
            .map(|x| (x.name.as_str(), x.has_coordinates))
            .collect();
        assert_eq!(
            summary,
            vec![("Fook Lam", false), ("Senia", true), ("Azure", false)]
        );

        assert_eq!(entries[1].latitude, Some(21.31));
        assert_eq!(entries[1].address, "75 N King St, Honolulu");
        // misses fall back to the address we would have queried
        assert_eq!(entries[0].address, "Fook Lam, Honolulu, Hawaii");
        assert_eq!(entries[2].latitude, None);
    }

    #[test]
    fn serializes_the_site_shape() {
        let store = Store::open_in_memory().unwrap();
        store.upsert(&Record::sentinel("Fook Lam")).unwrap();

        let entries = export(&store, &names(&["Fook Lam"]), "Honolulu, Hawaii").unwrap();
        let json = serde_json::to_value(&entries).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{
                "name": "Fook Lam",
                "latitude": null,
                "longitude": null,
                "address": "Fook Lam, Honolulu, Hawaii",
                "has_coordinates": false,
            }])
        );
    }
}
