///! Static reference data for the Astma-Allergi Danmark pollen feed
///!
///! Maps the feed's numeric region and pollen identifiers to display names.

use std::collections::BTreeMap;

/// Regions reported by the feed (display name, feed id)
pub const KNOWN_REGIONS: &[(&str, u32)] = &[
    ("Øst for Storebælt", 48),
    ("Vest for Storebælt", 49),
];

/// Pollen and spore types reported by the feed (display name, feed id)
pub const KNOWN_POLLEN: &[(&str, u32)] = &[
    ("El", 1),
    ("Hassel", 2),
    ("Elm", 4),
    ("Birk", 7),
    ("Græs", 28),
    ("Bynke", 31),
    ("Alternaria", 44),
    ("Cladosporium", 45),
];

/// Region name -> region id
pub fn region_catalog() -> BTreeMap<&'static str, u32> {
    KNOWN_REGIONS.iter().copied().collect()
}

/// Pollen name -> pollen id
pub fn pollen_catalog() -> BTreeMap<&'static str, u32> {
    KNOWN_POLLEN.iter().copied().collect()
}

/// Id -> display name lookup for both regions and pollen types.
///
/// The built-in Danish catalog covers the real feed; [`Catalog::new`] accepts
/// any other id set with the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    regions: BTreeMap<u32, String>,
    pollen: BTreeMap<u32, String>,
}

impl Catalog {
    pub fn new<R, P, S1, S2>(regions: R, pollen: P) -> Self
    where
        R: IntoIterator<Item = (u32, S1)>,
        P: IntoIterator<Item = (u32, S2)>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            regions: regions.into_iter().map(|(id, name)| (id, name.into())).collect(),
            pollen: pollen.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }

    /// Catalog of the Danish feed
    pub fn danish() -> Self {
        Self::new(
            KNOWN_REGIONS.iter().map(|&(name, id)| (id, name)),
            KNOWN_POLLEN.iter().map(|&(name, id)| (id, name)),
        )
    }

    pub fn region_name(&self, id: u32) -> Option<&str> {
        self.regions.get(&id).map(String::as_str)
    }

    pub fn pollen_name(&self, id: u32) -> Option<&str> {
        self.pollen.get(&id).map(String::as_str)
    }

    /// All region ids, ascending
    pub fn region_ids(&self) -> Vec<u32> {
        self.regions.keys().copied().collect()
    }

    /// All pollen ids, ascending
    pub fn pollen_ids(&self) -> Vec<u32> {
        self.pollen.keys().copied().collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::danish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_id_catalogs() {
        let regions = region_catalog();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions["Øst for Storebælt"], 48);
        assert_eq!(regions["Vest for Storebælt"], 49);

        let pollen = pollen_catalog();
        assert_eq!(pollen.len(), 8);
        assert_eq!(pollen["Birk"], 7);
        assert_eq!(pollen["Græs"], 28);
    }

    #[test]
    fn test_danish_catalog_lookup() {
        let catalog = Catalog::danish();
        assert_eq!(catalog.region_name(49), Some("Vest for Storebælt"));
        assert_eq!(catalog.pollen_name(45), Some("Cladosporium"));
        assert_eq!(catalog.region_name(1), None);
        assert_eq!(catalog.pollen_ids(), vec![1, 2, 4, 7, 28, 31, 44, 45]);
    }

    #[test]
    fn test_custom_catalog() {
        let catalog = Catalog::new([(2, "East"), (1, "West")], [(10, "Birch")]);
        assert_eq!(catalog.region_ids(), vec![1, 2]);
        assert_eq!(catalog.pollen_name(10), Some("Birch"));
    }
}
