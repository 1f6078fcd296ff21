use crate::error::Robd2Error;
use robd2_schemas::{altitude::AltitudeSpec, file_formats::SpecTableFile};
use std::{fs, path::Path};

/// Reference O2 targets, 0 to 34,000 ft.
const REFERENCE_SPECS: [AltitudeSpec; 12] = [
    AltitudeSpec::new(0, 21.00, 20.9, 21.1),
    AltitudeSpec::new(5000, 17.27, 17.0, 17.5),
    AltitudeSpec::new(10000, 14.05, 13.8, 14.3),
    AltitudeSpec::new(13000, 12.34, 12.2, 12.5),
    AltitudeSpec::new(15000, 11.28, 11.1, 11.4),
    AltitudeSpec::new(18000, 9.81, 9.66, 10.0),
    AltitudeSpec::new(20000, 8.91, 8.76, 9.06),
    AltitudeSpec::new(22000, 8.06, 7.9, 8.2),
    AltitudeSpec::new(25000, 6.89, 6.74, 7.05),
    AltitudeSpec::new(28000, 5.86, 5.73, 6.0),
    AltitudeSpec::new(30000, 5.22, 5.1, 5.35),
    AltitudeSpec::new(34000, 4.09, 4.0, 4.2),
];

/// Ordered altitude to target-O2 lookup, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecificationTable {
    specs: Vec<AltitudeSpec>,
}

impl SpecificationTable {
    /// Builds a table, rejecting empty input, unsorted or duplicate altitudes,
    /// and entries whose target lies outside their own band.
    pub fn new(specs: Vec<AltitudeSpec>) -> Result<Self, Robd2Error> {
        if specs.is_empty() {
            return Err(Robd2Error::InvalidSpecTable(
                "at least one altitude entry is required".to_string(),
            ));
        }
        for spec in &specs {
            if !spec.is_well_formed() {
                return Err(Robd2Error::InvalidSpecTable(format!(
                    "{} ft: desired {:.2}% is outside [{:.2}, {:.2}]",
                    spec.altitude_ft, spec.desired_o2_pct, spec.range_min, spec.range_max
                )));
            }
        }
        for pair in specs.windows(2) {
            if pair[0].altitude_ft >= pair[1].altitude_ft {
                return Err(Robd2Error::SpecOrdering {
                    previous: pair[0].altitude_ft,
                    next: pair[1].altitude_ft,
                });
            }
        }
        Ok(Self { specs })
    }

    pub fn reference() -> Self {
        Self {
            specs: REFERENCE_SPECS.to_vec(),
        }
    }

    /// Loads and validates a `SpecTableFile` from YAML.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Robd2Error> {
        let display = path.as_ref().display().to_string();
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| Robd2Error::FileIO(display.clone(), e))?;
        let file: SpecTableFile =
            serde_yaml::from_str(&content).map_err(|e| Robd2Error::YamlParsing(display, e))?;
        Self::new(file.altitudes)
    }

    /// Step-function lookup: the entry with the greatest `altitude_ft <= altitude_ft`.
    pub fn lookup(&self, altitude_ft: i32) -> Option<&AltitudeSpec> {
        let idx = self.specs.partition_point(|s| s.altitude_ft <= altitude_ft);
        idx.checked_sub(1).map(|i| &self.specs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AltitudeSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for SpecificationTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_table_is_valid() {
        let table = SpecificationTable::new(REFERENCE_SPECS.to_vec()).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table, SpecificationTable::reference());
    }

    #[test]
    fn lookup_picks_floor_entry() {
        let table = SpecificationTable::reference();
        assert_eq!(table.lookup(0).unwrap().altitude_ft, 0);
        assert_eq!(table.lookup(4999).unwrap().altitude_ft, 0);
        assert_eq!(table.lookup(5000).unwrap().altitude_ft, 5000);
        assert_eq!(table.lookup(24_999).unwrap().altitude_ft, 22_000);
        assert_eq!(table.lookup(25_000).unwrap().desired_o2_pct, 6.89);
        assert_eq!(table.lookup(60_000).unwrap().altitude_ft, 34_000);
    }

    #[test]
    fn lookup_below_floor_is_none() {
        let table = SpecificationTable::reference();
        assert!(table.lookup(-1).is_none());

        let raised = SpecificationTable::new(vec![AltitudeSpec::new(8000, 15.0, 14.8, 15.2)]).unwrap();
        assert!(raised.lookup(7999).is_none());
        assert!(raised.lookup(8000).is_some());
    }

    #[test]
    fn rejects_malformed_tables() {
        assert!(matches!(
            SpecificationTable::new(vec![]),
            Err(Robd2Error::InvalidSpecTable(_))
        ));
        assert!(matches!(
            SpecificationTable::new(vec![AltitudeSpec::new(0, 22.0, 20.9, 21.1)]),
            Err(Robd2Error::InvalidSpecTable(_))
        ));
        assert!(matches!(
            SpecificationTable::new(vec![
                AltitudeSpec::new(5000, 17.27, 17.0, 17.5),
                AltitudeSpec::new(5000, 17.27, 17.0, 17.5),
            ]),
            Err(Robd2Error::SpecOrdering { previous: 5000, next: 5000 })
        ));
    }

    #[test]
    fn loads_yaml_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specs.yaml");
        fs::write(
            &path,
            "schema_version: \"1\"\naltitudes:\n  - { altitude_ft: 0, desired_o2_pct: 21.0, range_min: 20.9, range_max: 21.1 }\n  - { altitude_ft: 10000, desired_o2_pct: 14.05, range_min: 13.8, range_max: 14.3 }\n",
        )
        .unwrap();

        let table = SpecificationTable::from_yaml_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(12_000).unwrap().altitude_ft, 10_000);
    }

    proptest! {
        #[test]
        fn lookup_returns_greatest_floor(altitude in -5_000i32..80_000) {
            let table = SpecificationTable::reference();
            let expected = table.iter().filter(|s| s.altitude_ft <= altitude).last().copied();
            prop_assert_eq!(table.lookup(altitude).copied(), expected);
        }
    }
}
