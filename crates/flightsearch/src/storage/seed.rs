//! Airport datasets used to populate the lookup table.

use std::path::Path;

use crate::airport::AirportRecord;
use crate::error::{Error, Result};

/// The airport dataset shipped with the binary.
const BUNDLED_AIRPORTS: &str = include_str!("../../assets/airports.json");

/// Parse the bundled airport dataset.
///
/// # Errors
///
/// Returns an error if the bundled JSON is malformed or fails validation.
pub fn bundled_airports() -> Result<Vec<AirportRecord>> {
    parse_airports(BUNDLED_AIRPORTS)
}

/// Load an airport dataset from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or fails validation.
pub fn load_airports(path: &Path) -> Result<Vec<AirportRecord>> {
    let json = std::fs::read_to_string(path)?;
    parse_airports(&json)
}

/// Parse and validate a JSON array of airport records.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, the dataset is empty, or a
/// record carries a blank code or a negative passenger count.
pub fn parse_airports(json: &str) -> Result<Vec<AirportRecord>> {
    let records: Vec<AirportRecord> = serde_json::from_str(json)?;

    if records.is_empty() {
        return Err(Error::seed("dataset contains no airports"));
    }

    for record in &records {
        if record.iata_code.trim().is_empty() {
            return Err(Error::seed(format!(
                "airport '{}' has an empty IATA code",
                record.name
            )));
        }
        if record.passengers < 0 {
            return Err(Error::seed(format!(
                "airport {} has a negative passenger count",
                record.iata_code
            )));
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_airports_parse() {
        let airports = bundled_airports().unwrap();
        assert!(airports.len() > 10);
        assert!(airports.iter().any(|a| a.iata_code == "JFK"));
    }

    #[test]
    fn test_bundled_codes_are_unique() {
        let airports = bundled_airports().unwrap();
        let mut codes: Vec<_> = airports.iter().map(|a| a.iata_code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), airports.len());
    }

    #[test]
    fn test_parse_empty_dataset() {
        let err = parse_airports("[]").unwrap_err();
        assert!(err.to_string().contains("no airports"));
    }

    #[test]
    fn test_parse_blank_code() {
        let err = parse_airports(r#"[{"iata_code": " ", "name": "Nowhere", "passengers": 1}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("empty IATA code"));
    }

    #[test]
    fn test_parse_negative_passengers() {
        let err = parse_airports(r#"[{"iata_code": "XXX", "name": "Nowhere", "passengers": -1}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_airports("not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_load_airports_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airports.json");
        std::fs::write(
            &path,
            r#"[{"iata_code": "OPO", "name": "Porto", "passengers": 10}]"#,
        )
        .unwrap();

        let airports = load_airports(&path).unwrap();
        assert_eq!(airports.len(), 1);
        assert_eq!(airports[0].iata_code, "OPO");
    }
}
