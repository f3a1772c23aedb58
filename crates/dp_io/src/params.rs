//! Params file loading.

use std::path::Path;

use tracing::debug;

use dp_core::{variables::validate_domains, Params};

use crate::{json_err, read_limited, IoResult};

const MAX_PARAMS_BYTES: u64 = 1024 * 1024;

/// Parse a params file (omitted fields take defaults) and check its domains.
pub fn load_params(path: &Path) -> IoResult<Params> {
    let bytes = read_limited(path, MAX_PARAMS_BYTES)?;
    let params: Params = serde_json::from_slice(&bytes).map_err(|e| json_err(path, e))?;
    validate_domains(&params)?;
    debug!(path = %path.display(), seed = ?params.seed, randomness = params.randomness_level.as_u8(), "params loaded");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IoError;
    use std::fs;

    #[test]
    fn defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("params.json");
        fs::write(&p, r#"{"seed": 42, "defaultOdds": {"juryOdds": 10, "televoteOdds": 20}}"#).unwrap();
        let params = load_params(&p).unwrap();
        assert_eq!(params.seed, Some(42));
        assert_eq!(params.randomness_level.as_u8(), 50);
        assert_eq!(params.default_odds.televote_odds, 20.0);
    }

    #[test]
    fn bad_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("params.json");
        fs::write(&p, r#"{"randomnessLevel": 101}"#).unwrap();
        assert!(matches!(load_params(&p), Err(IoError::Json { .. })));
        fs::write(&p, r#"{"defaultOdds": {"juryOdds": -1, "televoteOdds": 1}}"#).unwrap();
        assert!(matches!(load_params(&p), Err(IoError::Invalid(_))));
        assert!(matches!(load_params(&dir.path().join("missing.json")), Err(IoError::Path(_))));
    }
}
