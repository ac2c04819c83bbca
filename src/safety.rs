//! Safety checks for the applied-snapshot output.
//!
//! The destination snapshot is rewritten after a run with every applied
//! write. These checks keep that output from landing on top of the library
//! export or the input snapshot.

use anyhow::{bail, Result};
use std::path::Path;

/// Marker every applied-snapshot file name must carry
pub const APPLIED_MARKER: &str = "applied";

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output filename must contain `required_pattern`
/// - Output cannot be any of the input paths
/// - Output must be a `.json` file
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    input_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for input in input_paths {
        if output == *input {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    if output.extension().and_then(|e| e.to_str()) != Some("json") {
        bail!(
            "Safety check failed: output '{}' must be a .json file",
            output.display()
        );
    }

    Ok(())
}

/// `<dir>/<stem>.applied.json` next to the destination snapshot.
pub fn default_applied_path(destination: &Path) -> std::path::PathBuf {
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("destination");
    destination.with_file_name(format!("{}.{}.json", stem, APPLIED_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_applied_output() {
        let output = PathBuf::from("/tmp/tidal.applied.json");
        let source = PathBuf::from("/data/spotify.json");
        let destination = PathBuf::from("/data/tidal.json");
        assert!(validate_output_path(&output, APPLIED_MARKER, &[&source, &destination]).is_ok());
    }

    #[test]
    fn test_invalid_missing_pattern() {
        let output = PathBuf::from("/tmp/tidal-copy.json");
        let result = validate_output_path(&output, APPLIED_MARKER, &[]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must contain"));
    }

    #[test]
    fn test_invalid_same_as_input() {
        let path = PathBuf::from("/data/tidal.applied.json");
        let result = validate_output_path(&path, APPLIED_MARKER, &[&path]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be the same"));
    }

    #[test]
    fn test_invalid_extension() {
        let output = PathBuf::from("/tmp/tidal.applied.txt");
        let result = validate_output_path(&output, APPLIED_MARKER, &[]);
        assert!(result.unwrap_err().to_string().contains(".json"));
    }

    #[test]
    fn test_default_applied_path() {
        let path = default_applied_path(Path::new("/data/tidal.json"));
        assert_eq!(path, PathBuf::from("/data/tidal.applied.json"));
        assert!(validate_output_path(&path, APPLIED_MARKER, &[Path::new("/data/tidal.json")]).is_ok());
    }
}
