use std::fs::File;

use camino::Utf8Path;
use tracing::info;

use crate::domain::MappedLocation;
use crate::error::VamosError;
use crate::records;

/// Reads the locally supplied densified coordinates (`id,lat,lon`, extra columns ignored).
pub fn load_densified_locations(path: &Utf8Path) -> Result<Vec<MappedLocation>, VamosError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| VamosError::Filesystem(format!("open {path}: {err}")))?;
    let rows = records::read_mapped_locations(file, path.as_str())?;
    info!(%path, rows = rows.len(), "densified locations read");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn missing_file_is_filesystem_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("absent.csv")).unwrap();
        assert_matches!(
            load_densified_locations(&path),
            Err(VamosError::Filesystem(_))
        );
    }

    #[test]
    fn reads_repeated_ids() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("dense.csv")).unwrap();
        std::fs::write(
            path.as_std_path(),
            "id,lat,lon,seq\n91506,50.99,13.84,0\n91506,50.98,13.85,1\n",
        )
        .unwrap();
        let rows = load_densified_locations(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.epid == "91506"));
        assert_eq!(rows[1].lng, 13.85);
    }
}
