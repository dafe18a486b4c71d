use std::fs::{self, File};

use camino::Utf8Path;
use csv::{Writer, WriterBuilder};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::Point;
use tracing::info;

use crate::domain::Variable;
use crate::error::VamosError;
use crate::staging::StagingStore;

/// WGS 84 (EPSG:4326), the reference of the service coordinates.
const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

/// Writes `id,lat,lon` for every located mapped point, in view order.
pub fn write_points_csv(store: &StagingStore, path: &Utf8Path) -> Result<usize, VamosError> {
    let points = store.located_ids()?;
    write_csv_atomic(path, |writer| {
        writer.write_record(["id", "lat", "lon"]).map_err(csv_error)?;
        for point in &points {
            writer
                .serialize((point.id, point.lat, point.lng))
                .map_err(csv_error)?;
        }
        Ok(points.len())
    })
}

/// Writes `lat,lon,value` with `variable` picked from every emission point.
pub fn write_variable_csv(
    store: &StagingStore,
    variable: Variable,
    path: &Utf8Path,
) -> Result<usize, VamosError> {
    let points = store.emission_points()?;
    let rows = write_csv_atomic(path, |writer| {
        writer.write_record(["lat", "lon", "value"]).map_err(csv_error)?;
        for point in &points {
            writer
                .serialize((point.lat, point.lng, point.values.get(variable)))
                .map_err(csv_error)?;
        }
        Ok(points.len())
    })?;
    info!(%variable, %path, rows, "variable exported");
    Ok(rows)
}

/// Like [`write_variable_csv`] for a variable given by name. Unknown names fail
/// before anything is written.
pub fn write_variable_csv_named(
    store: &StagingStore,
    name: &str,
    path: &Utf8Path,
) -> Result<usize, VamosError> {
    let variable: Variable = name.parse()?;
    write_variable_csv(store, variable, path)
}

/// Writes one point feature (lon, lat) per located mapped point with an integer `id`
/// attribute, plus a `.prj` sidecar.
pub fn write_points_shapefile(store: &StagingStore, path: &Utf8Path) -> Result<usize, VamosError> {
    let points = store.located_ids()?;
    ensure_parent(path)?;

    let id_field = FieldName::try_from("id")
        .map_err(|err| VamosError::Filesystem(format!("dbase field name: {err:?}")))?;
    let table = TableWriterBuilder::new().add_numeric_field(id_field, 10, 0);
    {
        let mut writer = shapefile::Writer::from_path(path.as_std_path(), table)
            .map_err(|err| VamosError::Filesystem(format!("create {path}: {err}")))?;
        for point in &points {
            let mut record = Record::default();
            record.insert("id".to_string(), FieldValue::Numeric(Some(point.id as f64)));
            writer
                .write_shape_and_record(&Point::new(point.lng, point.lat), &record)
                .map_err(|err| VamosError::Filesystem(format!("write {path}: {err}")))?;
        }
    }

    let prj = path.with_extension("prj");
    fs::write(prj.as_std_path(), WGS84_PRJ)
        .map_err(|err| VamosError::Filesystem(format!("write {prj}: {err}")))?;
    info!(%path, features = points.len(), "shapefile exported");
    Ok(points.len())
}

/// Streams rows into a temp file next to `path` and moves it into place on success.
fn write_csv_atomic<F>(path: &Utf8Path, write: F) -> Result<usize, VamosError>
where
    F: FnOnce(&mut Writer<&mut File>) -> Result<usize, VamosError>,
{
    let parent = ensure_parent(path)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".vamos-export")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| VamosError::Filesystem(err.to_string()))?;

    let rows = {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file_mut());
        let rows = write(&mut writer)?;
        writer
            .flush()
            .map_err(|err| VamosError::Filesystem(err.to_string()))?;
        rows
    };

    if path.as_std_path().exists() {
        fs::remove_file(path.as_std_path())
            .map_err(|err| VamosError::Filesystem(err.to_string()))?;
    }
    temp.persist(path.as_std_path())
        .map_err(|err| VamosError::Filesystem(err.to_string()))?;
    Ok(rows)
}

fn ensure_parent(path: &Utf8Path) -> Result<&Utf8Path, VamosError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| VamosError::Filesystem(err.to_string()))?;
    Ok(parent)
}

fn csv_error(err: csv::Error) -> VamosError {
    VamosError::Filesystem(err.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::domain::{Location, MappedLocation};

    fn seeded_store() -> StagingStore {
        let mut store = StagingStore::open_in_memory().unwrap();
        store
            .replace_locations(&[Location {
                epid: "a".to_string(),
                lat: 51.0,
                lng: 13.7,
            }])
            .unwrap();
        store
            .replace_mapped_locations(&[
                MappedLocation {
                    epid: "a".to_string(),
                    lat: 51.01,
                    lng: 13.71,
                },
                MappedLocation {
                    epid: "a".to_string(),
                    lat: 51.02,
                    lng: 13.72,
                },
            ])
            .unwrap();
        store
    }

    #[test]
    fn unknown_variable_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("nonexistent.csv")).unwrap();
        let store = seeded_store();

        let err = write_variable_csv_named(&store, "nonexistent", &path).unwrap_err();
        assert_matches!(err, VamosError::UnknownVariable(_));
        assert!(!path.as_std_path().exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn shapefile_writes_all_sidecars() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("points.shp")).unwrap();
        let store = seeded_store();

        assert_eq!(write_points_shapefile(&store, &path).unwrap(), 2);
        for ext in ["shp", "shx", "dbf", "prj"] {
            assert!(path.with_extension(ext).as_std_path().exists(), "missing .{ext}");
        }
        let prj = std::fs::read_to_string(path.with_extension("prj").as_std_path()).unwrap();
        assert!(prj.starts_with("GEOGCS[\"GCS_WGS_1984\""));
    }

    #[test]
    fn points_csv_overwrites_previous_export() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("points.csv")).unwrap();
        std::fs::write(path.as_std_path(), "stale").unwrap();
        let store = seeded_store();

        assert_eq!(write_points_csv(&store, &path).unwrap(), 2);
        let content = std::fs::read_to_string(path.as_std_path()).unwrap();
        assert!(content.starts_with("id,lat,lon\n"));
        assert_eq!(content.lines().count(), 3);
    }
}
