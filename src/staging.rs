use std::fmt;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use crate::domain::{
    Emission, EmissionPoint, EmissionValues, IdentifiedEmission, LocatedPoint, Location,
    MappedLocation,
};
use crate::error::VamosError;

const SCHEMA: &str = "
DROP VIEW IF EXISTS located_ids_view;
DROP VIEW IF EXISTS emission_by_id_view;
DROP VIEW IF EXISTS emission_point_view;
DROP TABLE IF EXISTS locations;
DROP TABLE IF EXISTS emissions;
DROP TABLE IF EXISTS mapped_locations;

CREATE TABLE locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    epid TEXT UNIQUE NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL
);
CREATE UNIQUE INDEX locations_epid_idx ON locations(epid);

CREATE TABLE emissions (
    epid TEXT UNIQUE NOT NULL,
    gesamt REAL NOT NULL,
    reifen REAL NOT NULL,
    bremsen REAL NOT NULL,
    strasse REAL NOT NULL,
    zw REAL NOT NULL
);
CREATE UNIQUE INDEX emissions_epid_idx ON emissions(epid);

CREATE TABLE mapped_locations (
    epid TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL
);
CREATE INDEX mapped_locations_epid_idx ON mapped_locations(epid);

CREATE VIEW located_ids_view AS
    SELECT locations.id, mapped_locations.lat, mapped_locations.lng
    FROM mapped_locations INNER JOIN locations
    ON mapped_locations.epid = locations.epid;

CREATE VIEW emission_by_id_view AS
    SELECT locations.id, gesamt, reifen, bremsen, strasse, zw
    FROM emissions INNER JOIN locations
    ON emissions.epid = locations.epid;

CREATE VIEW emission_point_view AS
    SELECT mapped_locations.lat, mapped_locations.lng, gesamt, reifen, bremsen, strasse, zw
    FROM emissions INNER JOIN mapped_locations
    ON emissions.epid = mapped_locations.epid;
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Locations,
    Emissions,
    MappedLocations,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Locations => "locations",
            Table::Emissions => "emissions",
            Table::MappedLocations => "mapped_locations",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-owner SQLite staging area. Every run starts from an empty schema.
#[derive(Debug)]
pub struct StagingStore {
    conn: Connection,
    path: Option<Utf8PathBuf>,
}

impl StagingStore {
    /// Deletes whatever is at `path` and opens a fresh store there.
    pub fn open(path: &Utf8Path) -> Result<Self, VamosError> {
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => debug!(%path, "removed previous staging store"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(VamosError::Filesystem(format!("remove {path}: {err}"))),
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| VamosError::Filesystem(err.to_string()))?;
        }
        let conn = Connection::open(path.as_std_path())?;
        let mut store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.reset()?;
        info!(%path, "staging store ready");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, VamosError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn, path: None };
        store.reset()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Drops and recreates tables, indexes and views. Safe to call repeatedly.
    pub fn reset(&mut self) -> Result<(), VamosError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn close(self) -> Result<(), VamosError> {
        self.conn.close().map_err(|(_, err)| VamosError::from(err))
    }

    pub fn replace_locations(&mut self, rows: &[Location]) -> Result<usize, VamosError> {
        self.replace(
            Table::Locations,
            "INSERT INTO locations (epid, lat, lng) VALUES (?1, ?2, ?3)",
            rows,
            |stmt, row| stmt.execute(params![row.epid, row.lat, row.lng]),
        )
    }

    pub fn replace_emissions(&mut self, rows: &[Emission]) -> Result<usize, VamosError> {
        self.replace(
            Table::Emissions,
            "INSERT INTO emissions (epid, gesamt, reifen, bremsen, strasse, zw) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rows,
            |stmt, row| {
                stmt.execute(params![
                    row.epid,
                    row.gesamt,
                    row.reifen,
                    row.bremsen,
                    row.strasse,
                    row.zw
                ])
            },
        )
    }

    pub fn replace_mapped_locations(
        &mut self,
        rows: &[MappedLocation],
    ) -> Result<usize, VamosError> {
        self.replace(
            Table::MappedLocations,
            "INSERT INTO mapped_locations (epid, lat, lng) VALUES (?1, ?2, ?3)",
            rows,
            |stmt, row| stmt.execute(params![row.epid, row.lat, row.lng]),
        )
    }

    /// Deletes every row of `table` and inserts `rows` in one transaction.
    fn replace<T, F>(
        &mut self,
        table: Table,
        insert_sql: &str,
        rows: &[T],
        mut insert: F,
    ) -> Result<usize, VamosError>
    where
        F: FnMut(&mut rusqlite::Statement<'_>, &T) -> rusqlite::Result<usize>,
    {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(insert_sql)?;
            for row in rows {
                insert(&mut stmt, row)?;
            }
        }
        tx.commit()?;
        debug!(%table, rows = rows.len(), "table replaced");
        Ok(rows.len())
    }

    pub fn row_count(&self, table: Table) -> Result<usize, VamosError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Mapped coordinates with the staging id of their location.
    /// Mapped rows whose epid has no location are dropped by the inner join.
    pub fn located_ids(&self) -> Result<Vec<LocatedPoint>, VamosError> {
        self.query_view("SELECT id, lat, lng FROM located_ids_view", |row| {
            Ok(LocatedPoint {
                id: row.get(0)?,
                lat: row.get(1)?,
                lng: row.get(2)?,
            })
        })
    }

    /// Emission values keyed by staging location id; emissions without a location are dropped.
    pub fn emissions_by_id(&self) -> Result<Vec<IdentifiedEmission>, VamosError> {
        self.query_view(
            "SELECT id, gesamt, reifen, bremsen, strasse, zw FROM emission_by_id_view",
            |row| {
                Ok(IdentifiedEmission {
                    id: row.get(0)?,
                    values: values_from(row, 1)?,
                })
            },
        )
    }

    /// One row per mapped coordinate whose epid has an emission. A location mapped
    /// to several densified points repeats its values once per point.
    pub fn emission_points(&self) -> Result<Vec<EmissionPoint>, VamosError> {
        self.query_view(
            "SELECT lat, lng, gesamt, reifen, bremsen, strasse, zw FROM emission_point_view",
            |row| {
                Ok(EmissionPoint {
                    lat: row.get(0)?,
                    lng: row.get(1)?,
                    values: values_from(row, 2)?,
                })
            },
        )
    }

    fn query_view<T, F>(&self, sql: &str, map: F) -> Result<Vec<T>, VamosError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn values_from(row: &Row<'_>, first: usize) -> rusqlite::Result<EmissionValues> {
    Ok(EmissionValues {
        gesamt: row.get(first)?,
        reifen: row.get(first + 1)?,
        bremsen: row.get(first + 2)?,
        strasse: row.get(first + 3)?,
        zw: row.get(first + 4)?,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn location(epid: &str, lat: f64, lng: f64) -> Location {
        Location {
            epid: epid.to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn reset_twice_leaves_empty_schema() {
        let mut store = StagingStore::open_in_memory().unwrap();
        store.replace_locations(&[location("a", 1.0, 2.0)]).unwrap();
        store.reset().unwrap();
        store.reset().unwrap();
        for table in [Table::Locations, Table::Emissions, Table::MappedLocations] {
            assert_eq!(store.row_count(table).unwrap(), 0);
        }
        assert!(store.located_ids().unwrap().is_empty());
        assert!(store.emissions_by_id().unwrap().is_empty());
        assert!(store.emission_points().unwrap().is_empty());
    }

    #[test]
    fn replace_discards_previous_rows() {
        let mut store = StagingStore::open_in_memory().unwrap();
        store
            .replace_locations(&[location("a", 1.0, 2.0), location("b", 3.0, 4.0)])
            .unwrap();
        store.replace_locations(&[location("c", 5.0, 6.0)]).unwrap();
        assert_eq!(store.row_count(Table::Locations).unwrap(), 1);
    }

    #[test]
    fn duplicate_epid_is_constraint_error() {
        let mut store = StagingStore::open_in_memory().unwrap();
        store.replace_locations(&[location("keep", 1.0, 2.0)]).unwrap();
        let err = store
            .replace_locations(&[location("a", 1.0, 2.0), location("a", 3.0, 4.0)])
            .unwrap_err();
        assert_matches!(err, VamosError::StorageConstraint(_));
        assert_eq!(store.row_count(Table::Locations).unwrap(), 1);
    }

    #[test]
    fn mapped_locations_allow_repeated_epid() {
        let mut store = StagingStore::open_in_memory().unwrap();
        let rows = vec![
            MappedLocation {
                epid: "a".to_string(),
                lat: 1.0,
                lng: 2.0,
            },
            MappedLocation {
                epid: "a".to_string(),
                lat: 1.5,
                lng: 2.5,
            },
        ];
        assert_eq!(store.replace_mapped_locations(&rows).unwrap(), 2);
    }

    #[test]
    fn open_replaces_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("stage.sqlite")).unwrap();

        let mut first = StagingStore::open(&path).unwrap();
        first.replace_locations(&[location("a", 1.0, 2.0)]).unwrap();
        first.close().unwrap();

        let second = StagingStore::open(&path).unwrap();
        assert_eq!(second.row_count(Table::Locations).unwrap(), 0);
        assert_eq!(second.path(), Some(path.as_path()));
    }
}
