#![allow(dead_code)]

use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use vamos_export::app::{ProgressEvent, ProgressSink};
use vamos_export::client::{Resource, VamosClient};
use vamos_export::domain::{Emission, Location};
use vamos_export::error::VamosError;

#[derive(Default)]
pub struct MockVamos {
    pub dates: Vec<String>,
    pub locations: Vec<Location>,
    pub emissions: Vec<Emission>,
    pub calls: Mutex<Vec<String>>,
}

impl MockVamos {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl VamosClient for MockVamos {
    fn fetch_dates(&self) -> Result<Vec<String>, VamosError> {
        self.record("dates");
        Ok(self.dates.clone())
    }

    fn fetch_locations(&self) -> Result<Vec<Location>, VamosError> {
        self.record("locations");
        Ok(self.locations.clone())
    }

    fn fetch_emissions(&self, date: &str) -> Result<Vec<Emission>, VamosError> {
        self.record(&format!("emissions {date}"));
        Ok(self.emissions.clone())
    }

    fn describe(&self, resource: Resource<'_>) -> String {
        format!("mock://{resource:?}")
    }
}

impl VamosClient for &MockVamos {
    fn fetch_dates(&self) -> Result<Vec<String>, VamosError> {
        (**self).fetch_dates()
    }

    fn fetch_locations(&self) -> Result<Vec<Location>, VamosError> {
        (**self).fetch_locations()
    }

    fn fetch_emissions(&self, date: &str) -> Result<Vec<Emission>, VamosError> {
        (**self).fetch_emissions(date)
    }

    fn describe(&self, resource: Resource<'_>) -> String {
        (**self).describe(resource)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

pub fn location(epid: &str, lat: f64, lng: f64) -> Location {
    Location {
        epid: epid.to_string(),
        lat,
        lng,
    }
}

pub fn emission(epid: &str, base: f64) -> Emission {
    Emission {
        epid: epid.to_string(),
        gesamt: base,
        reifen: base + 1.0,
        bremsen: base + 2.0,
        strasse: base + 3.0,
        zw: base + 4.0,
    }
}

/// Two locations, two emissions (one for a location that does not exist) and
/// three densified points, two of them for location 100.
pub fn fixture_client() -> MockVamos {
    MockVamos {
        dates: vec!["2017-01-12".to_string(), "2017-01-13".to_string()],
        locations: vec![location("100", 51.05, 13.74), location("200", 51.03, 13.70)],
        emissions: vec![emission("100", 10.0), emission("300", 90.0)],
        calls: Mutex::new(Vec::new()),
    }
}

pub fn write_densified(dir: &Utf8Path) -> Utf8PathBuf {
    let path = dir.join("locations-mapped-densified.csv");
    std::fs::write(
        path.as_std_path(),
        "id,lat,lon\n100,51.051,13.741\n100,51.052,13.742\n200,51.031,13.701\n",
    )
    .unwrap();
    path
}

pub fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, path)
}
