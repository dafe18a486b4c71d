use std::time::Instant;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::app::{ProgressEvent, ProgressSink};
use crate::client::{Resource, VamosClient};
use crate::densified::load_densified_locations;
use crate::error::VamosError;
use crate::staging::StagingStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub date: String,
    pub locations: usize,
    pub emissions: usize,
    pub mapped_locations: usize,
}

pub struct Ingestor<C: VamosClient> {
    client: C,
    densified_locations: Utf8PathBuf,
}

impl<C: VamosClient> Ingestor<C> {
    pub fn new(client: C, densified_locations: Utf8PathBuf) -> Self {
        Self {
            client,
            densified_locations,
        }
    }

    /// Validates `date` against the service, then replaces locations, emissions and
    /// mapped locations in that order. An unknown date leaves the store untouched.
    pub fn load_all_for_date(
        &self,
        store: &mut StagingStore,
        date: &str,
        sink: &dyn ProgressSink,
    ) -> Result<LoadSummary, VamosError> {
        let valid_dates = self.load_dates(sink)?;
        if !valid_dates.iter().any(|valid| valid == date) {
            return Err(VamosError::InvalidDate {
                date: date.to_string(),
                valid_dates,
            });
        }

        let locations = self.load_locations(store, sink)?;
        let emissions = self.load_emissions(store, date, sink)?;
        let mapped_locations = self.load_mapped_locations(store, sink)?;

        info!(date, locations, emissions, mapped_locations, "staging loaded");
        Ok(LoadSummary {
            date: date.to_string(),
            locations,
            emissions,
            mapped_locations,
        })
    }

    pub fn load_dates(&self, sink: &dyn ProgressSink) -> Result<Vec<String>, VamosError> {
        sink.event(ProgressEvent {
            message: format!(
                "loading dates from [{}] ...",
                self.client.describe(Resource::Dates)
            ),
            elapsed: None,
        });
        self.client.fetch_dates()
    }

    pub fn load_locations(
        &self,
        store: &mut StagingStore,
        sink: &dyn ProgressSink,
    ) -> Result<usize, VamosError> {
        sink.event(ProgressEvent {
            message: format!(
                "loading locations from [{}] ...",
                self.client.describe(Resource::Locations)
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let rows = self.client.fetch_locations()?;
        let count = store.replace_locations(&rows)?;
        sink.event(ProgressEvent {
            message: format!("locations loaded rows={count}"),
            elapsed: Some(start.elapsed()),
        });
        Ok(count)
    }

    pub fn load_emissions(
        &self,
        store: &mut StagingStore,
        date: &str,
        sink: &dyn ProgressSink,
    ) -> Result<usize, VamosError> {
        sink.event(ProgressEvent {
            message: format!(
                "loading emissions for {date} from [{}] ...",
                self.client.describe(Resource::Emissions(date))
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let rows = self.client.fetch_emissions(date)?;
        let count = store.replace_emissions(&rows)?;
        sink.event(ProgressEvent {
            message: format!("emissions loaded rows={count}"),
            elapsed: Some(start.elapsed()),
        });
        Ok(count)
    }

    pub fn load_mapped_locations(
        &self,
        store: &mut StagingStore,
        sink: &dyn ProgressSink,
    ) -> Result<usize, VamosError> {
        sink.event(ProgressEvent {
            message: format!(
                "loading mapped locations from [{}] ...",
                self.densified_locations
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let rows = load_densified_locations(&self.densified_locations)?;
        let count = store.replace_mapped_locations(&rows)?;
        sink.event(ProgressEvent {
            message: format!("mapped locations loaded rows={count}"),
            elapsed: Some(start.elapsed()),
        });
        Ok(count)
    }
}
