use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::client::VamosClient;
use crate::domain::Variable;
use crate::error::VamosError;
use crate::export;
use crate::ingest::{Ingestor, LoadSummary};
use crate::staging::StagingStore;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub points_csv: Option<Utf8PathBuf>,
    pub shapefile: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub date: String,
    pub loaded: LoadSummary,
    pub outputs: Vec<OutputFile>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub kind: String,
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: VamosClient> {
    ingestor: Ingestor<C>,
    output_dir: Utf8PathBuf,
}

impl<C: VamosClient> App<C> {
    pub fn new(client: C, densified_locations: Utf8PathBuf, output_dir: Utf8PathBuf) -> Self {
        Self {
            ingestor: Ingestor::new(client, densified_locations),
            output_dir,
        }
    }

    pub fn variable_path(&self, variable: Variable) -> Utf8PathBuf {
        self.output_dir.join(variable.file_name())
    }

    /// Resets the store, loads `date`, then writes one CSV per variable and any
    /// optional point exports.
    pub fn run(
        &self,
        store: &mut StagingStore,
        date: &str,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, VamosError> {
        sink.event(ProgressEvent {
            message: format!("Processing date {date}"),
            elapsed: None,
        });
        store.reset()?;
        let loaded = self.ingestor.load_all_for_date(store, date, sink)?;
        sink.event(ProgressEvent {
            message: "Loaded point data".to_string(),
            elapsed: None,
        });

        let mut outputs = Vec::new();
        sink.event(ProgressEvent {
            message: "Converting point data to csv".to_string(),
            elapsed: None,
        });
        for variable in Variable::ALL {
            let path = self.variable_path(variable);
            sink.event(ProgressEvent {
                message: format!("Writing {variable} to {path}"),
                elapsed: None,
            });
            let start = Instant::now();
            let rows = export::write_variable_csv(store, variable, &path)?;
            sink.event(ProgressEvent {
                message: format!("{variable} rows={rows}"),
                elapsed: Some(start.elapsed()),
            });
            outputs.push(OutputFile {
                kind: variable.to_string(),
                path: path.to_string(),
                rows,
            });
        }

        if let Some(path) = &options.points_csv {
            sink.event(ProgressEvent {
                message: format!("Writing location points to {path}"),
                elapsed: None,
            });
            let rows = export::write_points_csv(store, path)?;
            outputs.push(OutputFile {
                kind: "points-csv".to_string(),
                path: path.to_string(),
                rows,
            });
        }

        if let Some(path) = &options.shapefile {
            sink.event(ProgressEvent {
                message: format!("Writing location points shapefile to {path}"),
                elapsed: None,
            });
            let rows = export::write_points_shapefile(store, path)?;
            outputs.push(OutputFile {
                kind: "points-shapefile".to_string(),
                path: path.to_string(),
                rows,
            });
        }

        Ok(RunResult {
            date: date.to_string(),
            loaded,
            outputs,
            generated_at: iso_timestamp(),
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
