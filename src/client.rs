use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::ServiceConfig;
use crate::domain::{Emission, Location};
use crate::error::VamosError;
use crate::records;

pub trait VamosClient {
    fn fetch_dates(&self) -> Result<Vec<String>, VamosError>;
    fn fetch_locations(&self) -> Result<Vec<Location>, VamosError>;
    fn fetch_emissions(&self, date: &str) -> Result<Vec<Emission>, VamosError>;

    /// Where a resource is fetched from, for progress messages.
    fn describe(&self, resource: Resource<'_>) -> String;
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Dates,
    Locations,
    Emissions(&'a str),
}

#[derive(Clone)]
pub struct VamosHttpClient {
    client: Client,
    root: Url,
    service: ServiceConfig,
}

impl VamosHttpClient {
    pub fn new(service: &ServiceConfig) -> Result<Self, VamosError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("vamos-export/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| VamosError::Network(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(service.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|err| VamosError::Network(err.to_string()))?;
        Ok(Self {
            client,
            root: Self::root_url(service)?,
            service: service.clone(),
        })
    }

    pub fn root_url(service: &ServiceConfig) -> Result<Url, VamosError> {
        let raw = format!("{}://{}:{}/", service.scheme, service.host, service.port);
        Url::parse(&raw).map_err(|err| VamosError::Network(format!("invalid service url {raw}: {err}")))
    }

    pub fn dates_url(&self) -> Result<Url, VamosError> {
        self.join(&self.service.dates_path)
    }

    pub fn locations_url(&self) -> Result<Url, VamosError> {
        self.join(&self.service.locations_path)
    }

    pub fn emissions_url(&self, date: &str) -> Result<Url, VamosError> {
        let mut url = self.join(&self.service.emissions_path)?;
        url.query_pairs_mut().append_pair("DATE", date);
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, VamosError> {
        self.root
            .join(path)
            .map_err(|err| VamosError::Network(format!("invalid path {path}: {err}")))
    }

    fn get(&self, url: Url) -> Result<Response, VamosError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| VamosError::Network(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "VAMOS request failed".to_string());
            return Err(VamosError::ServiceStatus { status, message });
        }
        Ok(response)
    }
}

impl VamosClient for VamosHttpClient {
    fn fetch_dates(&self) -> Result<Vec<String>, VamosError> {
        let body = self
            .get(self.dates_url()?)?
            .bytes()
            .map_err(|err| VamosError::Network(err.to_string()))?;
        records::parse_dates(&body)
    }

    fn fetch_locations(&self) -> Result<Vec<Location>, VamosError> {
        let response = self.get(self.locations_url()?)?;
        records::read_locations(response, "locations")
    }

    fn fetch_emissions(&self, date: &str) -> Result<Vec<Emission>, VamosError> {
        let response = self.get(self.emissions_url(date)?)?;
        records::read_emissions(response, "emissions")
    }

    fn describe(&self, resource: Resource<'_>) -> String {
        let url = match resource {
            Resource::Dates => self.dates_url(),
            Resource::Locations => self.locations_url(),
            Resource::Emissions(date) => self.emissions_url(date),
        };
        url.map(|url| url.to_string())
            .unwrap_or_else(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_service_layout() {
        let client = VamosHttpClient::new(&ServiceConfig::default()).unwrap();
        assert_eq!(
            client.dates_url().unwrap().as_str(),
            "http://141.76.16.144:20050/dates"
        );
        assert_eq!(
            client.locations_url().unwrap().as_str(),
            "http://141.76.16.144:20050/locations"
        );
        assert_eq!(
            client.emissions_url("2017-01-12").unwrap().as_str(),
            "http://141.76.16.144:20050/emissions?DATE=2017-01-12"
        );
    }

    #[test]
    fn emissions_url_encodes_date() {
        let service = ServiceConfig {
            host: "localhost".to_string(),
            port: 8080,
            ..ServiceConfig::default()
        };
        let client = VamosHttpClient::new(&service).unwrap();
        assert_eq!(
            client.describe(Resource::Emissions("2017 01&12")),
            "http://localhost:8080/emissions?DATE=2017+01%2612"
        );
    }
}
