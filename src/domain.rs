use std::fmt;
use std::str::FromStr;

use crate::error::VamosError;

/// A measurement location as published by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub epid: String,
    pub lat: f64,
    pub lng: f64,
}

/// Emission values for one location on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub epid: String,
    pub gesamt: f64,
    pub reifen: f64,
    pub bremsen: f64,
    pub strasse: f64,
    pub zw: f64,
}

/// A densified plotting coordinate. Several may share one epid.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedLocation {
    pub epid: String,
    pub lat: f64,
    pub lng: f64,
}

/// Row of `located_ids_view`: staging id of the location plus a mapped coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedPoint {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
}

/// Row of `emission_by_id_view`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentifiedEmission {
    pub id: i64,
    pub values: EmissionValues,
}

/// Row of `emission_point_view`. Carries no identifier, only coordinates and values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionPoint {
    pub lat: f64,
    pub lng: f64,
    pub values: EmissionValues,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionValues {
    pub gesamt: f64,
    pub reifen: f64,
    pub bremsen: f64,
    pub strasse: f64,
    /// Opaque fifth measure, published without a definition.
    pub zw: f64,
}

impl EmissionValues {
    pub fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Gesamt => self.gesamt,
            Variable::Reifen => self.reifen,
            Variable::Bremsen => self.bremsen,
            Variable::Strasse => self.strasse,
            Variable::Zw => self.zw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Gesamt,
    Reifen,
    Bremsen,
    Strasse,
    Zw,
}

impl Variable {
    pub const ALL: [Variable; 5] = [
        Variable::Gesamt,
        Variable::Reifen,
        Variable::Bremsen,
        Variable::Strasse,
        Variable::Zw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Gesamt => "gesamt",
            Variable::Reifen => "reifen",
            Variable::Bremsen => "bremsen",
            Variable::Strasse => "strasse",
            Variable::Zw => "zw",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Variable {
    type Err = VamosError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|variable| variable.as_str() == value.trim())
            .ok_or_else(|| VamosError::UnknownVariable(value.to_string()))
    }
}
