//! Query-string parameter types for the travels server.
//!
//! Parameters arrive as raw strings and convert into the engine's typed
//! query structs. Unknown keys are ignored, empty values count as absent
//! (matching how the benchmark client omits filters), and values that fail
//! to parse reject the request.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Gender, LocationAvgQuery, UserVisitsQuery};

/// Query parameters for `GET /users/{id}/visits`.
#[derive(Debug, Default, Deserialize)]
pub struct UserVisitsParams {
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "toDistance")]
    pub to_distance: Option<String>,
}

impl UserVisitsParams {
    pub fn into_query(self) -> Result<UserVisitsQuery> {
        Ok(UserVisitsQuery {
            from_date: parse_int("fromDate", self.from_date)?,
            to_date: parse_int("toDate", self.to_date)?,
            country: self.country.filter(|c| !c.is_empty()),
            to_distance: parse_int("toDistance", self.to_distance)?,
        })
    }
}

/// Query parameters for `GET /locations/{id}/avg`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationAvgParams {
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    #[serde(rename = "fromAge")]
    pub from_age: Option<String>,
    #[serde(rename = "toAge")]
    pub to_age: Option<String>,
    pub gender: Option<String>,
}

impl LocationAvgParams {
    pub fn into_query(self) -> Result<LocationAvgQuery> {
        let gender = match self.gender.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                Gender::from_param(raw)
                    .ok_or_else(|| Error::BadParam(format!("invalid gender: {}", raw)))?,
            ),
        };
        Ok(LocationAvgQuery {
            from_date: parse_int("fromDate", self.from_date)?,
            to_date: parse_int("toDate", self.to_date)?,
            from_age: parse_int("fromAge", self.from_age)?,
            to_age: parse_int("toAge", self.to_age)?,
            gender,
        })
    }
}

fn parse_int<T: std::str::FromStr>(field: &str, value: Option<String>) -> Result<Option<T>> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::BadParam(format!("invalid {}: {}", field, raw))),
    }
}
