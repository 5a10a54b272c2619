//! Core data types for the travels engine.
//!
//! This module defines the three stored entities, the projection returned by
//! the user-visits query, and the typed query parameter sets. All timestamps
//! are signed unix seconds; conversion to and from JSON happens only at the
//! serde boundary.

use serde::{Deserialize, Serialize};

/// Entity identifier. Positive, assigned by the client.
pub type EntityId = u32;

/// User gender. The wire representation is the single letter `"m"` or `"f"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl Gender {
    /// Parse a query-string value. Only the exact enum letters are accepted.
    pub fn from_param(value: &str) -> Option<Gender> {
        match value {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// A registered traveller.
///
/// Field order is the canonical JSON key order; the serializer must not be
/// reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    /// Globally unique across users.
    pub email: String,
    pub gender: Gender,
    /// Unix seconds, may be negative.
    pub birth_date: i64,
}

/// A place that can be visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub city: String,
    pub country: String,
    pub place: String,
    pub distance: u32,
}

/// A single visit of a user to a location.
///
/// Holds plain foreign ids, never references; the wire keys are `user` and
/// `location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: EntityId,
    #[serde(rename = "user")]
    pub user_id: EntityId,
    #[serde(rename = "location")]
    pub location_id: EntityId,
    pub visited_at: i64,
    /// Rating in `[0, 5]`.
    pub mark: u8,
}

/// Projection emitted by the user-visits query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserVisit {
    pub mark: u8,
    pub visited_at: i64,
    pub place: String,
}

/// Wrapper for the user-visits response body: `{"visits":[...]}`.
#[derive(Debug, Serialize)]
pub struct UserVisitsResult {
    pub visits: Vec<UserVisit>,
}

/// Filters for the user-visits query. All bounds are exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserVisitsQuery {
    /// Keep visits with `visited_at > from_date`.
    pub from_date: Option<i64>,
    /// Keep visits with `visited_at < to_date`.
    pub to_date: Option<i64>,
    /// Exact match on the visited location's country.
    pub country: Option<String>,
    /// Keep visits whose location has `distance < to_distance`.
    pub to_distance: Option<u32>,
}

/// Filters for the location-average query. Date and age bounds are exclusive;
/// ages are whole calendar years relative to the data timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationAvgQuery {
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
    pub from_age: Option<u32>,
    pub to_age: Option<u32>,
    pub gender: Option<Gender>,
}
