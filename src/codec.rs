//! Request-body codec and numeric output semantics.
//!
//! POST bodies are partial by design: an update may carry any subset of an
//! entity's fields. Parsing is field-wise permissive — unknown keys are
//! ignored — but an explicit JSON `null` on a known key fails the parse, so
//! a partial update can never null out a required field. The patch types
//! here capture the three-way distinction (missing / null / value) with a
//! dedicated [`Field`] carrier.
//!
//! Validation runs on full entities only, after a patch has been merged onto
//! the stored record (or turned into a new one). Canonical output encoding
//! and the average-rounding rules also live here so that every producer of
//! response bytes shares one implementation.

use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::model::{Gender, Location, User, Visit};

/// One field of a partial request body.
///
/// `Missing` is a key that was not present, `Null` a key bound to a literal
/// `null`, `Value` a parsed value. Serde's `Option` maps `null` to `None`,
/// so a plain `Option` cannot tell the first two apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Missing,
    Null,
    Value(T),
}

// Manual impl: the derive would bound `T: Default`, which the payload types
// do not all satisfy.
impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

impl<T> Field<T> {
    fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    fn into_value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    fn or_clone(&self, current: &T) -> T
    where
        T: Clone,
    {
        match self {
            Field::Value(v) => v.clone(),
            _ => current.clone(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

/// Partial user body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub id: Field<u32>,
    #[serde(default)]
    pub first_name: Field<String>,
    #[serde(default)]
    pub last_name: Field<String>,
    #[serde(default)]
    pub email: Field<String>,
    #[serde(default)]
    pub gender: Field<Gender>,
    #[serde(default)]
    pub birth_date: Field<i64>,
}

/// Partial location body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    #[serde(default)]
    pub id: Field<u32>,
    #[serde(default)]
    pub city: Field<String>,
    #[serde(default)]
    pub country: Field<String>,
    #[serde(default)]
    pub place: Field<String>,
    #[serde(default)]
    pub distance: Field<u32>,
}

/// Partial visit body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitPatch {
    #[serde(default)]
    pub id: Field<u32>,
    #[serde(default, rename = "user")]
    pub user_id: Field<u32>,
    #[serde(default, rename = "location")]
    pub location_id: Field<u32>,
    #[serde(default)]
    pub visited_at: Field<i64>,
    #[serde(default)]
    pub mark: Field<u8>,
}

fn reject_nulls(fields: &[(&str, bool)]) -> Result<()> {
    for (name, is_null) in fields {
        if *is_null {
            return Err(Error::BadPayload(format!("explicit null for {}", name)));
        }
    }
    Ok(())
}

/// Parse a user body. Fails on malformed JSON, wrong field types and
/// explicit nulls.
pub fn parse_user_patch(body: &[u8]) -> Result<UserPatch> {
    let patch: UserPatch = serde_json::from_slice(body)
        .map_err(|e| Error::BadPayload(format!("invalid user body: {}", e)))?;
    reject_nulls(&[
        ("id", patch.id.is_null()),
        ("first_name", patch.first_name.is_null()),
        ("last_name", patch.last_name.is_null()),
        ("email", patch.email.is_null()),
        ("gender", patch.gender.is_null()),
        ("birth_date", patch.birth_date.is_null()),
    ])?;
    Ok(patch)
}

/// Parse a location body.
pub fn parse_location_patch(body: &[u8]) -> Result<LocationPatch> {
    let patch: LocationPatch = serde_json::from_slice(body)
        .map_err(|e| Error::BadPayload(format!("invalid location body: {}", e)))?;
    reject_nulls(&[
        ("id", patch.id.is_null()),
        ("city", patch.city.is_null()),
        ("country", patch.country.is_null()),
        ("place", patch.place.is_null()),
        ("distance", patch.distance.is_null()),
    ])?;
    Ok(patch)
}

/// Parse a visit body.
pub fn parse_visit_patch(body: &[u8]) -> Result<VisitPatch> {
    let patch: VisitPatch = serde_json::from_slice(body)
        .map_err(|e| Error::BadPayload(format!("invalid visit body: {}", e)))?;
    reject_nulls(&[
        ("id", patch.id.is_null()),
        ("user", patch.user_id.is_null()),
        ("location", patch.location_id.is_null()),
        ("visited_at", patch.visited_at.is_null()),
        ("mark", patch.mark.is_null()),
    ])?;
    Ok(patch)
}

impl UserPatch {
    /// Id carried by the body, if any.
    pub fn id(&self) -> Option<u32> {
        self.id.value().copied()
    }

    /// Build a new user from a create body. An absent id maps to 0 so the
    /// store can report `MissingId`; the remaining required fields must be
    /// present and valid.
    pub fn into_new(self) -> Result<User> {
        let user = User {
            id: self.id.into_value().unwrap_or(0),
            first_name: self.first_name.into_value().unwrap_or_default(),
            last_name: self.last_name.into_value().unwrap_or_default(),
            email: self.email.into_value().unwrap_or_default(),
            gender: self
                .gender
                .into_value()
                .ok_or_else(|| Error::Validation("gender is required".to_string()))?,
            birth_date: self
                .birth_date
                .into_value()
                .ok_or_else(|| Error::Validation("birth_date is required".to_string()))?,
        };
        validate_user(&user)?;
        Ok(user)
    }

    /// Merge present fields onto an existing record. The result still needs
    /// [`validate_user`].
    pub fn apply_to(&self, current: &User) -> User {
        User {
            id: current.id,
            first_name: self.first_name.or_clone(&current.first_name),
            last_name: self.last_name.or_clone(&current.last_name),
            email: self.email.or_clone(&current.email),
            gender: self.gender.or_clone(&current.gender),
            birth_date: self.birth_date.or_clone(&current.birth_date),
        }
    }
}

impl LocationPatch {
    pub fn id(&self) -> Option<u32> {
        self.id.value().copied()
    }

    pub fn into_new(self) -> Result<Location> {
        let location = Location {
            id: self.id.into_value().unwrap_or(0),
            city: self.city.into_value().unwrap_or_default(),
            country: self.country.into_value().unwrap_or_default(),
            place: self.place.into_value().unwrap_or_default(),
            distance: self.distance.into_value().unwrap_or_default(),
        };
        validate_location(&location)?;
        Ok(location)
    }

    pub fn apply_to(&self, current: &Location) -> Location {
        Location {
            id: current.id,
            city: self.city.or_clone(&current.city),
            country: self.country.or_clone(&current.country),
            place: self.place.or_clone(&current.place),
            distance: self.distance.or_clone(&current.distance),
        }
    }
}

impl VisitPatch {
    pub fn id(&self) -> Option<u32> {
        self.id.value().copied()
    }

    pub fn into_new(self) -> Result<Visit> {
        let visit = Visit {
            id: self.id.into_value().unwrap_or(0),
            user_id: self.user_id.into_value().unwrap_or(0),
            location_id: self.location_id.into_value().unwrap_or(0),
            visited_at: self
                .visited_at
                .into_value()
                .ok_or_else(|| Error::Validation("visited_at is required".to_string()))?,
            mark: self.mark.into_value().unwrap_or(0),
        };
        validate_visit(&visit)?;
        Ok(visit)
    }

    pub fn apply_to(&self, current: &Visit) -> Visit {
        Visit {
            id: current.id,
            user_id: self.user_id.or_clone(&current.user_id),
            location_id: self.location_id.or_clone(&current.location_id),
            visited_at: self.visited_at.or_clone(&current.visited_at),
            mark: self.mark.or_clone(&current.mark),
        }
    }
}

fn check_text(field: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max_chars {
        return Err(Error::Validation(format!(
            "{} exceeds {} characters",
            field, max_chars
        )));
    }
    Ok(())
}

/// Validate a full user record. The id itself is checked by the store.
pub(crate) fn validate_user(user: &User) -> Result<()> {
    check_text("first_name", &user.first_name, 50)?;
    check_text("last_name", &user.last_name, 50)?;
    check_text("email", &user.email, 100)?;
    Ok(())
}

/// Validate a full location record.
pub(crate) fn validate_location(location: &Location) -> Result<()> {
    check_text("city", &location.city, 50)?;
    check_text("country", &location.country, 50)?;
    if location.place.is_empty() {
        return Err(Error::Validation("place must not be empty".to_string()));
    }
    if location.distance == 0 {
        return Err(Error::Validation("distance must be positive".to_string()));
    }
    Ok(())
}

/// Validate a full visit record.
pub(crate) fn validate_visit(visit: &Visit) -> Result<()> {
    if visit.user_id == 0 {
        return Err(Error::Validation("user is required".to_string()));
    }
    if visit.location_id == 0 {
        return Err(Error::Validation("location is required".to_string()));
    }
    if visit.mark > 5 {
        return Err(Error::Validation(
            "mark must be between 0 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Canonical encoding of a user record. Compact, keys in declaration order.
pub(crate) fn encode_user(user: &User) -> Bytes {
    Bytes::from(serde_json::to_vec(user).expect("user serialization cannot fail"))
}

/// Canonical encoding of a location record.
pub(crate) fn encode_location(location: &Location) -> Bytes {
    Bytes::from(serde_json::to_vec(location).expect("location serialization cannot fail"))
}

/// Canonical encoding of a visit record.
pub(crate) fn encode_visit(visit: &Visit) -> Bytes {
    Bytes::from(serde_json::to_vec(visit).expect("visit serialization cannot fail"))
}

/// Round an average to five fractional digits, half away from zero, and
/// return it scaled by 100_000. Marks are non-negative, so rounding toward
/// positive infinity is equivalent.
pub fn round_avg(avg: f64) -> i64 {
    (avg * 100_000.0 + 0.5).floor() as i64
}

/// Render a scaled average without trailing zeros: `0`, `3`, `4.375`,
/// `2.65217`.
pub fn format_avg(scaled: i64) -> String {
    let whole = scaled / 100_000;
    let frac = scaled % 100_000;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:05}", frac);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Unix timestamp of `now` shifted back by `years` calendar years, keeping
/// month, day and time of day. Feb 29 in a non-leap target year normalizes
/// to Mar 1, matching civil-age conventions.
pub fn years_before(now: i64, years: u32) -> i64 {
    let Some(dt) = DateTime::from_timestamp(now, 0) else {
        return now;
    };
    let date = dt.date_naive();
    let target_year = date.year() - years as i32;
    let shifted = NaiveDate::from_ymd_opt(target_year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(target_year, 3, 1));
    match shifted {
        Some(d) => d.and_time(dt.time()).and_utc().timestamp(),
        None => now,
    }
}
