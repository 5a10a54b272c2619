//! The travels storage-and-query engine.
//!
//! [`TravelDb`] owns the three primary tables, the email uniqueness map and
//! the two families of time-ordered visit indices, all behind a single
//! reader/writer lock. The workload is read-dominant and every operation is
//! short, so one coarse lock beats fine-grained schemes on per-request
//! latency. Queries take shared access, mutations exclusive; no operation
//! ever blocks while holding the lock.
//!
//! Every mutation leaves the indices coherent with the tables and the
//! cached canonical JSON in sync with the record, so reads can answer
//! straight from the caches.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use crate::codec::{self, LocationPatch, UserPatch, VisitPatch};
use crate::error::{Error, Result};
use crate::index::VisitIndex;
use crate::model::{Location, LocationAvgQuery, User, UserVisit, UserVisitsQuery, Visit};
use crate::table::{ensure_parallel_len, Table};

/// Slots pre-allocated per table at startup.
const INITIAL_CAPACITY: usize = 10_000;

/// Occupancy counts for the three primary tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
}

/// Outcome of one bulk create batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub created: usize,
    pub skipped: usize,
}

struct Inner {
    users: Table<User>,
    locations: Table<Location>,
    visits: Table<Visit>,
    /// email → user id, kept in lockstep with the users table.
    emails: HashMap<String, u32>,
    /// Indexed by user id, allocated when the user is created.
    visits_by_user: Vec<Option<VisitIndex>>,
    /// Indexed by location id, allocated when the location is created.
    visits_by_location: Vec<Option<VisitIndex>>,
}

/// In-memory store for users, locations and visits.
pub struct TravelDb {
    inner: RwLock<Inner>,
}

impl Default for TravelDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TravelDb {
    pub fn new() -> Self {
        TravelDb {
            inner: RwLock::new(Inner {
                users: Table::with_capacity(INITIAL_CAPACITY),
                locations: Table::with_capacity(INITIAL_CAPACITY),
                visits: Table::with_capacity(INITIAL_CAPACITY),
                emails: HashMap::with_capacity(INITIAL_CAPACITY),
                visits_by_user: Vec::new(),
                visits_by_location: Vec::new(),
            }),
        }
    }

    // ---- users ----

    pub fn create_user(&self, user: User) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Inner::create_user(&mut inner, user)
    }

    /// Create a batch of users under one lock acquisition. Rows that fail
    /// are logged and skipped; the benchmark data is trusted.
    pub fn create_users(&self, users: Vec<User>) -> BulkOutcome {
        let mut inner = self.inner.write().unwrap();
        let mut outcome = BulkOutcome::default();
        for user in users {
            let id = user.id;
            match Inner::create_user(&mut inner, user) {
                Ok(()) => outcome.created += 1,
                Err(err) => {
                    tracing::warn!("skipping user {}: {}", id, err);
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }

    /// Read-merge-validate-store. The body id, when present, must match
    /// `id`; an email change rewrites the uniqueness map in the same
    /// critical section.
    pub fn update_user(&self, id: u32, patch: UserPatch) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let current = match inner.users.get(id) {
            Some(slot) => slot.record.clone(),
            None => return Err(Error::NotFound),
        };
        if let Some(body_id) = patch.id() {
            if body_id != id {
                return Err(Error::UpdateId);
            }
        }
        let next = patch.apply_to(&current);
        codec::validate_user(&next)?;
        if let Some(&owner) = inner.emails.get(&next.email) {
            if owner != id {
                return Err(Error::Duplicate);
            }
        }
        if current.email != next.email {
            inner.emails.remove(&current.email);
            inner.emails.insert(next.email.clone(), id);
        }
        let json = codec::encode_user(&next);
        inner.users.put(id, next, json);
        Ok(())
    }

    pub fn get_user(&self, id: u32) -> Result<User> {
        let inner = self.inner.read().unwrap();
        inner
            .users
            .get(id)
            .map(|slot| slot.record.clone())
            .ok_or(Error::NotFound)
    }

    /// Cached canonical encoding; cloning `Bytes` is a refcount bump.
    pub fn get_user_json(&self, id: u32) -> Result<Bytes> {
        let inner = self.inner.read().unwrap();
        inner
            .users
            .get(id)
            .map(|slot| slot.json.clone())
            .ok_or(Error::NotFound)
    }

    /// Visits of one user, ascending by `visited_at`, filtered per `query`.
    /// Both date bounds are exclusive.
    pub fn get_user_visits(&self, id: u32, query: &UserVisitsQuery) -> Result<Vec<UserVisit>> {
        let inner = self.inner.read().unwrap();
        let index = inner
            .visits_by_user
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFound)?;

        let mut results = Vec::with_capacity(index.len());
        for (visited_at, visit_id) in index.iter() {
            if query.from_date.is_some_and(|from| visited_at <= from)
                || query.to_date.is_some_and(|to| visited_at >= to)
            {
                continue;
            }
            let Some(visit) = inner.visits.get(visit_id).map(|s| &s.record) else {
                continue;
            };
            let Some(location) = inner.locations.get(visit.location_id).map(|s| &s.record)
            else {
                continue;
            };
            if query
                .country
                .as_ref()
                .is_some_and(|country| location.country != *country)
            {
                continue;
            }
            if query.to_distance.is_some_and(|max| location.distance >= max) {
                continue;
            }
            results.push(UserVisit {
                mark: visit.mark,
                visited_at,
                place: location.place.clone(),
            });
        }
        Ok(results)
    }

    // ---- locations ----

    pub fn create_location(&self, location: Location) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Inner::create_location(&mut inner, location)
    }

    pub fn create_locations(&self, locations: Vec<Location>) -> BulkOutcome {
        let mut inner = self.inner.write().unwrap();
        let mut outcome = BulkOutcome::default();
        for location in locations {
            let id = location.id;
            match Inner::create_location(&mut inner, location) {
                Ok(()) => outcome.created += 1,
                Err(err) => {
                    tracing::warn!("skipping location {}: {}", id, err);
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }

    /// Update a location. Visits are not re-keyed: only the joined data
    /// returned by the visits query changes.
    pub fn update_location(&self, id: u32, patch: LocationPatch) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let current = match inner.locations.get(id) {
            Some(slot) => slot.record.clone(),
            None => return Err(Error::NotFound),
        };
        if let Some(body_id) = patch.id() {
            if body_id != id {
                return Err(Error::UpdateId);
            }
        }
        let next = patch.apply_to(&current);
        codec::validate_location(&next)?;
        let json = codec::encode_location(&next);
        inner.locations.put(id, next, json);
        Ok(())
    }

    pub fn get_location(&self, id: u32) -> Result<Location> {
        let inner = self.inner.read().unwrap();
        inner
            .locations
            .get(id)
            .map(|slot| slot.record.clone())
            .ok_or(Error::NotFound)
    }

    pub fn get_location_json(&self, id: u32) -> Result<Bytes> {
        let inner = self.inner.read().unwrap();
        inner
            .locations
            .get(id)
            .map(|slot| slot.json.clone())
            .ok_or(Error::NotFound)
    }

    /// Average mark of a location's visits after filtering, 0.0 when no
    /// visit survives. `now` anchors the age filters; it is fixed at
    /// startup from the data-generation timestamp.
    pub fn get_location_avg(
        &self,
        id: u32,
        query: &LocationAvgQuery,
        now: i64,
    ) -> Result<f64> {
        let inner = self.inner.read().unwrap();
        let index = inner
            .visits_by_location
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFound)?;

        // Larger age means earlier birth, hence the swap.
        let from_birth = query.to_age.map(|age| codec::years_before(now, age));
        let to_birth = query.from_age.map(|age| codec::years_before(now, age));
        let needs_user = from_birth.is_some() || to_birth.is_some() || query.gender.is_some();

        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for (visited_at, visit_id) in index.iter() {
            if query.from_date.is_some_and(|from| visited_at <= from)
                || query.to_date.is_some_and(|to| visited_at >= to)
            {
                continue;
            }
            let Some(visit) = inner.visits.get(visit_id).map(|s| &s.record) else {
                continue;
            };
            if needs_user {
                let Some(user) = inner.users.get(visit.user_id).map(|s| &s.record) else {
                    continue;
                };
                if from_birth.is_some_and(|from| user.birth_date <= from)
                    || to_birth.is_some_and(|to| user.birth_date >= to)
                    || query.gender.is_some_and(|gender| user.gender != gender)
                {
                    continue;
                }
            }
            sum += u64::from(visit.mark);
            count += 1;
        }

        if count > 0 {
            Ok(sum as f64 / count as f64)
        } else {
            Ok(0.0)
        }
    }

    // ---- visits ----

    pub fn create_visit(&self, visit: Visit) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Inner::create_visit(&mut inner, visit)
    }

    /// Bulk visit creation. Referential failures are expected for malformed
    /// benchmark rows and are skipped, as are any other per-row errors.
    pub fn create_visits(&self, visits: Vec<Visit>) -> BulkOutcome {
        let mut inner = self.inner.write().unwrap();
        let mut outcome = BulkOutcome::default();
        for visit in visits {
            let id = visit.id;
            match Inner::create_visit(&mut inner, visit) {
                Ok(()) => outcome.created += 1,
                Err(err) => {
                    tracing::warn!("skipping visit {}: {}", id, err);
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }

    /// Update a visit and restore index coherence. The user-side and
    /// location-side adjustments are independent: a visit can move users
    /// without moving locations and vice versa.
    pub fn update_visit(&self, id: u32, patch: VisitPatch) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let prev = match inner.visits.get(id) {
            Some(slot) => slot.record.clone(),
            None => return Err(Error::NotFound),
        };
        if let Some(body_id) = patch.id() {
            if body_id != id {
                return Err(Error::UpdateId);
            }
        }
        let next = patch.apply_to(&prev);
        codec::validate_visit(&next)?;
        if next.user_id != prev.user_id && !inner.has_user_index(next.user_id) {
            return Err(Error::NotFound);
        }
        if next.location_id != prev.location_id && !inner.has_location_index(next.location_id) {
            return Err(Error::NotFound);
        }

        if prev.user_id != next.user_id || prev.visited_at != next.visited_at {
            if let Some(Some(index)) = inner.visits_by_user.get_mut(prev.user_id as usize) {
                index.remove(prev.visited_at, id);
            }
            if let Some(Some(index)) = inner.visits_by_user.get_mut(next.user_id as usize) {
                index.insert(next.visited_at, id);
            }
        }
        if prev.location_id != next.location_id || prev.visited_at != next.visited_at {
            if let Some(Some(index)) = inner.visits_by_location.get_mut(prev.location_id as usize)
            {
                index.remove(prev.visited_at, id);
            }
            if let Some(Some(index)) = inner.visits_by_location.get_mut(next.location_id as usize)
            {
                index.insert(next.visited_at, id);
            }
        }

        let json = codec::encode_visit(&next);
        inner.visits.put(id, next, json);
        Ok(())
    }

    pub fn get_visit(&self, id: u32) -> Result<Visit> {
        let inner = self.inner.read().unwrap();
        inner
            .visits
            .get(id)
            .map(|slot| slot.record.clone())
            .ok_or(Error::NotFound)
    }

    pub fn get_visit_json(&self, id: u32) -> Result<Bytes> {
        let inner = self.inner.read().unwrap();
        inner
            .visits
            .get(id)
            .map(|slot| slot.json.clone())
            .ok_or(Error::NotFound)
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read().unwrap();
        StoreStats {
            users: inner.users.len(),
            locations: inner.locations.len(),
            visits: inner.visits.len(),
        }
    }
}

impl Inner {
    fn has_user_index(&self, id: u32) -> bool {
        matches!(self.visits_by_user.get(id as usize), Some(Some(_)))
    }

    fn has_location_index(&self, id: u32) -> bool {
        matches!(self.visits_by_location.get(id as usize), Some(Some(_)))
    }

    fn create_user(inner: &mut Inner, user: User) -> Result<()> {
        if user.id == 0 {
            return Err(Error::MissingId);
        }
        if inner.users.contains(user.id) {
            return Err(Error::Duplicate);
        }
        if inner.emails.contains_key(&user.email) {
            return Err(Error::Duplicate);
        }
        let json = codec::encode_user(&user);
        inner.emails.insert(user.email.clone(), user.id);
        ensure_parallel_len(&mut inner.visits_by_user, user.id);
        inner.visits_by_user[user.id as usize] = Some(VisitIndex::new());
        inner.users.put(user.id, user, json);
        Ok(())
    }

    fn create_location(inner: &mut Inner, location: Location) -> Result<()> {
        if location.id == 0 {
            return Err(Error::MissingId);
        }
        if inner.locations.contains(location.id) {
            return Err(Error::Duplicate);
        }
        let json = codec::encode_location(&location);
        ensure_parallel_len(&mut inner.visits_by_location, location.id);
        inner.visits_by_location[location.id as usize] = Some(VisitIndex::new());
        inner.locations.put(location.id, location, json);
        Ok(())
    }

    fn create_visit(inner: &mut Inner, visit: Visit) -> Result<()> {
        if visit.id == 0 {
            return Err(Error::MissingId);
        }
        if inner.visits.contains(visit.id) {
            return Err(Error::Duplicate);
        }
        if !inner.has_user_index(visit.user_id) {
            return Err(Error::NotFound);
        }
        if !inner.has_location_index(visit.location_id) {
            return Err(Error::NotFound);
        }
        let json = codec::encode_visit(&visit);
        if let Some(Some(index)) = inner.visits_by_user.get_mut(visit.user_id as usize) {
            index.insert(visit.visited_at, visit.id);
        }
        if let Some(Some(index)) = inner.visits_by_location.get_mut(visit.location_id as usize) {
            index.insert(visit.visited_at, visit.id);
        }
        inner.visits.put(visit.id, visit, json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse_location_patch, parse_user_patch, parse_visit_patch};
    use crate::model::Gender;

    fn user(id: u32, email: &str) -> User {
        User {
            id,
            first_name: "First".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            gender: Gender::Male,
            birth_date: 100_000,
        }
    }

    fn location(id: u32, country: &str, place: &str, distance: u32) -> Location {
        Location {
            id,
            city: "Moscow".to_string(),
            country: country.to_string(),
            place: place.to_string(),
            distance,
        }
    }

    fn visit(id: u32, user_id: u32, location_id: u32, visited_at: i64, mark: u8) -> Visit {
        Visit {
            id,
            user_id,
            location_id,
            visited_at,
            mark,
        }
    }

    /// Users 1-2, locations 1-3, visits (1,u1,l1,100,2), (2,u2,l2,200,3),
    /// (3,u1,l3,300,4).
    fn seeded_db() -> TravelDb {
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();
        db.create_user(user(2, "two@x")).unwrap();
        db.create_location(location(1, "Russia", "First Place", 10))
            .unwrap();
        db.create_location(location(2, "Egypt", "Second Place", 20))
            .unwrap();
        db.create_location(location(3, "Russia", "Third Place", 30))
            .unwrap();
        db.create_visit(visit(1, 1, 1, 100, 2)).unwrap();
        db.create_visit(visit(2, 2, 2, 200, 3)).unwrap();
        db.create_visit(visit(3, 1, 3, 300, 4)).unwrap();
        db
    }

    #[test]
    fn should_round_trip_created_user() {
        // given
        let db = TravelDb::new();
        let u = user(1, "foo@bar.com");

        // when
        db.create_user(u.clone()).unwrap();

        // then
        assert_eq!(db.get_user(1).unwrap(), u);
        assert_eq!(db.get_user(2), Err(Error::NotFound));
    }

    #[test]
    fn should_keep_cached_json_equal_to_fresh_encode() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "foo@bar.com")).unwrap();

        // when
        let cached = db.get_user_json(1).unwrap();
        let fresh = serde_json::to_vec(&db.get_user(1).unwrap()).unwrap();

        // then
        assert_eq!(cached.as_ref(), fresh.as_slice());
    }

    #[test]
    fn should_reject_zero_and_duplicate_ids() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "a@x")).unwrap();

        // when/then
        assert_eq!(db.create_user(user(0, "b@x")), Err(Error::MissingId));
        assert_eq!(db.create_user(user(1, "c@x")), Err(Error::Duplicate));
    }

    #[test]
    fn should_reject_duplicate_email_on_create() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "same@x")).unwrap();

        // when/then
        assert_eq!(db.create_user(user(2, "same@x")), Err(Error::Duplicate));
    }

    #[test]
    fn should_remap_email_on_update() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "old@x")).unwrap();

        // when
        let patch = parse_user_patch(br#"{"email":"new@x"}"#).unwrap();
        db.update_user(1, patch).unwrap();

        // then - the old address is free again, the new one is taken
        assert!(db.create_user(user(2, "old@x")).is_ok());
        assert_eq!(db.create_user(user(3, "new@x")), Err(Error::Duplicate));
        assert_eq!(db.get_user(1).unwrap().email, "new@x");
    }

    #[test]
    fn should_reject_update_stealing_anothers_email() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();
        db.create_user(user(2, "two@x")).unwrap();

        // when
        let patch = parse_user_patch(br#"{"email":"one@x"}"#).unwrap();
        let result = db.update_user(2, patch);

        // then
        assert_eq!(result, Err(Error::Duplicate));
    }

    #[test]
    fn should_allow_update_keeping_own_email() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();

        // when - body repeats the stored email
        let patch = parse_user_patch(br#"{"first_name":"Updated","email":"one@x"}"#).unwrap();

        // then
        assert!(db.update_user(1, patch).is_ok());
        assert_eq!(db.get_user(1).unwrap().first_name, "Updated");
    }

    #[test]
    fn should_reject_id_change_on_update() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();

        // when
        let patch = parse_user_patch(br#"{"id":2,"email":"new@x"}"#).unwrap();

        // then
        assert_eq!(db.update_user(1, patch), Err(Error::UpdateId));
        // the record is untouched
        assert_eq!(db.get_user(1).unwrap().email, "one@x");
    }

    #[test]
    fn should_report_not_found_for_update_of_absent_user() {
        // given
        let db = TravelDb::new();

        // when
        let patch = parse_user_patch(br#"{"first_name":"X"}"#).unwrap();

        // then
        assert_eq!(db.update_user(5, patch), Err(Error::NotFound));
    }

    #[test]
    fn should_reject_invalid_merged_record() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();

        // when - merging an empty first name is invalid even though the
        // patch itself parses
        let patch = parse_user_patch(br#"{"first_name":""}"#).unwrap();

        // then
        assert!(matches!(
            db.update_user(1, patch),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn should_reject_visit_with_unknown_references() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();
        db.create_location(location(1, "Russia", "Place", 10)).unwrap();

        // when/then
        assert_eq!(db.create_visit(visit(1, 9, 1, 0, 1)), Err(Error::NotFound));
        assert_eq!(db.create_visit(visit(1, 1, 9, 0, 1)), Err(Error::NotFound));
        assert!(db.create_visit(visit(1, 1, 1, 0, 1)).is_ok());
    }

    #[test]
    fn should_list_user_visits_in_timestamp_order() {
        // given
        let db = seeded_db();

        // when
        let visits = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();

        // then
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].visited_at, 100);
        assert_eq!(visits[0].place, "First Place");
        assert_eq!(visits[1].visited_at, 300);
        assert_eq!(visits[1].place, "Third Place");
    }

    #[test]
    fn should_apply_strict_date_bounds_to_user_visits() {
        // given
        let db = seeded_db();

        // when - bounds land exactly on the stored timestamps
        let query = UserVisitsQuery {
            from_date: Some(100),
            to_date: Some(300),
            ..Default::default()
        };
        let visits = db.get_user_visits(1, &query).unwrap();

        // then - both endpoints are excluded
        assert!(visits.is_empty());

        // when - widening each bound by one admits the endpoints
        let query = UserVisitsQuery {
            from_date: Some(99),
            to_date: Some(301),
            ..Default::default()
        };
        let visits = db.get_user_visits(1, &query).unwrap();

        // then
        assert_eq!(visits.len(), 2);
    }

    #[test]
    fn should_filter_user_visits_by_country_and_distance() {
        // given
        let db = seeded_db();

        // when
        let query = UserVisitsQuery {
            country: Some("Russia".to_string()),
            ..Default::default()
        };
        let visits = db.get_user_visits(1, &query).unwrap();

        // then - both of user 1's visits are in Russia
        assert_eq!(visits.len(), 2);

        // when - toDistance is an exclusive upper bound
        let query = UserVisitsQuery {
            to_distance: Some(30),
            ..Default::default()
        };
        let visits = db.get_user_visits(1, &query).unwrap();

        // then - the distance-30 location is excluded
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].visited_at, 100);
    }

    #[test]
    fn should_report_not_found_for_unknown_user_visits() {
        // given
        let db = seeded_db();

        // when/then
        assert_eq!(
            db.get_user_visits(99, &UserVisitsQuery::default()),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn should_return_empty_visits_for_user_without_any() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();

        // when
        let visits = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();

        // then
        assert!(visits.is_empty());
    }

    #[test]
    fn should_move_visit_between_users_on_update() {
        // given
        let db = seeded_db();

        // when - visit 3 moves from user 1 to user 2
        let patch =
            parse_visit_patch(br#"{"user":2,"location":3,"visited_at":300,"mark":2}"#).unwrap();
        db.update_visit(3, patch).unwrap();

        // then
        let first = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].visited_at, 100);

        let second = db.get_user_visits(2, &UserVisitsQuery::default()).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].visited_at, 200);
        assert_eq!(second[1].visited_at, 300);
        assert_eq!(second[1].mark, 2);
    }

    #[test]
    fn should_rekey_index_when_only_timestamp_changes() {
        // given
        let db = seeded_db();

        // when
        let patch = parse_visit_patch(br#"{"visited_at":50}"#).unwrap();
        db.update_visit(3, patch).unwrap();

        // then - visit 3 now sorts first for user 1
        let visits = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].visited_at, 50);
        assert_eq!(visits[1].visited_at, 100);
    }

    #[test]
    fn should_keep_sibling_entry_when_equal_timestamps_diverge() {
        // given - two visits of one user at the same instant
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();
        db.create_location(location(1, "Russia", "A", 10)).unwrap();
        db.create_location(location(2, "Egypt", "B", 20)).unwrap();
        db.create_visit(visit(1, 1, 1, 100, 1)).unwrap();
        db.create_visit(visit(2, 1, 2, 100, 2)).unwrap();

        // when - one of them moves in time
        let patch = parse_visit_patch(br#"{"visited_at":200}"#).unwrap();
        db.update_visit(2, patch).unwrap();

        // then - the untouched sibling survives
        let visits = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].visited_at, 100);
        assert_eq!(visits[0].mark, 1);
        assert_eq!(visits[1].visited_at, 200);
    }

    #[test]
    fn should_reject_visit_update_to_unknown_user() {
        // given
        let db = seeded_db();

        // when
        let patch = parse_visit_patch(br#"{"user":99}"#).unwrap();

        // then
        assert_eq!(db.update_visit(3, patch), Err(Error::NotFound));
        // indices untouched
        assert_eq!(
            db.get_user_visits(1, &UserVisitsQuery::default())
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn should_reflect_location_update_in_join_output() {
        // given
        let db = seeded_db();

        // when
        let patch = parse_location_patch(br#"{"place":"Renamed"}"#).unwrap();
        db.update_location(1, patch).unwrap();

        // then
        let visits = db.get_user_visits(1, &UserVisitsQuery::default()).unwrap();
        assert_eq!(visits[0].place, "Renamed");
    }

    #[test]
    fn should_average_marks_without_filters() {
        // given
        let db = seeded_db();
        // location 3 gets a second visit: marks 4 and 5
        db.create_visit(visit(4, 2, 3, 400, 5)).unwrap();

        // when
        let avg = db
            .get_location_avg(3, &LocationAvgQuery::default(), 2_000_000)
            .unwrap();

        // then
        assert_eq!(avg, 4.5);
    }

    #[test]
    fn should_average_zero_when_no_visit_survives() {
        // given
        let db = seeded_db();

        // when - location exists but the window excludes everything
        let query = LocationAvgQuery {
            to_date: Some(-1000),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, 2_000_000).unwrap();

        // then
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn should_report_not_found_for_unknown_location_avg() {
        // given
        let db = TravelDb::new();

        // when/then
        assert_eq!(
            db.get_location_avg(15, &LocationAvgQuery::default(), 0),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn should_apply_strict_date_bounds_to_avg() {
        // given
        let db = seeded_db();

        // when - visit 1 sits at exactly fromDate
        let query = LocationAvgQuery {
            from_date: Some(100),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, 2_000_000).unwrap();

        // then
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn should_filter_avg_by_gender() {
        // given
        let db = TravelDb::new();
        let mut her = user(2, "her@x");
        her.gender = Gender::Female;
        db.create_user(user(1, "him@x")).unwrap();
        db.create_user(her).unwrap();
        db.create_location(location(1, "Russia", "Place", 10)).unwrap();
        db.create_visit(visit(1, 1, 1, 100, 5)).unwrap();
        db.create_visit(visit(2, 2, 1, 200, 1)).unwrap();

        // when
        let query = LocationAvgQuery {
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, 2_000_000).unwrap();

        // then
        assert_eq!(avg, 1.0);
    }

    #[test]
    fn should_filter_avg_by_age_window() {
        // given - "now" is 2017-08-01T00:00:00Z
        let now = 1_501_545_600;
        let db = TravelDb::new();

        // born 1987-08-01 (turns exactly 30 at "now") and 1997-03-01 (20)
        let mut thirty = user(1, "thirty@x");
        thirty.birth_date = 554_774_400;
        let mut twenty = user(2, "twenty@x");
        twenty.birth_date = 857_174_400;
        db.create_user(thirty).unwrap();
        db.create_user(twenty).unwrap();
        db.create_location(location(1, "Russia", "Place", 10)).unwrap();
        db.create_visit(visit(1, 1, 1, 100, 5)).unwrap();
        db.create_visit(visit(2, 2, 1, 200, 1)).unwrap();

        // when - fromAge=25 keeps strictly-older-than-25 users only
        let query = LocationAvgQuery {
            from_age: Some(25),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, now).unwrap();

        // then - only the 30-year-old survives
        assert_eq!(avg, 5.0);

        // when - fromAge=30 excludes the user born exactly 30 years ago
        // (strict bound)
        let query = LocationAvgQuery {
            from_age: Some(30),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, now).unwrap();

        // then
        assert_eq!(avg, 0.0);

        // when - toAge=25 keeps strictly-younger users
        let query = LocationAvgQuery {
            to_age: Some(25),
            ..Default::default()
        };
        let avg = db.get_location_avg(1, &query, now).unwrap();

        // then - only the 20-year-old survives
        assert_eq!(avg, 1.0);
    }

    #[test]
    fn should_count_entities_in_stats() {
        // given
        let db = seeded_db();

        // when
        let stats = db.stats();

        // then
        assert_eq!(
            stats,
            StoreStats {
                users: 2,
                locations: 3,
                visits: 3,
            }
        );
    }

    #[test]
    fn should_skip_bad_rows_in_bulk_create() {
        // given
        let db = TravelDb::new();
        db.create_user(user(1, "one@x")).unwrap();
        db.create_location(location(1, "Russia", "Place", 10)).unwrap();

        // when - second row references an unknown user
        let outcome = db.create_visits(vec![
            visit(1, 1, 1, 100, 3),
            visit(2, 42, 1, 200, 4),
            visit(3, 1, 1, 300, 5),
        ]);

        // then
        assert_eq!(outcome, BulkOutcome { created: 2, skipped: 1 });
        assert!(db.get_visit(2).is_err());
        assert_eq!(
            db.get_user_visits(1, &UserVisitsQuery::default())
                .unwrap()
                .len(),
            2
        );
    }
}
