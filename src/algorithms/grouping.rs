//! Proximity grouping of track fixes around named reference locations
//!
//! Every fix is tested against every location (O(fixes × locations)); a fix
//! lands in a location's bucket when it lies within the configured radius,
//! boundary included. Circles may overlap, so one fix can sit in several
//! buckets. Locations sharing a name aggregate into a single bucket.

use crate::algorithms::geodesy::distance_between;
use crate::core::{Location, Position, DEFAULT_GROUPING_RADIUS_M};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do with locations that collected no fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBucketMode {
    /// Omit locations with no fixes from the result
    #[default]
    Drop,
    /// Report them with an empty fix list
    Keep,
}

/// Fixes collected for one location name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBucket {
    pub name: String,
    /// Every input location carrying this name, in input order
    pub locations: Vec<Location>,
    /// Matched fixes, ascending by timestamp
    pub positions: Vec<Position>,
}

impl LocationBucket {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// First expected arrival alert among the same-named locations
    pub fn expected_arrival(&self) -> Option<&str> {
        self.locations
            .iter()
            .find_map(|location| location.expected_arrival.as_deref())
    }

    /// First expected departure alert among the same-named locations
    pub fn expected_departure(&self) -> Option<&str> {
        self.locations
            .iter()
            .find_map(|location| location.expected_departure.as_deref())
    }
}

/// Result of a grouping pass: buckets in first-appearance order of the names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusMatch {
    pub radius_m: f64,
    pub buckets: Vec<LocationBucket>,
}

impl RadiusMatch {
    pub fn get(&self, name: &str) -> Option<&LocationBucket> {
        self.buckets.iter().find(|bucket| bucket.name == name)
    }

    /// Fixes for `name`, or an empty slice when the name has no bucket
    pub fn positions_for(&self, name: &str) -> &[Position] {
        self.get(name).map(|bucket| bucket.positions.as_slice()).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|bucket| bucket.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocationBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of (bucket, fix) memberships
    pub fn total_matches(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.positions.len()).sum()
    }
}

impl<'a> IntoIterator for &'a RadiusMatch {
    type Item = &'a LocationBucket;
    type IntoIter = std::slice::Iter<'a, LocationBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

/// Radius-based grouping engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityGrouper {
    radius_m: f64,
    empty_buckets: EmptyBucketMode,
}

impl Default for ProximityGrouper {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_GROUPING_RADIUS_M,
            empty_buckets: EmptyBucketMode::Drop,
        }
    }
}

impl ProximityGrouper {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            ..Default::default()
        }
    }

    pub fn with_empty_buckets(mut self, mode: EmptyBucketMode) -> Self {
        self.empty_buckets = mode;
        self
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn empty_buckets(&self) -> EmptyBucketMode {
        self.empty_buckets
    }

    /// Bucket `positions` by proximity to `locations`
    pub fn group(&self, positions: &[Position], locations: &[Location]) -> RadiusMatch {
        let mut buckets: Vec<LocationBucket> = Vec::new();
        let mut slot_by_name: HashMap<&str, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(locations.len());

        for location in locations {
            let slot = *slot_by_name.entry(location.name.as_str()).or_insert_with(|| {
                buckets.push(LocationBucket {
                    name: location.name.clone(),
                    locations: Vec::new(),
                    positions: Vec::new(),
                });
                buckets.len() - 1
            });
            buckets[slot].locations.push(location.clone());
            slots.push(slot);
        }

        // Index of the last fix pushed into each bucket; keeps same-named
        // locations from adding one fix twice.
        let mut last_added: Vec<Option<usize>> = vec![None; buckets.len()];

        for (fix_index, position) in positions.iter().enumerate() {
            for (location, &slot) in locations.iter().zip(&slots) {
                if last_added[slot] == Some(fix_index) {
                    continue;
                }
                if distance_between(position, location) <= self.radius_m {
                    buckets[slot].positions.push(position.clone());
                    last_added[slot] = Some(fix_index);
                }
            }
        }

        for bucket in &mut buckets {
            bucket.positions.sort_by_key(|position| position.timestamp);
        }

        if self.empty_buckets == EmptyBucketMode::Drop {
            buckets.retain(|bucket| !bucket.is_empty());
        }

        log::debug!(
            "grouped {} fixes against {} locations (radius {} m): {} buckets, {} matches",
            positions.len(),
            locations.len(),
            self.radius_m,
            buckets.len(),
            buckets.iter().map(|b| b.positions.len()).sum::<usize>()
        );

        RadiusMatch {
            radius_m: self.radius_m,
            buckets,
        }
    }
}

/// One-shot grouping with an explicit radius and empty-bucket mode
pub fn group_by_location(
    positions: &[Position],
    locations: &[Location],
    radius_m: f64,
    empty_buckets: EmptyBucketMode,
) -> RadiusMatch {
    ProximityGrouper::new(radius_m)
        .with_empty_buckets(empty_buckets)
        .group(positions, locations)
}
