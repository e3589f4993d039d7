//! Sparse, time-keyed position history.
//!
//! A [`Timeline`] maps simulation time (s) to a recorded position (km) for
//! one body. It is an ordered map, so iteration is always in strictly
//! increasing time and a repeated timestamp overwrites the earlier entry.
//! [`Trajectories`] groups one timeline per body name.
//!
//! # Blob format
//! Timelines are persisted as a JSON object whose keys are the time in
//! seconds rendered as a float string:
//!
//! ```json
//! { "0.0": [384400.0, 0.0, 0.0], "3120.0": [384399.1, 3188.6, 0.0] }
//! ```
//!
//! Any key that parses as a finite float is accepted on the way in.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::states::NVec3;

/// Totally ordered timestamp. Only finite values are ever stored and
/// `-0.0` is folded into `0.0` so both land on the same key.
#[derive(Debug, Clone, Copy)]
pub struct TimeKey(f64);

impl TimeKey {
    pub fn new(t: f64) -> Option<Self> {
        t.is_finite().then_some(TimeKey(t + 0.0))
    }

    pub fn seconds(self) -> f64 {
        self.0
    }
}

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ordered time -> position history of a single body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: BTreeMap<TimeKey, NVec3>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite the entry at `time`. Non-finite times are dropped.
    pub fn append(&mut self, time: f64, position: NVec3) {
        match TimeKey::new(time) {
            Some(key) => {
                self.entries.insert(key, position);
            }
            None => log::warn!("dropping snapshot with non-finite time {time}"),
        }
    }

    /// Fold `other` into `self`; on equal timestamps `other` wins.
    pub fn merge(&mut self, other: Timeline) {
        self.entries.extend(other.entries);
    }

    /// Position recorded at exactly `time`, if any.
    pub fn get(&self, time: f64) -> Option<&NVec3> {
        TimeKey::new(time).and_then(|k| self.entries.get(&k))
    }

    /// Entries in time order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (f64, &NVec3)> + '_ {
        self.entries.iter().map(|(k, p)| (k.seconds(), p))
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.keys().map(|k| k.seconds())
    }

    pub fn first(&self) -> Option<(f64, &NVec3)> {
        self.entries.iter().next().map(|(k, p)| (k.seconds(), p))
    }

    pub fn last(&self) -> Option<(f64, &NVec3)> {
        self.entries.iter().next_back().map(|(k, p)| (k.seconds(), p))
    }

    /// True when `time` lies between the first and the last entry, inclusive.
    pub fn covers(&self, time: f64) -> bool {
        match (TimeKey::new(time), self.entries.keys().next(), self.entries.keys().next_back()) {
            (Some(key), Some(first), Some(last)) => *first <= key && key <= *last,
            _ => false,
        }
    }

    /// All entries with `start <= t <= end`, in time order. Empty when the
    /// bounds are reversed or not finite.
    pub fn range(&self, start: f64, end: f64) -> Timeline {
        let (Some(lo), Some(hi)) = (TimeKey::new(start), TimeKey::new(end)) else {
            return Timeline::new();
        };
        if lo > hi {
            return Timeline::new();
        }
        Timeline {
            entries: self
                .entries
                .range((Included(lo), Included(hi)))
                .map(|(k, p)| (*k, *p))
                .collect(),
        }
    }

    /// Drop every entry strictly after `time`.
    pub fn truncate_after(&mut self, time: f64) {
        if let Some(key) = TimeKey::new(time) {
            let mut tail = self.entries.split_off(&key);
            // split_off keeps `key` itself in the tail
            if let Some(p) = tail.remove(&key) {
                self.entries.insert(key, p);
            }
        }
    }

    /// Interpolated `(position, velocity)` at `target`.
    ///
    /// - before the first entry: first position, `fallback_velocity`
    /// - at or after the last entry: last position, `fallback_velocity`
    /// - otherwise linear interpolation between the bracketing entries
    ///   `t0 <= target < t1`, velocity is their finite difference
    ///
    /// This is positional only and does not re-integrate anything.
    /// Returns `None` on an empty timeline or a non-finite `target`.
    pub fn state_at(&self, target: f64, fallback_velocity: NVec3) -> Option<(NVec3, NVec3)> {
        let key = TimeKey::new(target)?;
        let (first_t, first_p) = self.entries.iter().next()?;
        if key < *first_t {
            return Some((*first_p, fallback_velocity));
        }

        let (t0, p0) = self.entries.range((Unbounded, Included(key))).next_back()?;
        let Some((t1, p1)) = self.entries.range((Excluded(key), Unbounded)).next() else {
            return Some((*p0, fallback_velocity));
        };

        let span = t1.seconds() - t0.seconds();
        let alpha = (target - t0.seconds()) / span;
        let position = if alpha == 0.0 { *p0 } else { p0 + alpha * (p1 - p0) };
        let velocity = (p1 - p0) / span;
        Some((position, velocity))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(blob: &str) -> serde_json::Result<Self> {
        serde_json::from_str(blob)
    }

    /// Decode a persisted blob; anything unreadable counts as no history.
    pub fn from_json_or_empty(blob: &str) -> Self {
        if blob.trim().is_empty() {
            return Timeline::new();
        }
        Self::from_json(blob).unwrap_or_else(|e| {
            log::warn!("malformed timeline blob treated as empty: {e}");
            Timeline::new()
        })
    }
}

impl FromIterator<(f64, NVec3)> for Timeline {
    fn from_iter<I: IntoIterator<Item = (f64, NVec3)>>(iter: I) -> Self {
        let mut timeline = Timeline::new();
        for (t, p) in iter {
            timeline.append(t, p);
        }
        timeline
    }
}

impl Serialize for Timeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, p) in &self.entries {
            map.serialize_entry(&format!("{:?}", k.seconds()), &[p.x, p.y, p.z])?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Timeline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<f64>>::deserialize(deserializer)?;
        let mut timeline = Timeline::new();
        for (key, components) in raw {
            let key_t = key
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(TimeKey::new)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp key {key:?}")))?;
            let &[x, y, z] = components.as_slice() else {
                return Err(D::Error::custom(format!(
                    "position at {key:?} has {} components, expected 3",
                    components.len()
                )));
            };
            timeline.entries.insert(key_t, NVec3::new(x, y, z));
        }
        Ok(timeline)
    }
}

/// One timeline per body, keyed by body name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectories {
    timelines: BTreeMap<String, Timeline>,
}

impl Trajectories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Timeline> {
        self.timelines.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Timeline> {
        self.timelines.get_mut(name)
    }

    /// Timeline for `name`, created empty if missing.
    pub fn timeline_mut(&mut self, name: &str) -> &mut Timeline {
        self.timelines.entry(name.to_owned()).or_default()
    }

    pub fn insert(&mut self, name: impl Into<String>, timeline: Timeline) {
        self.timelines.insert(name.into(), timeline);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Timeline)> {
        self.timelines.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Merge per body; incoming entries win on equal timestamps.
    pub fn merge(&mut self, other: Trajectories) {
        for (name, timeline) in other.timelines {
            self.timeline_mut(&name).merge(timeline);
        }
    }

    /// Latest timestamp across every body.
    pub fn latest_time(&self) -> Option<f64> {
        self.timelines
            .values()
            .filter_map(|t| t.last().map(|(time, _)| time))
            .reduce(f64::max)
    }

    /// Per-body `start <= t <= end` filter. Bodies with no entries in the
    /// window are left out.
    pub fn range(&self, start: f64, end: f64) -> Trajectories {
        Trajectories {
            timelines: self
                .timelines
                .iter()
                .map(|(n, t)| (n.clone(), t.range(start, end)))
                .filter(|(_, t)| !t.is_empty())
                .collect(),
        }
    }
}

impl FromIterator<(String, Timeline)> for Trajectories {
    fn from_iter<I: IntoIterator<Item = (String, Timeline)>>(iter: I) -> Self {
        Self {
            timelines: iter.into_iter().collect(),
        }
    }
}
