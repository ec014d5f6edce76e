//! Pick results and hit queries.
//!
//! Ray casting against the edited geometry happens outside this crate. The
//! embedding view hands over a [`PickResult`] for every event; tools and
//! surface restricters read it through a [`HitQuery`].

use crate::math::EPSILON;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// A set of hit categories, encoded as a bit mask.
///
/// The crate attaches no meaning to individual bits; the embedding editor
/// assigns them (for example one bit for brush faces, one for entities, one
/// for tool handles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HitType(pub u64);

impl HitType {
    pub const NONE: HitType = HitType(0);
    pub const ANY: HitType = HitType(u64::MAX);

    /// The hit type with only bit `index` set.
    ///
    /// # Panics
    /// If `index` is 64 or more. In a `const` this is a compile error.
    pub const fn bit(index: u32) -> Self {
        assert!(index < u64::BITS, "hit type bit index must be below 64");
        HitType(1 << index)
    }

    /// Whether this set shares at least one category with `other`.
    pub fn intersects(self, other: HitType) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for HitType {
    type Output = HitType;

    fn bitor(self, rhs: HitType) -> HitType {
        HitType(self.0 | rhs.0)
    }
}

/// One intersection of the pick ray with something in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub hit_type: HitType,
    /// Distance from the ray origin.
    pub distance: f64,
    /// World-space hit point.
    pub point: DVec3,
    /// Surface normal at the hit point, if the target has one.
    pub normal: Option<DVec3>,
    /// Picking error, e.g. the screen distance to a handle; lower is better.
    pub error: f64,
    /// Opaque handle of the hit object, owned by the embedding editor.
    pub target: u64,
    /// Whether the hit object can currently be picked.
    pub pickable: bool,
    /// Whether the hit object is currently selected.
    pub selected: bool,
}

impl Hit {
    pub fn new(hit_type: HitType, distance: f64, point: DVec3, target: u64) -> Self {
        Self {
            hit_type,
            distance,
            point,
            normal: None,
            error: 0.0,
            target,
            pickable: true,
            selected: false,
        }
    }

    pub fn with_normal(mut self, normal: DVec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_error(mut self, error: f64) -> Self {
        self.error = error;
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }
}

/// All hits of one pick ray, ordered by distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickResult {
    hits: Vec<Hit>,
}

impl PickResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a hit, keeping the hits sorted by distance. Hits at equal
    /// distance keep their insertion order.
    pub fn add_hit(&mut self, hit: Hit) {
        let index = self.hits.partition_point(|h| h.distance <= hit.distance);
        self.hits.insert(index, hit);
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    /// Best hit matching `query`; see [`HitQuery::first`].
    pub fn first(&self, query: &HitQuery) -> Option<&Hit> {
        query.first(self)
    }

    /// All hits matching `query`, nearest first.
    pub fn all<'a>(&'a self, query: &'a HitQuery) -> impl Iterator<Item = &'a Hit> + 'a {
        self.hits.iter().filter(move |h| query.matches(h))
    }
}

/// Filter applied to a [`PickResult`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitQuery {
    pub pickable_only: bool,
    pub selected_only: bool,
    pub hit_type: HitType,
    /// Non-matching hits of these types hide matching hits behind them.
    pub occluder: HitType,
    pub min_distance: Option<f64>,
}

impl Default for HitQuery {
    fn default() -> Self {
        Self {
            pickable_only: false,
            selected_only: false,
            hit_type: HitType::ANY,
            occluder: HitType::NONE,
            min_distance: None,
        }
    }
}

impl HitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pickable(mut self) -> Self {
        self.pickable_only = true;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected_only = true;
        self
    }

    pub fn of_type(mut self, hit_type: HitType) -> Self {
        self.hit_type = hit_type;
        self
    }

    pub fn occluded_by(mut self, occluder: HitType) -> Self {
        self.occluder = occluder;
        self
    }

    pub fn min_distance(mut self, distance: f64) -> Self {
        self.min_distance = Some(distance);
        self
    }

    /// Whether a single hit passes every filter.
    pub fn matches(&self, hit: &Hit) -> bool {
        if self.pickable_only && !hit.pickable {
            return false;
        }
        if self.selected_only && !hit.selected {
            return false;
        }
        if let Some(min) = self.min_distance {
            if hit.distance < min {
                return false;
            }
        }
        hit.hit_type.intersects(self.hit_type)
    }

    /// Best matching hit.
    ///
    /// Hits are visited in distance order, grouped by equal distance. Within a
    /// group the matching hit with the lowest error wins. A group that holds
    /// an occluding hit with a lower error than every match ends the search
    /// without a result.
    pub fn first<'a>(&self, result: &'a PickResult) -> Option<&'a Hit> {
        let hits = result.hits();
        let mut index = 0;
        while index < hits.len() {
            let distance = hits[index].distance;
            let mut best: Option<&Hit> = None;
            let mut best_occluder_error = f64::INFINITY;
            while index < hits.len() && (hits[index].distance - distance).abs() < EPSILON {
                let hit = &hits[index];
                if self.matches(hit) {
                    if best.is_none_or(|b| hit.error < b.error) {
                        best = Some(hit);
                    }
                } else if hit.hit_type.intersects(self.occluder) {
                    best_occluder_error = best_occluder_error.min(hit.error);
                }
                index += 1;
            }

            match best {
                Some(hit) if hit.error <= best_occluder_error => return Some(hit),
                _ if best_occluder_error.is_finite() => return None,
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE: HitType = HitType::bit(0);
    const ENTITY: HitType = HitType::bit(1);
    const HANDLE: HitType = HitType::bit(2);

    fn hit(hit_type: HitType, distance: f64, target: u64) -> Hit {
        Hit::new(hit_type, distance, DVec3::new(0.0, 0.0, -distance), target)
    }

    #[test]
    fn test_highest_bit() {
        assert_eq!(HitType::bit(63).0, 1 << 63);
        assert!(HitType::bit(63).intersects(HitType::ANY));
    }

    #[test]
    #[should_panic(expected = "hit type bit index must be below 64")]
    fn test_bit_out_of_range_panics() {
        HitType::bit(std::hint::black_box(64));
    }

    #[test]
    fn test_hits_sorted_by_distance() {
        let mut result = PickResult::new();
        result.add_hit(hit(FACE, 5.0, 1));
        result.add_hit(hit(FACE, 2.0, 2));
        result.add_hit(hit(ENTITY, 5.0, 3));
        let targets: Vec<_> = result.hits().iter().map(|h| h.target).collect();
        assert_eq!(targets, vec![2, 1, 3]);
    }

    #[test]
    fn test_first_by_type() {
        let mut result = PickResult::new();
        result.add_hit(hit(ENTITY, 1.0, 1));
        result.add_hit(hit(FACE, 2.0, 2));
        let query = HitQuery::new().of_type(FACE);
        assert_eq!(result.first(&query).map(|h| h.target), Some(2));
    }

    #[test]
    fn test_selected_and_pickable_filters() {
        let mut result = PickResult::new();
        result.add_hit(hit(FACE, 1.0, 1).with_pickable(false).with_selected(true));
        result.add_hit(hit(FACE, 2.0, 2));
        result.add_hit(hit(FACE, 3.0, 3).with_selected(true));

        assert_eq!(result.first(&HitQuery::new().pickable()).map(|h| h.target), Some(2));
        assert_eq!(
            result.first(&HitQuery::new().pickable().selected()).map(|h| h.target),
            Some(3)
        );
    }

    #[test]
    fn test_min_distance() {
        let mut result = PickResult::new();
        result.add_hit(hit(FACE, 0.5, 1));
        result.add_hit(hit(FACE, 4.0, 2));
        let query = HitQuery::new().min_distance(1.0);
        assert_eq!(result.first(&query).map(|h| h.target), Some(2));
    }

    #[test]
    fn test_occluder_hides_farther_match() {
        let mut result = PickResult::new();
        result.add_hit(hit(ENTITY, 1.0, 1));
        result.add_hit(hit(FACE, 2.0, 2));

        let occluded = HitQuery::new().of_type(FACE).occluded_by(ENTITY);
        assert!(result.first(&occluded).is_none());

        let unoccluded = HitQuery::new().of_type(FACE);
        assert_eq!(result.first(&unoccluded).map(|h| h.target), Some(2));
    }

    #[test]
    fn test_equal_distance_prefers_lowest_error() {
        let mut result = PickResult::new();
        result.add_hit(hit(HANDLE, 3.0, 1).with_error(2.0));
        result.add_hit(hit(HANDLE, 3.0, 2).with_error(0.5));
        result.add_hit(hit(FACE, 3.0, 3).with_error(1.0));

        let query = HitQuery::new().of_type(HANDLE).occluded_by(FACE);
        assert_eq!(result.first(&query).map(|h| h.target), Some(2));
    }

    #[test]
    fn test_all_iterates_matches() {
        let mut result = PickResult::new();
        result.add_hit(hit(FACE, 1.0, 1));
        result.add_hit(hit(ENTITY, 2.0, 2));
        result.add_hit(hit(FACE, 3.0, 3));
        let query = HitQuery::new().of_type(FACE);
        let targets: Vec<_> = result.all(&query).map(|h| h.target).collect();
        assert_eq!(targets, vec![1, 3]);
    }
}
