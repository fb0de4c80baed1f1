//! Zone occupancy counting.

use indexmap::IndexMap;

use crate::geometry::{point_in_polygon, Point};
use crate::types::ZoneCounts;

/// Named polygons in the order the caller supplied them.
pub type ZoneMap = IndexMap<String, Vec<Point>>;

/// Count how many `centers` fall inside each zone.
///
/// Every zone appears in the result, with 0 when nobody is inside. Zones may
/// overlap; a center inside two zones counts toward both.
pub fn count_per_zone(centers: &[Point], zones: &ZoneMap) -> ZoneCounts {
    zones
        .iter()
        .map(|(name, polygon)| {
            let count = centers
                .iter()
                .filter(|c| point_in_polygon(**c, polygon))
                .count() as u32;
            (name.clone(), count)
        })
        .collect()
}
