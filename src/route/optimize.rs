//! Visiting order: greedy nearest-neighbor tour construction.
//!
//! Not an exact solver. Starting at the first placed site, the tour always
//! moves to the closest site not yet visited. Sites without a position
//! can't be placed and go last, in the order they came in.

use crate::geo::haversine_km;
use crate::model::{LatLng, Waypoint};

/// Reorders `waypoints` into an approximately short tour.
///
/// With two or fewer placed sites there is nothing to gain and the input
/// comes back unchanged. Ties go to the site listed first, so the same input
/// always yields the same order.
pub fn optimize_order(waypoints: &[Waypoint]) -> Vec<Waypoint> {
    let mut remaining: Vec<(&Waypoint, LatLng)> = waypoints
        .iter()
        .filter_map(|w| w.position.map(|p| (w, p)))
        .collect();
    if remaining.len() <= 2 {
        return waypoints.to_vec();
    }

    let (first, mut current) = remaining.remove(0);
    let mut ordered = Vec::with_capacity(waypoints.len());
    ordered.push(first.clone());

    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut nearest_km = f64::INFINITY;
        for (i, (_, position)) in remaining.iter().enumerate() {
            let km = haversine_km(current, *position);
            if km < nearest_km {
                nearest = i;
                nearest_km = km;
            }
        }
        let (next, position) = remaining.remove(nearest);
        ordered.push(next.clone());
        current = position;
    }

    ordered.extend(waypoints.iter().filter(|w| w.position.is_none()).cloned());
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, position: Option<(f64, f64)>) -> Waypoint {
        Waypoint {
            id: id.into(),
            name: format!("Site {id}"),
            position: position.map(|(lat, lng)| LatLng::new(lat, lng)),
            area_m2: None,
        }
    }

    fn ids(waypoints: &[Waypoint]) -> Vec<&str> {
        waypoints.iter().map(|w| w.id.as_str()).collect()
    }

    #[test]
    fn visits_nearest_site_next() {
        let input = vec![
            site("A", Some((0.0, 0.0))),
            site("C", Some((10.0, 10.0))),
            site("B", Some((0.0, 1.0))),
        ];

        let ordered = optimize_order(&input);

        assert_eq!(ids(&ordered), vec!["A", "B", "C"]);
        assert_eq!(optimize_order(&input), ordered);
    }

    #[test]
    fn unplaced_sites_go_last_in_input_order() {
        let input = vec![
            site("X", None),
            site("A", Some((49.0, 16.0))),
            site("C", Some((49.5, 16.5))),
            site("Y", None),
            site("B", Some((49.1, 16.1))),
        ];

        let ordered = optimize_order(&input);

        assert_eq!(ordered.len(), 5);
        assert_eq!(ids(&ordered), vec!["A", "B", "C", "X", "Y"]);
    }

    #[test]
    fn two_placed_sites_are_left_alone() {
        let input = vec![
            site("X", None),
            site("B", Some((10.0, 10.0))),
            site("A", Some((0.0, 0.0))),
        ];

        assert_eq!(optimize_order(&input), input);
    }

    #[test]
    fn ties_go_to_the_first_listed() {
        let input = vec![
            site("A", Some((0.0, 0.0))),
            site("East", Some((0.0, 1.0))),
            site("West", Some((0.0, -1.0))),
        ];

        assert_eq!(ids(&optimize_order(&input)), vec!["A", "East", "West"]);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(optimize_order(&[]).is_empty());
    }
}
