//! Month-based location lookup and planar distance

use crate::{FlywayResult, Species, ValidationError, Waypoint};
use chrono::{Datelike, Utc};

/// Euclidean distance between two coordinates, in degrees.
///
/// This is a flat-plane approximation; it is only used for the encounter
/// gate and the location bonus, both of which are tuned in degrees.
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    ((lat1 - lat2).powi(2) + (lng1 - lng2).powi(2)).sqrt()
}

/// Current calendar month in UTC, 1-12.
pub fn current_month() -> u32 {
    Utc::now().month()
}

/// Resolve where `species` is during `month` (current month when `None`).
///
/// A month that is not in the route table resolves to the first waypoint.
pub fn locate(species: &Species, month: Option<u32>) -> FlywayResult<&Waypoint> {
    let month = month.unwrap_or_else(current_month);
    species
        .migration_route
        .iter()
        .find(|w| w.month == month)
        .or_else(|| species.migration_route.first())
        .ok_or_else(|| {
            ValidationError::EmptyMigrationRoute {
                species_id: species.id.clone(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::all_species;
    use crate::FlywayError;

    #[test]
    fn test_distance_zero_for_same_point() {
        assert_eq!(distance(24.8, 102.7, 24.8, 102.7), 0.0);
    }

    #[test]
    fn test_distance_pythagorean() {
        assert!((distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_locate_every_species_every_month() -> FlywayResult<()> {
        for species in all_species() {
            for month in 1..=12 {
                let waypoint = locate(species, Some(month))?;
                assert_eq!(waypoint.month, month, "species {}", species.id);
            }
        }
        Ok(())
    }

    #[test]
    fn test_locate_out_of_table_month_falls_back_to_first() -> FlywayResult<()> {
        for species in all_species() {
            let first = &species.migration_route[0];
            assert_eq!(locate(species, Some(0))?, first);
            assert_eq!(locate(species, Some(13))?, first);
        }
        Ok(())
    }

    #[test]
    fn test_locate_empty_route_is_an_error() {
        let mut species = all_species()[0].clone();
        species.migration_route.clear();
        let err = locate(&species, Some(1));
        assert!(matches!(
            err,
            Err(FlywayError::Validation(ValidationError::EmptyMigrationRoute { .. }))
        ));
    }

    #[test]
    fn test_current_month_in_range() {
        assert!((1..=12).contains(&current_month()));
    }
}
