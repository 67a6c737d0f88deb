//! Daylight autonomy, useful daylight illuminance, and annual sunlight
//! exposure.
//!
//! All three metrics walk the series once, consider only hours admitted
//! by the occupancy schedule, and normalize by the occupied-hour count
//! they actually saw. Hours the schedule admits but the series never
//! recorded simply do not participate -- the series is the caller's
//! recombined result and is expected to cover the study period.

use serde::Serialize;

use lumen_types::OccupancySchedule;

use crate::error::MetricError;

/// Daylight autonomy result, both variants as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Autonomy {
    /// Percentage of occupied hours at or above the threshold.
    pub da: f64,
    /// Continuous variant: below-threshold hours credit `value/threshold`.
    pub cda: f64,
}

/// Useful daylight illuminance partition, as percentages summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Udi {
    /// Occupied hours below the useful range.
    pub below: f64,
    /// Occupied hours within the useful range (inclusive bounds).
    pub within: f64,
    /// Occupied hours above the useful range.
    pub above: f64,
}

/// Annual sunlight exposure result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SunExposure {
    /// Whether the exceedance count stayed under the target.
    pub meets_target: bool,
    /// Number of occupied hours whose direct value exceeds the threshold.
    pub hours_above: usize,
    /// The exceeding hours, in series order.
    pub hoys: Vec<u32>,
}

/// Compute daylight autonomy and its continuous variant.
///
/// For every occupied hour, DA gains a full point when the value meets
/// `threshold`; cDA additionally credits `value / threshold` for hours
/// below it. Both are normalized into percentages over the occupied-hour
/// count.
///
/// # Errors
///
/// Returns [`MetricError::EmptySchedule`] when no hour of the series is
/// occupied.
pub fn daylight_autonomy(
    series: &[(u32, f64)],
    schedule: &OccupancySchedule,
    threshold: f64,
) -> Result<Autonomy, MetricError> {
    let mut occupied = 0_usize;
    let mut da_hits = 0.0;
    let mut cda_credit = 0.0;
    for &(hoy, value) in series {
        if !schedule.contains(hoy) {
            continue;
        }
        occupied = occupied.saturating_add(1);
        if value >= threshold {
            da_hits += 1.0;
            cda_credit += 1.0;
        } else if threshold > 0.0 {
            cda_credit += value / threshold;
        }
    }
    percentify(occupied).map(|scale| Autonomy {
        da: da_hits * scale,
        cda: cda_credit * scale,
    })
}

/// Partition occupied hours into below / within / above the useful band.
///
/// The band is inclusive at both ends; the three percentages always sum
/// to 100 up to floating rounding.
///
/// # Errors
///
/// Returns [`MetricError::EmptySchedule`] when no hour of the series is
/// occupied.
pub fn useful_daylight_illuminance(
    series: &[(u32, f64)],
    schedule: &OccupancySchedule,
    range: (f64, f64),
) -> Result<Udi, MetricError> {
    let (low, high) = range;
    let mut occupied = 0_usize;
    let mut below = 0.0;
    let mut within = 0.0;
    let mut above = 0.0;
    for &(hoy, value) in series {
        if !schedule.contains(hoy) {
            continue;
        }
        occupied = occupied.saturating_add(1);
        if value < low {
            below += 1.0;
        } else if value > high {
            above += 1.0;
        } else {
            within += 1.0;
        }
    }
    percentify(occupied).map(|scale| Udi {
        below: below * scale,
        within: within * scale,
        above: above * scale,
    })
}

/// Count occupied hours whose direct-sun value exceeds `threshold`.
///
/// `direct_series` is `None` when the study's recipe never recorded a
/// direct component. Hours outside the schedule are excluded from the
/// count, not zero-filled, so the returned hour list only ever names
/// occupied hours. The target is met while the count stays strictly
/// below `target_hours`.
///
/// # Errors
///
/// Returns [`MetricError::DirectUnavailable`] when no direct series
/// exists.
pub fn annual_sunlight_exposure(
    direct_series: Option<&[(u32, f64)]>,
    schedule: &OccupancySchedule,
    threshold: f64,
    target_hours: usize,
) -> Result<SunExposure, MetricError> {
    let series = direct_series.ok_or(MetricError::DirectUnavailable)?;
    let hoys: Vec<u32> = series
        .iter()
        .filter(|&&(hoy, value)| schedule.contains(hoy) && value > threshold)
        .map(|&(hoy, _)| hoy)
        .collect();
    Ok(SunExposure {
        meets_target: hoys.len() < target_hours,
        hours_above: hoys.len(),
        hoys,
    })
}

/// Percentage scale for a count of occupied hours.
fn percentify(occupied: usize) -> Result<f64, MetricError> {
    if occupied == 0 {
        return Err(MetricError::EmptySchedule);
    }
    // Counts stay far below 2^52; the cast is exact.
    #[allow(clippy::cast_precision_loss)]
    Ok(100.0 / occupied as f64)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn schedule(hours: impl IntoIterator<Item = u32>) -> OccupancySchedule {
        OccupancySchedule::new(hours)
    }

    #[test]
    fn daylight_autonomy_boundary_case() {
        let series = [(8, 100.0), (9, 400.0), (10, 1000.0)];
        let result =
            daylight_autonomy(&series, &schedule([8, 9, 10]), 300.0).expect("autonomy");
        // 2 of 3 hours at or above 300 lux.
        assert!((result.da - 200.0 / 3.0).abs() < EPS);
        // (100/300 + 1 + 1) / 3.
        assert!((result.cda - 700.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn unoccupied_hours_are_excluded() {
        let series = [(8, 1000.0), (9, 0.0)];
        let result = daylight_autonomy(&series, &schedule([8]), 300.0).expect("autonomy");
        assert!((result.da - 100.0).abs() < EPS);
    }

    #[test]
    fn empty_schedule_is_an_error() {
        let series = [(8, 1000.0)];
        assert!(matches!(
            daylight_autonomy(&series, &schedule([]), 300.0),
            Err(MetricError::EmptySchedule)
        ));
    }

    #[test]
    fn schedule_disjoint_from_series_is_an_error() {
        // A non-empty schedule whose hours the series never recorded
        // leaves nothing to normalize by.
        let series = [(8, 1000.0), (9, 400.0)];
        assert!(matches!(
            daylight_autonomy(&series, &schedule([20, 21]), 300.0),
            Err(MetricError::EmptySchedule)
        ));
        assert!(matches!(
            useful_daylight_illuminance(&series, &schedule([20, 21]), (100.0, 3000.0)),
            Err(MetricError::EmptySchedule)
        ));
    }

    #[test]
    fn udi_partition_sums_to_one_hundred() {
        let series = [
            (8, 50.0),
            (9, 150.0),
            (10, 300.0),
            (11, 2500.0),
            (12, 3200.0),
        ];
        let udi = useful_daylight_illuminance(&series, &schedule(8..=12), (100.0, 3000.0))
            .expect("udi");
        assert!((udi.below - 20.0).abs() < EPS);
        assert!((udi.within - 60.0).abs() < EPS);
        assert!((udi.above - 20.0).abs() < EPS);
        assert!((udi.below + udi.within + udi.above - 100.0).abs() < EPS);
    }

    #[test]
    fn udi_band_is_inclusive() {
        let series = [(8, 100.0), (9, 3000.0)];
        let udi = useful_daylight_illuminance(&series, &schedule([8, 9]), (100.0, 3000.0))
            .expect("udi");
        assert!((udi.within - 100.0).abs() < EPS);
    }

    #[test]
    fn sunlight_exposure_counts_only_occupied_exceedances() {
        let series = [(7, 1500.0), (8, 1200.0), (9, 900.0), (10, 1100.0)];
        // Hour 7 exceeds but is unoccupied.
        let ase = annual_sunlight_exposure(Some(&series), &schedule([8, 9, 10]), 1000.0, 250)
            .expect("ase");
        assert_eq!(ase.hours_above, 2);
        assert_eq!(ase.hoys, vec![8, 10]);
        assert!(ase.meets_target);
    }

    #[test]
    fn sunlight_exposure_target_is_strict() {
        let series = [(8, 1200.0), (9, 1300.0)];
        let ase = annual_sunlight_exposure(Some(&series), &schedule([8, 9]), 1000.0, 2)
            .expect("ase");
        assert_eq!(ase.hours_above, 2);
        assert!(!ase.meets_target);
    }

    #[test]
    fn results_serialize_for_reports() {
        let udi = Udi {
            below: 20.0,
            within: 60.0,
            above: 20.0,
        };
        let json = serde_json::to_string(&udi).unwrap_or_default();
        assert_eq!(json, r#"{"below":20.0,"within":60.0,"above":20.0}"#);
    }

    #[test]
    fn sunlight_exposure_requires_direct_values() {
        assert!(matches!(
            annual_sunlight_exposure(None, &schedule([8]), 1000.0, 250),
            Err(MetricError::DirectUnavailable)
        ));
    }
}
