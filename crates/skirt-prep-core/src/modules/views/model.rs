use crate::domain::{PrepResult, PrepError, ViewDirection, ViewSet};
use std::f64::consts::PI;

pub const FIBONACCI_METHOD: &str = "fibonacci_sphere";

/// Quasi-uniform directions on the unit sphere from a Fibonacci lattice.
///
/// Polar angles run from near the +z pole towards -z, so `theta_deg` is
/// non-decreasing in the index. Azimuths advance by `2*pi/golden` and are
/// wrapped into `[0, 360)` degrees.
pub fn generate_view_set(num_views: usize) -> PrepResult<ViewSet> {
    if num_views == 0 {
        return Err(PrepError::empty_result(
            "RUN.ZERO_VIEWS",
            "at least one view direction must be requested",
        ));
    }

    let golden = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let n = num_views as f64;
    let views = (0..num_views)
        .map(|index| {
            let i = index as f64;
            let theta = (1.0 - (2.0 * i + 1.0) / n).clamp(-1.0, 1.0).acos();
            let phi = (2.0 * PI * i / golden).rem_euclid(2.0 * PI);
            ViewDirection {
                index,
                theta_deg: theta.to_degrees(),
                phi_deg: phi.to_degrees(),
                dir: [
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ],
            }
        })
        .collect();

    Ok(ViewSet {
        num_views,
        method: FIBONACCI_METHOD.to_string(),
        views,
    })
}

/// Checks what downstream stages rely on: one entry per index in order, unit direction vectors.
pub fn validate_view_set(views: &ViewSet) -> PrepResult<()> {
    if views.is_empty() {
        return Err(PrepError::empty_result(
            "RUN.ZERO_VIEWS",
            "view set contains no directions",
        ));
    }
    if views.num_views != views.len() {
        return Err(PrepError::schema(
            "INPUT.VIEW_SET",
            format!(
                "view set declares {} views but lists {}",
                views.num_views,
                views.len()
            ),
        ));
    }
    for (position, view) in views.iter().enumerate() {
        if view.index != position {
            return Err(PrepError::schema(
                "INPUT.VIEW_SET",
                format!("view at position {} has index {}", position, view.index),
            ));
        }
        let norm = crate::numerics::norm3(view.dir);
        if !norm.is_finite() || (norm - 1.0).abs() > 1.0e-6 {
            return Err(PrepError::schema(
                "INPUT.VIEW_SET",
                format!("view {} direction has norm {}", view.index, norm),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{generate_view_set, validate_view_set};
    use crate::domain::PrepErrorCategory;
    use crate::numerics::norm3;

    #[test]
    fn every_view_is_a_unit_vector_and_theta_is_monotone() {
        for n in [1_usize, 2, 3, 4, 7, 32, 257] {
            let views = generate_view_set(n).expect("views should generate");
            assert_eq!(views.len(), n);
            assert_eq!(views.num_views, n);
            for view in views.iter() {
                assert!((norm3(view.dir) - 1.0).abs() <= 1.0e-9);
                assert!((0.0..360.0).contains(&view.phi_deg));
            }
            for pair in views.views.windows(2) {
                assert!(pair[1].theta_deg >= pair[0].theta_deg);
            }
            validate_view_set(&views).expect("generated views should validate");
        }
    }

    #[test]
    fn four_views_start_at_arccos_three_quarters() {
        let views = generate_view_set(4).expect("views should generate");
        let expected = 0.75_f64.acos().to_degrees();
        assert!((views.views[0].theta_deg - expected).abs() < 1.0e-9);
        assert!((views.views[0].theta_deg - 41.41).abs() < 0.01);
        assert_eq!(views.views[0].phi_deg, 0.0);
        assert_eq!(views.views[3].index, 3);
        assert!((views.views[3].theta_deg - 180.0 + expected).abs() < 1.0e-9);
    }

    #[test]
    fn a_single_view_looks_along_the_equator() {
        let views = generate_view_set(1).expect("views should generate");
        assert!((views.views[0].theta_deg - 90.0).abs() < 1.0e-12);
    }

    #[test]
    fn zero_views_is_an_empty_result() {
        let error = generate_view_set(0).expect_err("zero views should fail");
        assert_eq!(error.category(), PrepErrorCategory::EmptyResultError);
    }

    #[test]
    fn reindexed_or_truncated_sets_are_rejected() {
        let mut views = generate_view_set(3).expect("views should generate");
        views.views.swap(0, 1);
        assert!(validate_view_set(&views).is_err());

        let mut views = generate_view_set(3).expect("views should generate");
        views.views.pop();
        let error = validate_view_set(&views).expect_err("count mismatch");
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);
    }
}
