//! Small numeric kernels shared by ingestion, geometry and validation.

pub fn norm3(vector: [f64; 3]) -> f64 {
    (vector[0] * vector[0] + vector[1] * vector[1] + vector[2] * vector[2]).sqrt()
}

pub fn scale3(vector: [f64; 3], factor: f64) -> [f64; 3] {
    [vector[0] * factor, vector[1] * factor, vector[2] * factor]
}

pub fn sub3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// `n` evenly spaced samples over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Running trapezoid integral of `values` over `grid`; the first entry is zero.
pub fn cumulative_trapezoid(grid: &[f64], values: &[f64]) -> Vec<f64> {
    let len = grid.len().min(values.len());
    let mut integral = Vec::with_capacity(len);
    if len == 0 {
        return integral;
    }

    let mut sum = 0.0;
    let mut correction = 0.0;
    integral.push(0.0);
    for i in 1..len {
        let area = 0.5 * (values[i] + values[i - 1]) * (grid[i] - grid[i - 1]);
        kahan_add(&mut sum, &mut correction, area);
        integral.push(sum);
    }
    integral
}

/// Piecewise-linear interpolation on an increasing grid, clamped at both ends.
pub fn interp(x: f64, grid: &[f64], values: &[f64]) -> f64 {
    let len = grid.len().min(values.len());
    if len == 0 {
        return f64::NAN;
    }
    if x <= grid[0] {
        return values[0];
    }
    if x >= grid[len - 1] {
        return values[len - 1];
    }

    let upper = grid[..len].partition_point(|point| *point <= x);
    let lower = upper - 1;
    let span = grid[upper] - grid[lower];
    if span == 0.0 {
        return values[lower];
    }
    let weight = (x - grid[lower]) / span;
    values[lower] + weight * (values[upper] - values[lower])
}

/// Median of the finite entries; `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

#[cfg(test)]
mod tests {
    use super::{cumulative_trapezoid, interp, linspace, median, norm3, scale3, sub3};

    #[test]
    fn vector_helpers_match_hand_values() {
        assert_eq!(norm3([3.0, 4.0, 12.0]), 13.0);
        assert_eq!(scale3([1.0, -2.0, 0.5], 4.0), [4.0, -8.0, 2.0]);
        assert_eq!(sub3([1.0, 1.0, 1.0], [0.5, 2.0, 1.0]), [0.5, -1.0, 0.0]);
    }

    #[test]
    fn trapezoid_integrates_linear_function_exactly() {
        let grid = linspace(0.0, 2.0, 21);
        let values: Vec<f64> = grid.iter().map(|x| 3.0 * x).collect();
        let integral = cumulative_trapezoid(&grid, &values);
        assert_eq!(integral.len(), 21);
        assert_eq!(integral[0], 0.0);
        assert!((integral[20] - 6.0).abs() <= 1.0e-12);
    }

    #[test]
    fn interpolation_clamps_and_blends() {
        let grid = [0.0, 1.0, 2.0];
        let values = [10.0, 20.0, 40.0];
        assert_eq!(interp(-1.0, &grid, &values), 10.0);
        assert_eq!(interp(5.0, &grid, &values), 40.0);
        assert!((interp(1.5, &grid, &values) - 30.0).abs() <= 1.0e-12);
        assert!((interp(1.0, &grid, &values) - 20.0).abs() <= 1.0e-12);
    }

    #[test]
    fn median_ignores_non_finite_entries() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, f64::NAN, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(median(&[]), None);
    }
}
