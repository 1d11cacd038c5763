//! Unit interval math: normalization, boundaries and folding of values into ranges.

use std::fmt::Display;

// -------------------------------------------------------------------------------------------------

/// Method used to fold out of range values back into, or in range values out of, a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMethod {
    Limit,
    Wrap,
    Reflect,
}

impl TryFrom<&str> for BoundaryMethod {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "limit" => Ok(Self::Limit),
            "w" | "wrap" => Ok(Self::Wrap),
            "r" | "reflect" => Ok(Self::Reflect),
            _ => Err(format!(
                "invalid boundary method '{}': expected limit, wrap or reflect",
                s
            )),
        }
    }
}

impl Display for BoundaryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Limit => "limit",
            Self::Wrap => "wrap",
            Self::Reflect => "reflect",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Min and max of a series, or `None` for an empty series.
pub fn min_max(series: &[f64]) -> Option<(f64, f64)> {
    let mut iter = series.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
}

/// Normalize a value within the given range. Values are not limited, so values outside
/// of the range map outside of the unit interval. A zero span maps to 0.
pub fn norm(value: f64, a: f64, b: f64) -> f64 {
    let (min, max) = ordered(a, b);
    let span = max - min;
    if span != 0.0 {
        (value - min) / span
    } else {
        0.0
    }
}

/// Normalize a series into the unit interval by its own min and max.
/// Single element and constant series map to zeros.
pub fn norm_series(series: &[f64]) -> Vec<f64> {
    match min_max(series) {
        Some((min, max)) if series.len() > 1 => {
            series.iter().map(|v| norm(*v, min, max)).collect()
        }
        _ => vec![0.0; series.len()],
    }
}

/// Normalize a series of positive values as proportions of their sum.
pub fn norm_proportion(series: &[f64]) -> Result<Vec<f64>, String> {
    if series.iter().any(|v| *v < 0.0) {
        return Err("series members must be positive".to_string());
    }
    let sum: f64 = series.iter().sum();
    if sum == 0.0 {
        return Err("series must not sum to zero".to_string());
    }
    Ok(series.iter().map(|v| v / sum).collect())
}

/// Return `parts` equally spaced values from 0 to 1 inclusive.
pub fn norm_equal(parts: usize) -> Vec<f64> {
    match parts {
        0 | 1 => vec![0.0],
        2 => vec![0.0, 1.0],
        _ => {
            let step = 1.0 / (parts - 1) as f64;
            let mut values = (0..parts - 1).map(|i| i as f64 * step).collect::<Vec<_>>();
            values.push(1.0);
            values
        }
    }
}

/// Shift a unit interval value into the range `[a, b]`, in any order.
pub fn denorm(value: f64, a: f64, b: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("value ({}) must be in unit interval", value));
    }
    let (min, max) = ordered(a, b);
    if min == max {
        return Ok(min);
    }
    Ok(value * (max - min) + min)
}

/// Interpolate between `a` (at 0) and `b` (at 1). Order of a and b is kept.
pub fn interpolate(value: f64, a: f64, b: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("value ({}) must be in unit interval", value));
    }
    Ok(match value {
        v if v == 0.0 => a,
        v if v == 1.0 => b,
        v => a * (1.0 - v) + b * v,
    })
}

/// Clip a value into the unit interval.
pub fn limit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

// -------------------------------------------------------------------------------------------------

/// A `(lower, mean, upper)` boundary within the unit interval.
pub type Boundary = (f64, f64, f64);

/// Divide the unit interval into `parts` equal boundaries.
pub fn boundary_equal(parts: usize) -> Result<Vec<Boundary>, String> {
    if parts == 0 {
        return Err("cannot process 0 parts".to_string());
    }
    let step = 1.0 / parts as f64;
    let mut bounds = Vec::with_capacity(parts);
    let mut lower = 0.0;
    for face in 0..parts {
        let upper = if face != parts - 1 {
            step * (face + 1) as f64
        } else {
            1.0
        };
        bounds.push((lower, lower + step * 0.5, upper));
        lower = upper;
    }
    Ok(bounds)
}

/// Divide the unit interval into boundaries proportional to the given weights.
pub fn boundary_proportion(weights: &[f64]) -> Result<Vec<Boundary>, String> {
    if weights.is_empty() || weights.contains(&0.0) {
        return Err("cannot process series that is empty or contains zero".to_string());
    }
    let unit = norm_proportion(weights)?;
    let mut bounds = Vec::with_capacity(unit.len());
    let mut sum = 0.0;
    for (i, width) in unit.iter().enumerate() {
        let lower = sum;
        let upper = if i != unit.len() - 1 {
            sum + width
        } else {
            1.0
        };
        sum += width;
        bounds.push((lower, (lower + upper) * 0.5, upper));
    }
    Ok(bounds)
}

/// Index of the boundary that contains the unit interval value. 1 maps to the last boundary.
pub fn boundary_position(value: f64, bounds: &[Boundary]) -> Result<usize, String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("value ({}) must be in unit interval", value));
    }
    match (bounds.first(), bounds.last()) {
        (Some(first), Some(last)) if first.0 == 0.0 && last.2 == 1.0 => (),
        _ => return Err("incomplete bounds".to_string()),
    }
    if value == 1.0 {
        return Ok(bounds.len() - 1);
    }
    Ok(bounds
        .iter()
        .position(|(lower, _, upper)| value >= *lower && value < *upper)
        .unwrap_or(bounds.len() - 1))
}

// -------------------------------------------------------------------------------------------------

/// Place `value` within the range `[a, b]` with the given method.
pub fn boundary_fit(a: f64, b: f64, value: f64, method: BoundaryMethod) -> f64 {
    let (min, max) = ordered(a, b);
    if value >= min && value <= max {
        return value;
    }
    if min == max {
        return min;
    }
    let period = max - min;
    match method {
        BoundaryMethod::Limit => value.clamp(min, max),
        BoundaryMethod::Wrap => {
            let wrapped = if value > max {
                value - ((value - max) / period).ceil() * period
            } else {
                value + ((min - value) / period).ceil() * period
            };
            wrapped.clamp(min, max)
        }
        BoundaryMethod::Reflect => {
            let offset = (value - min).rem_euclid(2.0 * period);
            if offset <= period {
                min + offset
            } else {
                min + 2.0 * period - offset
            }
        }
    }
}

/// Place `value` outside of the open range `(a, b)` with the given method.
pub fn boundary_reject(a: f64, b: f64, value: f64, method: BoundaryMethod) -> f64 {
    let (min, max) = ordered(a, b);
    if value <= min || value >= max {
        return value;
    }
    let period = max - min;
    let center = min + period * 0.5;
    let upper = value >= center;
    match method {
        BoundaryMethod::Limit => {
            if upper {
                max
            } else {
                min
            }
        }
        BoundaryMethod::Wrap => {
            if upper {
                value + period
            } else {
                value - period
            }
        }
        BoundaryMethod::Reflect => {
            if upper {
                max + (max - value)
            } else {
                min - (value - min)
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Maps unit interval values to the nearest member of an integer series.
///
/// The series is laid out on a binary grid spanning its min to max. Values falling into an
/// occupied grid slot return that member; values in empty slots return the closer of the two
/// adjacent members. Results are normalized within the series range.
#[derive(Debug, Clone)]
pub struct FunnelUnit {
    series_unit: Vec<f64>,
    binary: Vec<Option<usize>>,
    bounds: Vec<Boundary>,
}

impl FunnelUnit {
    pub fn new(series: &[i64]) -> Result<Self, String> {
        let mut sorted = series.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let (min, max) = match (sorted.first(), sorted.last()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => return Err("funnel series must not be empty".to_string()),
        };
        let mut binary = vec![None; (max - min + 1) as usize];
        for (index, value) in sorted.iter().enumerate() {
            binary[(value - min) as usize] = Some(index);
        }
        let series_unit = norm_series(&sorted.iter().map(|v| *v as f64).collect::<Vec<_>>());
        let bounds = boundary_equal(binary.len())?;
        Ok(Self {
            series_unit,
            binary,
            bounds,
        })
    }

    /// Return the normalized series value nearest to the unit interval value.
    pub fn find_nearest(&self, value: f64) -> Result<f64, String> {
        let pos = boundary_position(value, &self.bounds)?;
        if let Some(index) = self.binary[pos] {
            return Ok(self.series_unit[index]);
        }
        // first and last grid slots are always occupied
        let lower = (0..pos).rev().find(|i| self.binary[*i].is_some()).unwrap_or(0);
        let upper = (pos + 1..self.binary.len())
            .find(|i| self.binary[*i].is_some())
            .unwrap_or(self.binary.len() - 1);
        let gap = (upper - lower - 1) as f64;
        let relative = (pos - lower - 1) as f64;
        let slot = if relative < gap / 2.0 { lower } else { upper };
        Ok(self.binary[slot].map_or(0.0, |index| self.series_unit[index]))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalization() -> Result<(), String> {
        assert_eq!(norm(6.5, 3.0, 10.0), 0.5);
        assert_eq!(norm(17.0, 3.0, 10.0), 2.0);
        assert_eq!(norm_series(&[0.0, 3.0, 4.0]), vec![0.0, 0.75, 1.0]);
        assert_eq!(norm_series(&[2.0, 2.0]), vec![0.0, 0.0]);
        assert_eq!(norm_equal(3), vec![0.0, 0.5, 1.0]);
        assert_eq!(denorm(0.5, 10.0, 20.0)?, 15.0);
        assert_eq!(denorm(0.5, 20.0, -20.0)?, 0.0);
        assert!(denorm(10.0, -20.0, 20.0).is_err());
        assert_eq!(interpolate(0.8, 10.0, 20.0)?, 18.0);
        Ok(())
    }

    #[test]
    fn boundaries() -> Result<(), String> {
        let bounds = boundary_proportion(&[1.0, 1.0, 2.0])?;
        assert_eq!(
            bounds,
            vec![(0.0, 0.125, 0.25), (0.25, 0.375, 0.5), (0.5, 0.75, 1.0)]
        );
        assert_eq!(boundary_position(0.4, &bounds)?, 1);
        assert_eq!(boundary_position(0.1, &bounds)?, 0);
        assert_eq!(boundary_position(1.0, &bounds)?, 2);
        assert!(boundary_proportion(&[1.0, 0.0]).is_err());
        assert_eq!(boundary_equal(4)?.len(), 4);
        Ok(())
    }

    #[test]
    fn fit_and_reject() {
        assert_eq!(boundary_fit(3.0, 9.0, 23.0, BoundaryMethod::Limit), 9.0);
        assert_eq!(boundary_fit(3.0, 9.0, 10.0, BoundaryMethod::Reflect), 8.0);
        assert_eq!(boundary_fit(3.0, 9.0, 12.0, BoundaryMethod::Wrap), 6.0);
        assert_eq!(boundary_fit(3.0, 9.0, 5.0, BoundaryMethod::Wrap), 5.0);
        assert_eq!(boundary_fit(9.0, 3.0, 15.0, BoundaryMethod::Wrap), 9.0);
        assert_eq!(boundary_fit(3.0, 9.0, -1.0, BoundaryMethod::Wrap), 5.0);
        assert_eq!(boundary_fit(4.0, 4.0, 10.0, BoundaryMethod::Reflect), 4.0);

        assert_eq!(boundary_reject(3.0, 9.0, 23.0, BoundaryMethod::Limit), 23.0);
        assert_eq!(boundary_reject(3.0, 9.0, 5.0, BoundaryMethod::Wrap), -1.0);
        assert_eq!(boundary_reject(3.0, 9.0, 7.0, BoundaryMethod::Limit), 9.0);
        assert_eq!(boundary_reject(3.0, 9.0, 8.0, BoundaryMethod::Reflect), 10.0);
    }

    #[test]
    fn folding_stays_in_range() {
        for i in -200..200 {
            let value = i as f64 * 0.37;
            let wrapped = boundary_fit(-2.0, 5.5, value, BoundaryMethod::Wrap);
            assert!((-2.0..=5.5).contains(&wrapped));
            assert_eq!(
                boundary_fit(-2.0, 5.5, wrapped, BoundaryMethod::Wrap),
                wrapped
            );
            let reflected = boundary_fit(-2.0, 5.5, value, BoundaryMethod::Reflect);
            assert!((-2.0..=5.5).contains(&reflected));
        }
    }

    #[test]
    fn funnel() -> Result<(), String> {
        let funnel = FunnelUnit::new(&[0, 1, 2, 3, 4, 20])?;
        assert!((funnel.find_nearest(0.5)? - 0.2).abs() < 1e-9);
        assert_eq!(funnel.find_nearest(0.8)?, 1.0);
        assert_eq!(funnel.find_nearest(0.0)?, 0.0);
        Ok(())
    }

    #[test]
    fn methods_from_str() {
        assert_eq!(BoundaryMethod::try_from("W"), Ok(BoundaryMethod::Wrap));
        assert_eq!(BoundaryMethod::try_from("reflect"), Ok(BoundaryMethod::Reflect));
        assert!(BoundaryMethod::try_from("fold").is_err());
    }
}
