/// Slope of a least-squares line constrained through the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub r_squared: f64,
}

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Fits `y = slope * x`. Returns `None` for mismatched input or when every `x` is zero.
    pub fn fit_through_origin(xs: &[f64], ys: &[f64]) -> Option<LineFit> {
        if xs.len() != ys.len() || xs.is_empty() {
            return None;
        }
        let sxx: f64 = xs.iter().map(|x| x * x).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
        let slope = sxy / sxx;

        let y_mean = Self::mean(ys)?;
        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - slope * x).powi(2))
            .sum();
        let ss_tot: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r_squared = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Some(LineFit { slope, r_squared })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_slice_is_none() {
        assert_eq!(StatsHelper::mean(&[]), None);
        assert_eq!(StatsHelper::mean(&[1.0, 3.0]), Some(2.0));
    }

    #[test]
    fn fit_recovers_exact_slope() {
        let fit = StatsHelper::fit_through_origin(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fit_rejects_degenerate_input() {
        assert!(StatsHelper::fit_through_origin(&[0.0, 0.0], &[1.0, 2.0]).is_none());
        assert!(StatsHelper::fit_through_origin(&[1.0], &[1.0, 2.0]).is_none());
    }
}
