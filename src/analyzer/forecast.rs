use crate::config::{FORECAST_HORIZON, MIN_FORECAST_POINTS};
use crate::types::{ForecastPoint, PriceForecast, TrendModel};

/// Ordinary least squares linear trend over scrape order, used as a proxy
/// time axis since true timestamps are sparse within a single run.
///
/// Returns None below `MIN_FORECAST_POINTS` — "not enough data to forecast"
/// is an expected outcome, not an error. Predictions cover the next
/// `FORECAST_HORIZON` indices past the observed range; extrapolation beyond
/// the fitted range is a known limitation.
pub fn predict(prices: &[f64]) -> Option<PriceForecast> {
    if prices.len() < MIN_FORECAST_POINTS {
        return None;
    }

    let model = fit_linear_trend(prices);
    let n = prices.len();
    let points = (0..FORECAST_HORIZON)
        .map(|i| {
            let time_index = n + i;
            ForecastPoint {
                time_index,
                predicted_price: model.slope * time_index as f64 + model.intercept,
            }
        })
        .collect();

    Some(PriceForecast { points, model })
}

fn fit_linear_trend(prices: &[f64]) -> TrendModel {
    let n = prices.len() as f64;
    let mean_x = (prices.len() - 1) as f64 / 2.0;
    let mean_y = prices.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (i, &y) in prices.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var_x += dx * dx;
    }

    // var_x > 0 whenever n >= 2, which MIN_FORECAST_POINTS guarantees.
    let slope = cov / var_x;
    TrendModel {
        slope,
        intercept: mean_y - slope * mean_x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_returns_none() {
        assert!(predict(&[]).is_none());
        assert!(predict(&[10.0]).is_none());
        assert!(predict(&[10.0, 11.0]).is_none());
    }

    #[test]
    fn at_threshold_returns_full_horizon() {
        let forecast = predict(&[10.0, 11.0, 12.0]).expect("threshold met");
        assert_eq!(forecast.points.len(), FORECAST_HORIZON);

        // Indices continue past the observed range, strictly increasing.
        assert_eq!(forecast.points[0].time_index, 3);
        for pair in forecast.points.windows(2) {
            assert!(pair[0].time_index < pair[1].time_index);
        }
    }

    #[test]
    fn exact_linear_series_extrapolates_exactly() {
        let forecast = predict(&[10.0, 12.0, 14.0, 16.0]).unwrap();
        assert!((forecast.model.slope - 2.0).abs() < 1e-9);
        assert!((forecast.model.intercept - 10.0).abs() < 1e-9);
        assert!((forecast.points[0].predicted_price - 18.0).abs() < 1e-9);
        assert!((forecast.points[4].predicted_price - 26.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_predicts_constant_price() {
        let forecast = predict(&[5.0, 5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!(forecast.model.slope.abs() < 1e-9);
        for p in &forecast.points {
            assert!((p.predicted_price - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn noisy_series_fits_least_squares_trend() {
        // Hand-computed: cov = 14, var_x = 5 → slope 2.8.
        let forecast = predict(&[1.5, 3.5, 7.5, 9.5]).unwrap();
        assert!((forecast.model.slope - 2.8).abs() < 1e-9);
    }
}
