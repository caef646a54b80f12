use crate::misc::{FeatureVector, PriceBar};

const RSI_NEUTRAL: f64 = 50.0;
const RSI_FLOOR: f64 = 30.0;
const RSI_CEILING: f64 = 70.0;
// Fractional bar return is scaled by this before being added to the neutral RSI.
const RSI_SCALE: f64 = 500.0;

/// `numerator / open * 100`, or 0 when the bar opened at zero.
pub fn pct_of_open(numerator: f64, open: f64) -> f64 {
    if open != 0.0 {
        numerator / open * 100.0
    } else {
        0.0
    }
}

/// Derive the model's feature vector from a single bar.
///
/// With only one observation every windowed indicator collapses to a
/// single-point proxy: moving averages are the close, MACD and momentum are
/// the raw open-to-close delta, the Bollinger envelope uses a quarter of the
/// intrabar range as its deviation, and RSI is pushed away from 50 in
/// proportion to the bar's return and clamped to [30, 70]. The trained model
/// expects exactly these values.
pub fn engineer(bar: &PriceBar) -> FeatureVector {
    let delta = bar.close - bar.open;
    let std_estimate = (bar.high - bar.low) / 4.0;

    FeatureVector {
        open_price: bar.open,
        close_price: bar.close,
        high_price: bar.high,
        low_price: bar.low,
        volume: bar.volume,
        price_change_percent: pct_of_open(delta, bar.open),
        volatility: pct_of_open(bar.high - bar.low, bar.open),
        moving_avg_5: bar.close,
        moving_avg_10: bar.close,
        rsi: rsi_estimate(delta, bar.open),
        macd: delta,
        bollinger_upper: bar.close + 2.0 * std_estimate,
        bollinger_lower: bar.close - 2.0 * std_estimate,
        momentum: delta,
        avg_volume_5: bar.volume,
    }
}

fn rsi_estimate(delta: f64, open: f64) -> f64 {
    // A zero open leaves the return undefined; treat it as no signal.
    if open == 0.0 {
        return RSI_NEUTRAL;
    }

    let scaled = RSI_NEUTRAL + (delta / open) * RSI_SCALE;
    if delta > 0.0 {
        scaled.min(RSI_CEILING)
    } else if delta < 0.0 {
        scaled.max(RSI_FLOOR)
    } else {
        RSI_NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn bar(open: f64, close: f64, high: f64, low: f64, volume: f64) -> PriceBar {
        PriceBar {
            open,
            close,
            high,
            low,
            volume,
        }
    }

    #[test]
    fn derives_features_for_an_up_bar() {
        let f = engineer(&bar(100.0, 105.0, 107.0, 99.0, 1000.0));

        assert!((f.price_change_percent - 5.0).abs() < EPS);
        assert!((f.volatility - 8.0).abs() < EPS);
        assert_eq!(f.moving_avg_5, 105.0);
        assert_eq!(f.moving_avg_10, 105.0);
        // 50 + 0.05 * 500 = 75, clamped
        assert_eq!(f.rsi, 70.0);
        assert_eq!(f.macd, 5.0);
        assert_eq!(f.momentum, 5.0);
        assert!((f.bollinger_upper - 109.0).abs() < EPS);
        assert!((f.bollinger_lower - 101.0).abs() < EPS);
        assert_eq!(f.avg_volume_5, 1000.0);
        assert_eq!(f.volume, 1000.0);
    }

    #[test]
    fn small_moves_shift_rsi_without_clamping() {
        let up = engineer(&bar(100.0, 101.0, 101.0, 100.0, 1.0));
        assert!((up.rsi - 55.0).abs() < EPS);

        let down = engineer(&bar(100.0, 98.0, 100.0, 98.0, 1.0));
        assert!((down.rsi - 40.0).abs() < EPS);
    }

    #[test]
    fn rsi_stays_within_band() {
        let cases = [
            (100.0, 250.0),
            (100.0, 1.0),
            (3.0, 3.3),
            (3.0, 2.7),
            (0.01, 5000.0),
        ];
        for (open, close) in cases {
            let f = engineer(&bar(open, close, open.max(close), open.min(close), 1.0));
            assert!((RSI_FLOOR..=RSI_CEILING).contains(&f.rsi), "rsi {} for {open}->{close}", f.rsi);
        }
    }

    #[test]
    fn flat_bar_is_neutral() {
        let f = engineer(&bar(100.0, 100.0, 100.0, 100.0, 500.0));
        assert_eq!(f.rsi, 50.0);
        assert_eq!(f.volatility, 0.0);
        assert_eq!(f.price_change_percent, 0.0);
        assert_eq!(f.bollinger_upper, 100.0);
        assert_eq!(f.bollinger_lower, 100.0);
    }

    #[test]
    fn zero_open_is_guarded() {
        let f = engineer(&bar(0.0, 5.0, 6.0, 0.0, 10.0));
        assert_eq!(f.price_change_percent, 0.0);
        assert_eq!(f.volatility, 0.0);
        assert_eq!(f.rsi, 50.0);
        assert_eq!(f.macd, 5.0);
        assert!(f.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn bands_bracket_close() {
        let f = engineer(&bar(10.0, 12.5, 13.0, 9.0, 1.0));
        assert!(f.bollinger_upper >= f.close_price);
        assert!(f.close_price >= f.bollinger_lower);
    }

    #[test]
    fn pct_of_open_matches_formula() {
        assert!((pct_of_open(-2.5, 50.0) + 5.0).abs() < EPS);
        assert_eq!(pct_of_open(3.0, 0.0), 0.0);
    }
}
