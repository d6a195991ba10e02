//! Technical indicator computations
//!
//! Standard fixed-window formulas over closing prices. Each function returns
//! one value per input bar, `None` where the lookback window is not yet full,
//! so indicator columns always line up with the price series.

/// Simple moving average over a fixed window
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    let mut sum = 0.0;

    for (i, close) in closes.iter().enumerate() {
        sum += close;
        if i >= window {
            sum -= closes[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential moving average with span smoothing (alpha = 2 / (span + 1)),
/// seeded from the first close. Defined from the first bar onward.
pub fn ema(closes: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut current = match closes.first() {
        Some(first) => *first,
        None => return out,
    };
    out.push(current);

    for close in &closes[1..] {
        current = alpha * close + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// Relative strength index over rolling-mean gains and losses.
///
/// The first bar has no price delta, so values appear once `window` deltas
/// have accumulated. A zero average loss maps to RSI 100.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if closes.len() <= window {
        return out;
    }

    let gains: Vec<f64> = closes
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();
    let losses: Vec<f64> = closes
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).max(0.0))
        .collect();

    for i in window..closes.len() {
        let start = i - window;
        let avg_gain: f64 = gains[start..i].iter().sum::<f64>() / window as f64;
        let avg_loss: f64 = losses[start..i].iter().sum::<f64>() / window as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
        out[i] = Some(value);
    }
    out
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD: fast EMA minus slow EMA, with an EMA of the difference as signal
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_span);
    let histogram: Vec<f64> = line
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_sma_window_alignment() {
        let closes = rising(5);
        let values = sma(&closes, 3);
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(101.0));
        assert_eq!(values[4], Some(103.0));
    }

    #[test]
    fn test_sma_window_larger_than_series() {
        let closes = rising(5);
        let values = sma(&closes, 20);
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_seeded_from_first_close() {
        let closes = vec![10.0, 11.0, 12.0];
        let values = ema(&closes, 2);
        assert_eq!(values.len(), 3);
        assert!((values[0] - 10.0).abs() < 1e-9);
        // alpha = 2/3
        assert!((values[1] - (2.0 / 3.0 * 11.0 + 1.0 / 3.0 * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes = rising(20);
        let values = rsi(&closes, 14);
        assert_eq!(values.len(), 20);
        assert!(values[..14].iter().all(Option::is_none));
        assert_eq!(values[14], Some(100.0));
        assert_eq!(values[19], Some(100.0));
    }

    #[test]
    fn test_rsi_mixed_series_in_range() {
        let closes: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { 2.0 } else { -1.0 } * (i as f64 % 5.0))
            .collect();
        let values = rsi(&closes, 14);
        for value in values.iter().flatten() {
            assert!(*value >= 0.0 && *value <= 100.0);
        }
    }

    #[test]
    fn test_macd_shapes_and_histogram() {
        let closes = rising(40);
        let result = macd(&closes, 12, 26, 9);
        assert_eq!(result.line.len(), 40);
        assert_eq!(result.signal.len(), 40);
        assert_eq!(result.histogram.len(), 40);
        for i in 0..40 {
            assert!((result.histogram[i] - (result.line[i] - result.signal[i])).abs() < 1e-9);
        }
        // Steady uptrend keeps the fast EMA above the slow EMA.
        assert!(result.line[39] > 0.0);
    }
}
