use serde::Serialize;

/// Share of the sample removed by the trim loop, as `floor(TRIM_FRACTION * count)`.
pub const TRIM_FRACTION: f64 = 0.31;

/// Rank used for the `p80` estimate.
pub const P80_RANK: f64 = 0.8;

/// Rank used for the residual's `p90`.
pub const TRIMMED_P90_RANK: f64 = 0.9;

/// Summary of the outlier-trimmed residual set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimmedStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p90: Option<f64>,
    /// Score of the last removal; `None` when nothing was trimmed.
    pub score: Option<f64>,
}

/// Descriptive statistics for one tier. `None` marks values that are
/// undefined for the sample size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatResult {
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub p80: Option<f64>,
    pub std_dev: Option<f64>,
    pub trimmed: TrimmedStats,
}

fn rank(data: &[f64], fraction: f64) -> Option<f64> {
    let index = (data.len() as f64 * fraction) as usize;
    data.get(index).copied()
}

/// Computes tier statistics. `data` must be sorted ascending.
pub fn get_stats(data: &[f64]) -> StatResult {
    debug_assert!(data.windows(2).all(|w| w[0] <= w[1]), "input must be sorted");

    let count = data.len();
    let sum: f64 = data.iter().sum();
    let mean = (count > 0).then(|| sum / count as f64);

    let std_dev = match mean {
        Some(mean) if count >= 2 => {
            let squares: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
            Some((squares / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    StatResult {
        count,
        sum,
        mean,
        min: data.first().copied(),
        max: data.last().copied(),
        median: rank(data, 0.5),
        p80: rank(data, P80_RANK),
        std_dev,
        trimmed: trim(data, mean.unwrap_or(0.0)),
    }
}

/// Drops `floor(TRIM_FRACTION * count)` extremes, one per step.
///
/// Each step scores the residual set with its lowest element removed and
/// with its highest removed, against the mean and count of the *full*
/// sample, and drops the side with the lower score. On an exact tie the
/// step index decides: high when `i % 4` is 2 or 3, low otherwise.
///
/// Both scores share every term except the excluded element's, so comparing
/// scores reduces to comparing those two terms.
fn trim(data: &[f64], mean: f64) -> TrimmedStats {
    let count = data.len();
    let removals = (TRIM_FRACTION * count as f64) as usize;

    let mut lo = 0;
    let mut hi = count;
    for i in 0..removals {
        let low_term = (data[lo] - mean).powi(2);
        let high_term = (data[hi - 1] - mean).powi(2);

        // Excluding the larger term leaves the smaller score.
        let drop_low = if low_term > high_term {
            true
        } else if low_term < high_term {
            false
        } else {
            !matches!(i % 4, 2 | 3)
        };

        if drop_low {
            lo += 1;
        } else {
            hi -= 1;
        }
    }

    let residual = &data[lo..hi];
    // The last step's winning score is the residual left after it.
    let score = (removals > 0).then(|| {
        let squares: f64 = residual.iter().map(|x| (x - mean).powi(2)).sum();
        (squares / (count - 2) as f64).sqrt()
    });

    TrimmedStats {
        count: residual.len(),
        min: residual.first().copied(),
        max: residual.last().copied(),
        p90: rank(residual, TRIMMED_P90_RANK),
        score,
    }
}
