use serde::{Deserialize, Serialize};

/// Derived Halstead measures for one chunk.
///
/// All five values are persisted on the chunk; they are `0.0` when the
/// vocabulary is empty (e.g. an empty function body).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalsteadMetrics {
    pub length: u32,
    pub vocabulary: u32,
    pub volume: f64,
    pub difficulty: f64,
    pub effort: f64,
    pub bugs: f64,
}

impl HalsteadMetrics {
    /// Derives the measures from raw operator/operand counts.
    ///
    /// `n1`/`n2` are distinct operators/operands, `big_n1`/`big_n2` totals.
    pub fn from_counts(n1: u32, n2: u32, big_n1: u32, big_n2: u32) -> Self {
        let vocabulary = n1 + n2;
        let length = big_n1 + big_n2;
        if vocabulary == 0 {
            return Self::default();
        }

        let volume = f64::from(length) * f64::from(vocabulary).log2();
        let difficulty = if n2 == 0 {
            0.0
        } else {
            (f64::from(n1) / 2.0) * (f64::from(big_n2) / f64::from(n2))
        };
        let effort = difficulty * volume;
        let bugs = volume / 3000.0;

        Self {
            length,
            vocabulary,
            volume,
            difficulty,
            effort,
            bugs,
        }
    }
}

/// The full metric set computed in one post-order traversal per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub halstead: HalsteadMetrics,
}

impl Default for ComplexityMetrics {
    fn default() -> Self {
        Self {
            // A body with no branches has cyclomatic complexity 1.
            cyclomatic: 1,
            cognitive: 0,
            halstead: HalsteadMetrics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halstead_zero_vocabulary_is_all_zero() {
        let metrics = HalsteadMetrics::from_counts(0, 0, 0, 0);
        assert_eq!(metrics, HalsteadMetrics::default());
    }

    #[test]
    fn test_halstead_derivations() {
        // n1=4, n2=3, N1=10, N2=6 -> length 16, vocabulary 7.
        let metrics = HalsteadMetrics::from_counts(4, 3, 10, 6);
        assert_eq!(metrics.length, 16);
        assert_eq!(metrics.vocabulary, 7);

        let volume = 16.0 * 7.0f64.log2();
        assert!((metrics.volume - volume).abs() < 1e-9);

        let difficulty = (4.0 / 2.0) * (6.0 / 3.0);
        assert!((metrics.difficulty - difficulty).abs() < 1e-9);
        assert!((metrics.effort - difficulty * volume).abs() < 1e-9);
        assert!((metrics.bugs - volume / 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_halstead_no_operands_has_zero_difficulty() {
        let metrics = HalsteadMetrics::from_counts(2, 0, 4, 0);
        assert_eq!(metrics.difficulty, 0.0);
        assert_eq!(metrics.effort, 0.0);
        assert!(metrics.volume > 0.0);
    }

    #[test]
    fn test_default_cyclomatic_is_one() {
        assert_eq!(ComplexityMetrics::default().cyclomatic, 1);
    }
}
