//! Reductions shared by the aggregating plugins

use rasterfn_core::{Error, Result};

/// Aggregation method names, in display order
pub const AGGREGATION_METHODS: &[&str] = &[
    "Sum",
    "Average",
    "Median",
    "Standard Deviation",
    "Minimum",
    "Maximum",
];

/// A reduction over a set of valid values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Median,
    /// Population standard deviation
    StdDev,
    Min,
    Max,
    Range,
}

impl Reducer {
    /// Parse a bound (lowercase) method name
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "average" | "mean" => Ok(Reducer::Mean),
            "median" => Ok(Reducer::Median),
            "standard deviation" | "std" => Ok(Reducer::StdDev),
            "minimum" | "min" => Ok(Reducer::Min),
            "maximum" | "max" => Ok(Reducer::Max),
            "range" => Ok(Reducer::Range),
            other => Err(Error::binding("method", format!("unknown reduction `{other}`"))),
        }
    }

    /// Reduce `values` (reordered in place); `None` when empty
    pub fn apply(&self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;

        let v = match self {
            Reducer::Sum => values.iter().sum::<f64>(),
            Reducer::Mean => values.iter().sum::<f64>() / n,
            Reducer::StdDev => {
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                var.sqrt()
            }
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Range => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                max - min
            }
            Reducer::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        };
        Some(v)
    }
}
