use serde::{Deserialize, Serialize};

use super::model::MetricsTable;
use crate::error::MetricsError;

/// Columns whose maximum exceeds this are taken to be percentages.
const PERCENT_THRESHOLD: f64 = 1.0;

/// How percentage-scale metric columns are brought into [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationMode {
    /// One decision for all target columns: if any value exceeds 1, every
    /// target column is divided by 100.
    #[default]
    Global,
    /// Each target column is rescaled on its own maximum.
    PerColumn,
    Off,
}

/// Rescale the `targets` columns of `table` in place.
///
/// Returns the names of the columns that were divided by 100.
pub fn normalize(
    table: &mut MetricsTable,
    mode: NormalizationMode,
    targets: &[&str],
) -> Result<Vec<String>, MetricsError> {
    let maxima = targets
        .iter()
        .map(|t| table.max_of(&[t]).map(|m| (*t, m)))
        .collect::<Result<Vec<_>, _>>()?;

    let scaled: Vec<&str> = match mode {
        NormalizationMode::Off => Vec::new(),
        NormalizationMode::Global => {
            let overall = maxima.iter().map(|(_, m)| *m).fold(f64::NEG_INFINITY, f64::max);
            if overall > PERCENT_THRESHOLD {
                let fractional: Vec<&str> = maxima
                    .iter()
                    .filter(|(_, m)| *m <= PERCENT_THRESHOLD)
                    .map(|(t, _)| *t)
                    .collect();
                if !fractional.is_empty() {
                    log::warn!(
                        "Global normalization divides {fractional:?} by 100 although they are \
                         already within [0, 1]; consider per-column normalization"
                    );
                }
                targets.to_vec()
            } else {
                Vec::new()
            }
        }
        NormalizationMode::PerColumn => maxima
            .iter()
            .filter(|(_, m)| *m > PERCENT_THRESHOLD)
            .map(|(t, _)| *t)
            .collect(),
    };

    for column in &scaled {
        table.scale_column(column, 100.0)?;
    }
    if !scaled.is_empty() {
        log::debug!("Rescaled percentage columns {scaled:?}");
    }
    Ok(scaled.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::table;

    const CLUSTER: [&str; 3] = ["TestAcc", "NMI", "ARI"];

    fn all_values(t: &MetricsTable) -> Vec<f64> {
        CLUSTER.iter().flat_map(|m| t.column(m).unwrap()).collect()
    }

    #[test]
    fn fractional_input_is_untouched() {
        let original = table(&["A", "B"], &CLUSTER, &[&[0.9, 0.8, 1.0], &[0.5, 0.3, 0.2]]);
        for mode in [NormalizationMode::Global, NormalizationMode::PerColumn] {
            let mut t = original.clone();
            let scaled = normalize(&mut t, mode, &CLUSTER).unwrap();
            assert!(scaled.is_empty());
            assert_eq!(t, original);
        }
    }

    #[test]
    fn percentages_land_in_unit_interval() {
        let mut t = table(
            &["A", "B", "C"],
            &CLUSTER,
            &[&[100.0, 85.5, 70.0], &[0.0, 12.0, 3.5], &[55.0, 99.9, 40.0]],
        );
        normalize(&mut t, NormalizationMode::Global, &CLUSTER).unwrap();
        for v in all_values(&t) {
            assert!((0.0..=1.0).contains(&v), "{v} out of range");
        }
        assert_eq!(t.value("A", "NMI"), Some(0.855));
    }

    #[test]
    fn global_mode_scales_every_target_column() {
        // ARI is already fractional but gets divided anyway.
        let mut t = table(&["A"], &CLUSTER, &[&[90.0, 80.0, 0.7]]);
        let scaled = normalize(&mut t, NormalizationMode::Global, &CLUSTER).unwrap();
        assert_eq!(scaled.len(), 3);
        approx::assert_abs_diff_eq!(t.value("A", "ARI").unwrap(), 0.007, epsilon = 1e-12);
    }

    #[test]
    fn per_column_mode_leaves_fractional_columns() {
        let mut t = table(&["A"], &CLUSTER, &[&[90.0, 80.0, 0.7]]);
        let scaled = normalize(&mut t, NormalizationMode::PerColumn, &CLUSTER).unwrap();
        assert_eq!(scaled, vec!["TestAcc".to_string(), "NMI".to_string()]);
        assert_eq!(t.value("A", "ARI"), Some(0.7));
        approx::assert_abs_diff_eq!(t.value("A", "TestAcc").unwrap(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn off_mode_keeps_percentages() {
        let mut t = table(&["A"], &CLUSTER, &[&[90.0, 80.0, 70.0]]);
        normalize(&mut t, NormalizationMode::Off, &CLUSTER).unwrap();
        assert_eq!(t.value("A", "TestAcc"), Some(90.0));
    }

    #[test]
    fn missing_target_column_is_an_error() {
        let mut t = table(&["A"], &["TestAcc", "NMI"], &[&[0.9, 0.8]]);
        let err = normalize(&mut t, NormalizationMode::Global, &CLUSTER).unwrap_err();
        assert!(matches!(err, MetricsError::MissingColumn { column } if column == "ARI"));
    }
}
