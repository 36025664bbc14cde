use std::fmt;

use crate::error::MetricsError;

// ---------------------------------------------------------------------------
// MetricRecord – a single cell of a metrics table
// ---------------------------------------------------------------------------

/// One (algorithm, dataset, metric) measurement in long form.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub algorithm: String,
    pub dataset: String,
    pub metric: String,
    pub value: f64,
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} = {:.4}",
            self.dataset, self.algorithm, self.metric, self.value
        )
    }
}

// ---------------------------------------------------------------------------
// MetricsTable – algorithms × metrics for one dataset
// ---------------------------------------------------------------------------

/// Results of one dataset: rows are algorithms, columns are metric names.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    /// Header of the index column (usually `Algorithm`).
    pub index_name: String,
    algorithms: Vec<String>,
    metrics: Vec<String>,
    /// Row-major: `values[row][col]`.
    values: Vec<Vec<f64>>,
}

impl MetricsTable {
    /// Build a table, checking every row has one value per metric.
    pub fn new(
        index_name: impl Into<String>,
        algorithms: Vec<String>,
        metrics: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, MetricsError> {
        if algorithms.is_empty() {
            return Err(MetricsError::Empty);
        }
        if values.len() != algorithms.len() {
            return Err(MetricsError::RaggedRow {
                row: values.len().min(algorithms.len()),
                expected: metrics.len(),
                found: 0,
            });
        }
        for (row, cells) in values.iter().enumerate() {
            if cells.len() != metrics.len() {
                return Err(MetricsError::RaggedRow {
                    row,
                    expected: metrics.len(),
                    found: cells.len(),
                });
            }
        }
        Ok(Self {
            index_name: index_name.into(),
            algorithms,
            metrics,
            values,
        })
    }

    pub fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Number of algorithms (rows).
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    fn row_index(&self, algorithm: &str) -> Option<usize> {
        self.algorithms.iter().position(|a| a == algorithm)
    }

    /// Column position of `metric`, or `MissingColumn`.
    pub fn metric_index(&self, metric: &str) -> Result<usize, MetricsError> {
        self.metrics
            .iter()
            .position(|m| m == metric)
            .ok_or_else(|| MetricsError::MissingColumn {
                column: metric.to_string(),
            })
    }

    pub fn value(&self, algorithm: &str, metric: &str) -> Option<f64> {
        let r = self.row_index(algorithm)?;
        let c = self.metric_index(metric).ok()?;
        Some(self.values[r][c])
    }

    /// All metric values of one algorithm, in column order.
    pub fn row(&self, algorithm: &str) -> Option<&[f64]> {
        self.row_index(algorithm).map(|r| self.values[r].as_slice())
    }

    pub fn column(&self, metric: &str) -> Result<Vec<f64>, MetricsError> {
        let c = self.metric_index(metric)?;
        Ok(self.values.iter().map(|row| row[c]).collect())
    }

    /// Projection onto `metrics`, in the order given.
    pub fn select(&self, metrics: &[&str]) -> Result<MetricsTable, MetricsError> {
        let cols = metrics
            .iter()
            .map(|m| self.metric_index(m))
            .collect::<Result<Vec<_>, _>>()?;
        let values = self
            .values
            .iter()
            .map(|row| cols.iter().map(|&c| row[c]).collect())
            .collect();
        MetricsTable::new(
            self.index_name.clone(),
            self.algorithms.clone(),
            metrics.iter().map(|m| m.to_string()).collect(),
            values,
        )
    }

    /// Largest finite value across `metrics`; `NEG_INFINITY` when all are NaN.
    pub fn max_of(&self, metrics: &[&str]) -> Result<f64, MetricsError> {
        let mut max = f64::NEG_INFINITY;
        for m in metrics {
            for v in self.column(m)? {
                if v.is_finite() {
                    max = max.max(v);
                }
            }
        }
        Ok(max)
    }

    /// Divide every value of `metric` by `divisor`.
    pub fn scale_column(&mut self, metric: &str, divisor: f64) -> Result<(), MetricsError> {
        let c = self.metric_index(metric)?;
        for row in &mut self.values {
            row[c] /= divisor;
        }
        Ok(())
    }

    /// Long-form view of the table, tagged with `dataset`.
    pub fn records<'a>(&'a self, dataset: &'a str) -> impl Iterator<Item = MetricRecord> + 'a {
        self.algorithms
            .iter()
            .zip(&self.values)
            .flat_map(move |(alg, row)| {
                self.metrics.iter().zip(row).map(move |(m, &v)| MetricRecord {
                    algorithm: alg.clone(),
                    dataset: dataset.to_string(),
                    metric: m.clone(),
                    value: v,
                })
            })
    }
}

// ---------------------------------------------------------------------------
// MetricsCollection – one table per dataset
// ---------------------------------------------------------------------------

/// Named tables sharing the algorithm and metric ordering of the first one.
#[derive(Debug, Clone)]
pub struct MetricsCollection {
    tables: Vec<(String, MetricsTable)>,
}

impl MetricsCollection {
    /// Collect tables in order. Every table must carry the algorithms and
    /// metrics of the first.
    pub fn from_tables(tables: Vec<(String, MetricsTable)>) -> Result<Self, MetricsError> {
        let Some((_, reference)) = tables.first() else {
            return Err(MetricsError::Empty);
        };
        if reference.is_empty() {
            return Err(MetricsError::Empty);
        }
        for (name, table) in &tables[1..] {
            for alg in reference.algorithms() {
                if table.row(alg).is_none() {
                    return Err(MetricsError::MissingAlgorithm {
                        dataset: name.clone(),
                        algorithm: alg.clone(),
                    });
                }
            }
            for metric in reference.metrics() {
                table.metric_index(metric)?;
            }
        }
        Ok(Self { tables })
    }

    pub fn datasets(&self) -> Vec<&str> {
        self.tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Algorithm order, taken from the first dataset.
    pub fn algorithms(&self) -> &[String] {
        self.tables[0].1.algorithms()
    }

    /// Metric order, taken from the first dataset.
    pub fn metrics(&self) -> &[String] {
        self.tables[0].1.metrics()
    }

    pub fn get(&self, dataset: &str) -> Option<&MetricsTable> {
        self.tables
            .iter()
            .find(|(n, _)| n == dataset)
            .map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Values of `metrics` for `algorithm` in `dataset`, in the given order.
    pub fn values(
        &self,
        dataset: &str,
        algorithm: &str,
        metrics: &[&str],
    ) -> Result<Vec<f64>, MetricsError> {
        let table = self
            .get(dataset)
            .ok_or_else(|| MetricsError::UnknownDataset(dataset.to_string()))?;
        metrics
            .iter()
            .map(|m| {
                table.metric_index(m)?;
                table
                    .value(algorithm, m)
                    .ok_or_else(|| MetricsError::MissingAlgorithm {
                        dataset: dataset.to_string(),
                        algorithm: algorithm.to_string(),
                    })
            })
            .collect()
    }

    /// Every (x, y) pair across all datasets and algorithms; rows where either
    /// value is NaN are dropped.
    pub fn pooled(&self, x_metric: &str, y_metric: &str) -> Result<Vec<(f64, f64)>, MetricsError> {
        let mut points = Vec::new();
        for (_, table) in &self.tables {
            let pair = table.select(&[x_metric, y_metric])?;
            points.extend(
                pair.algorithms()
                    .iter()
                    .filter_map(|alg| pair.row(alg))
                    .map(|row| (row[0], row[1]))
                    .filter(|(x, y)| x.is_finite() && y.is_finite()),
            );
        }
        Ok(points)
    }

    pub fn records(&self) -> Vec<MetricRecord> {
        self.tables
            .iter()
            .flat_map(|(name, t)| t.records(name))
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn table(algs: &[&str], metrics: &[&str], values: &[&[f64]]) -> MetricsTable {
    MetricsTable::new(
        "Algorithm",
        algs.iter().map(|s| s.to_string()).collect(),
        metrics.iter().map(|s| s.to_string()).collect(),
        values.iter().map(|r| r.to_vec()).collect(),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: [&str; 3] = ["TestAcc", "NMI", "ARI"];

    #[test]
    fn lookup_by_algorithm_and_metric() {
        let t = table(&["KMeans", "DEC"], &CLUSTER, &[&[0.9, 0.8, 0.7], &[0.5, 0.3, 0.2]]);
        assert_eq!(t.value("DEC", "NMI"), Some(0.3));
        assert_eq!(t.row("KMeans"), Some(&[0.9, 0.8, 0.7][..]));
        assert_eq!(t.column("ARI").unwrap(), vec![0.7, 0.2]);
        assert!(t.value("GMM", "NMI").is_none());
        assert!(matches!(
            t.column("F1"),
            Err(MetricsError::MissingColumn { column }) if column == "F1"
        ));
    }

    #[test]
    fn select_reorders_columns() {
        let t = table(&["A"], &["NMI", "Time", "TestAcc"], &[&[0.4, 12.0, 0.6]]);
        let s = t.select(&["TestAcc", "NMI"]).unwrap();
        assert_eq!(s.metrics(), &["TestAcc".to_string(), "NMI".to_string()]);
        assert_eq!(s.row("A"), Some(&[0.6, 0.4][..]));
    }

    #[test]
    fn max_ignores_nan() {
        let t = table(&["A", "B"], &CLUSTER, &[&[0.9, f64::NAN, 0.7], &[0.5, 0.3, 0.2]]);
        assert_eq!(t.max_of(&CLUSTER).unwrap(), 0.9);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = MetricsTable::new("Algorithm", vec![], vec!["NMI".into()], vec![]).unwrap_err();
        assert!(matches!(err, MetricsError::Empty));
    }

    #[test]
    fn collection_uses_first_table_order() {
        let a = table(&["X", "Y"], &CLUSTER, &[&[0.1, 0.2, 0.3], &[0.4, 0.5, 0.6]]);
        let b = table(&["Y", "X"], &CLUSTER, &[&[0.7, 0.8, 0.9], &[0.0, 0.1, 0.2]]);
        let c = MetricsCollection::from_tables(vec![("one".into(), a), ("two".into(), b)]).unwrap();
        assert_eq!(c.datasets(), vec!["one", "two"]);
        assert_eq!(c.algorithms(), &["X".to_string(), "Y".to_string()]);
        assert_eq!(c.values("two", "X", &CLUSTER).unwrap(), vec![0.0, 0.1, 0.2]);
        assert_eq!(c.pooled("TestAcc", "NMI").unwrap().len(), 4);
        assert_eq!(c.records().len(), 12);
    }

    #[test]
    fn collection_rejects_missing_algorithm() {
        let a = table(&["X", "Y"], &CLUSTER, &[&[0.1, 0.2, 0.3], &[0.4, 0.5, 0.6]]);
        let b = table(&["X"], &CLUSTER, &[&[0.7, 0.8, 0.9]]);
        let err = MetricsCollection::from_tables(vec![("one".into(), a), ("two".into(), b)])
            .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::MissingAlgorithm { dataset, algorithm } if dataset == "two" && algorithm == "Y"
        ));
    }
}
