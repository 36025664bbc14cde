use std::collections::BTreeMap;
use std::fmt;

use crate::error::ComparisonError;

// ---------------------------------------------------------------------------
// Condition – the preprocessing variant a row was measured under
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    Original,
    Pca,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Condition::Original, Condition::Pca];

    /// Label as it appears in the `Data` column.
    pub fn label(self) -> &'static str {
        match self {
            Condition::Original => "Original",
            Condition::Pca => "PCA",
        }
    }

    /// Legend text for charts.
    pub fn legend(self) -> &'static str {
        match self {
            Condition::Original => "Original Data",
            Condition::Pca => "PCA Data",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Metric plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log,
}

/// One bar chart of the comparison report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonMetric {
    /// Column in the comparison CSV.
    pub column: &'static str,
    pub title: &'static str,
    pub scale: AxisScale,
}

pub const COMPARISON_METRICS: [ComparisonMetric; 3] = [
    ComparisonMetric {
        column: "Accuracy",
        title: "Accuracy",
        scale: AxisScale::Linear,
    },
    ComparisonMetric {
        column: "Wall-clock Time (s)",
        title: "Wall-clock Time (s) (log scale)",
        scale: AxisScale::Log,
    },
    ComparisonMetric {
        column: "FLOPs",
        title: "FLOPs (log scale)",
        scale: AxisScale::Log,
    },
];

impl ComparisonMetric {
    /// Axis label: the title up to the first parenthesis.
    pub fn axis_label(&self) -> &'static str {
        self.title.split('(').next().unwrap_or(self.title).trim()
    }

    /// `Wall-clock Time (s)` → `Wall-clock_Time_s_comparison.png`.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .column
            .chars()
            .filter(|c| *c != '(' && *c != ')')
            .map(|c| if c == ' ' { '_' } else { c })
            .collect();
        format!("{stem}_comparison.png")
    }

    pub fn chart_title(&self) -> String {
        format!("Comparison of {} With and Without PCA", self.title)
    }
}

// ---------------------------------------------------------------------------
// Long-format comparison table
// ---------------------------------------------------------------------------

/// One measurement of a method under a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub method: String,
    pub condition: Condition,
    pub metric: String,
    pub value: f64,
}

/// One row of the long-format table: `Method, Data, metric...`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub method: String,
    /// Raw `Data` label; may name a condition outside the compared pair.
    pub data: String,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
    /// Metric columns in file order.
    pub metrics: Vec<String>,
}

impl ComparisonTable {
    /// Distinct methods in order of first appearance.
    pub fn methods(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.method.as_str()) {
                seen.push(&row.method);
            }
        }
        seen
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.rows.iter().any(|r| r.data == condition.label())
    }

    /// Rows under a known condition, in long form.
    pub fn records(&self) -> Vec<ComparisonRecord> {
        self.rows
            .iter()
            .filter_map(|row| Some((row, Condition::from_label(&row.data)?)))
            .flat_map(|(row, condition)| {
                row.values.iter().map(move |(metric, &value)| ComparisonRecord {
                    method: row.method.clone(),
                    condition,
                    metric: metric.clone(),
                    value,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pivot
// ---------------------------------------------------------------------------

/// Method-indexed wide view of one metric: one value per condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPivot {
    pub metric: String,
    pub methods: Vec<String>,
    pub original: Vec<f64>,
    pub pca: Vec<f64>,
    /// Methods dropped because a condition had no value.
    pub skipped: Vec<String>,
}

impl ComparisonPivot {
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn series(&self, condition: Condition) -> &[f64] {
        match condition {
            Condition::Original => &self.original,
            Condition::Pca => &self.pca,
        }
    }

    pub fn value(&self, method: &str, condition: Condition) -> Option<f64> {
        let i = self.methods.iter().position(|m| m == method)?;
        Some(self.series(condition)[i])
    }
}

/// Pivots a long comparison table into per-metric wide views.
pub struct ComparisonBuilder<'a> {
    table: &'a ComparisonTable,
    methods: Vec<&'a str>,
}

impl<'a> ComparisonBuilder<'a> {
    /// Fails when the `Data` column lacks either condition label.
    pub fn new(table: &'a ComparisonTable) -> Result<Self, ComparisonError> {
        if !Condition::ALL.iter().all(|c| table.has_condition(*c)) {
            return Err(ComparisonError::MissingConditions {
                required: Condition::ALL.iter().map(|c| c.label().to_string()).collect(),
            });
        }
        Ok(Self {
            table,
            methods: table.methods(),
        })
    }

    pub fn methods(&self) -> &[&'a str] {
        &self.methods
    }

    /// Wide view of `metric`. Methods with a missing (or NaN) cell for either
    /// condition are left out and listed in `skipped`.
    pub fn pivot(&self, metric: &str) -> Result<ComparisonPivot, ComparisonError> {
        if !self.table.metrics.iter().any(|m| m == metric) {
            return Err(ComparisonError::MissingMetric(metric.to_string()));
        }

        let mut cells: BTreeMap<(&str, Condition), f64> = BTreeMap::new();
        for row in &self.table.rows {
            let Some(condition) = Condition::from_label(&row.data) else {
                continue;
            };
            let Some(&value) = row.values.get(metric) else {
                continue;
            };
            if cells.insert((row.method.as_str(), condition), value).is_some() {
                return Err(ComparisonError::DuplicateEntry {
                    method: row.method.clone(),
                    condition: condition.label().to_string(),
                });
            }
        }

        let mut pivot = ComparisonPivot {
            metric: metric.to_string(),
            methods: Vec::new(),
            original: Vec::new(),
            pca: Vec::new(),
            skipped: Vec::new(),
        };
        for &method in &self.methods {
            let original = cells.get(&(method, Condition::Original)).copied();
            let pca = cells.get(&(method, Condition::Pca)).copied();
            match (original, pca) {
                (Some(o), Some(p)) if !o.is_nan() && !p.is_nan() => {
                    pivot.methods.push(method.to_string());
                    pivot.original.push(o);
                    pivot.pca.push(p);
                }
                _ => pivot.skipped.push(method.to_string()),
            }
        }

        if pivot.is_empty() {
            return Err(ComparisonError::Empty(metric.to_string()));
        }
        Ok(pivot)
    }
}

#[cfg(test)]
pub(crate) fn long_table(rows: &[(&str, &str, &[(&str, f64)])]) -> ComparisonTable {
    let mut metrics: Vec<String> = Vec::new();
    let rows = rows
        .iter()
        .map(|(method, data, values)| {
            for (m, _) in values.iter() {
                if !metrics.iter().any(|x| x == m) {
                    metrics.push(m.to_string());
                }
            }
            ComparisonRow {
                method: method.to_string(),
                data: data.to_string(),
                values: values.iter().map(|(m, v)| (m.to_string(), *v)).collect(),
            }
        })
        .collect();
    ComparisonTable { rows, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_reproduces_input_cells() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.91)]),
            ("A", "PCA", &[("Accuracy", 0.88)]),
            ("B", "Original", &[("Accuracy", 0.75)]),
            ("B", "PCA", &[("Accuracy", 0.79)]),
        ]);
        let pivot = ComparisonBuilder::new(&t).unwrap().pivot("Accuracy").unwrap();
        assert_eq!(pivot.len(), 2);
        assert_eq!(Condition::ALL.len(), 2);
        assert_eq!(pivot.methods, vec!["A", "B"]);
        assert_eq!(pivot.value("A", Condition::Original), Some(0.91));
        assert_eq!(pivot.value("A", Condition::Pca), Some(0.88));
        assert_eq!(pivot.value("B", Condition::Original), Some(0.75));
        assert_eq!(pivot.value("B", Condition::Pca), Some(0.79));
        assert!(pivot.skipped.is_empty());
    }

    #[test]
    fn method_order_follows_first_appearance() {
        let t = long_table(&[
            ("Zeta", "PCA", &[("Accuracy", 0.1)]),
            ("Alpha", "Original", &[("Accuracy", 0.2)]),
            ("Zeta", "Original", &[("Accuracy", 0.3)]),
            ("Alpha", "PCA", &[("Accuracy", 0.4)]),
        ]);
        let pivot = ComparisonBuilder::new(&t).unwrap().pivot("Accuracy").unwrap();
        assert_eq!(pivot.methods, vec!["Zeta", "Alpha"]);
        assert_eq!(pivot.original, vec![0.3, 0.2]);
    }

    #[test]
    fn incomplete_method_is_skipped() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.9)]),
            ("A", "PCA", &[("Accuracy", 0.8)]),
            ("B", "Original", &[("Accuracy", 0.7)]),
        ]);
        let pivot = ComparisonBuilder::new(&t).unwrap().pivot("Accuracy").unwrap();
        assert_eq!(pivot.methods, vec!["A"]);
        assert_eq!(pivot.skipped, vec!["B"]);
    }

    #[test]
    fn nan_cell_counts_as_missing() {
        let t = long_table(&[
            ("A", "Original", &[("FLOPs", f64::NAN)]),
            ("A", "PCA", &[("FLOPs", 1.0e6)]),
        ]);
        let err = ComparisonBuilder::new(&t).unwrap().pivot("FLOPs").unwrap_err();
        assert_eq!(err, ComparisonError::Empty("FLOPs".into()));
    }

    #[test]
    fn missing_condition_label_is_reported() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.9)]),
            ("A", "LDA", &[("Accuracy", 0.8)]),
        ]);
        assert!(matches!(
            ComparisonBuilder::new(&t),
            Err(ComparisonError::MissingConditions { .. })
        ));
    }

    #[test]
    fn duplicate_cells_are_rejected() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.9)]),
            ("A", "Original", &[("Accuracy", 0.8)]),
            ("A", "PCA", &[("Accuracy", 0.7)]),
        ]);
        let err = ComparisonBuilder::new(&t).unwrap().pivot("Accuracy").unwrap_err();
        assert_eq!(
            err,
            ComparisonError::DuplicateEntry {
                method: "A".into(),
                condition: "Original".into()
            }
        );
    }

    #[test]
    fn unknown_metric_is_reported() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.9)]),
            ("A", "PCA", &[("Accuracy", 0.8)]),
        ]);
        let err = ComparisonBuilder::new(&t).unwrap().pivot("FLOPs").unwrap_err();
        assert_eq!(err, ComparisonError::MissingMetric("FLOPs".into()));
    }

    #[test]
    fn chart_names_and_labels() {
        let [acc, time, flops] = COMPARISON_METRICS;
        assert_eq!(acc.file_name(), "Accuracy_comparison.png");
        assert_eq!(time.file_name(), "Wall-clock_Time_s_comparison.png");
        assert_eq!(time.axis_label(), "Wall-clock Time");
        assert_eq!(flops.axis_label(), "FLOPs");
        assert_eq!(
            flops.chart_title(),
            "Comparison of FLOPs (log scale) With and Without PCA"
        );
    }

    #[test]
    fn records_only_cover_known_conditions() {
        let t = long_table(&[
            ("A", "Original", &[("Accuracy", 0.9), ("FLOPs", 2.0)]),
            ("A", "LDA", &[("Accuracy", 0.8)]),
        ]);
        let records = t.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.condition == Condition::Original));
    }
}
