use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::comparison::{ComparisonRow, ComparisonTable};
use super::model::{MetricsCollection, MetricsTable};
use super::normalize::{normalize, NormalizationMode};
use crate::error::MetricsError;

/// Preferred name of the index column; falls back to the first column.
pub const INDEX_COLUMN: &str = "Algorithm";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a metrics table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one row per algorithm
/// * `.json`    – `[{ "Algorithm": "KMeans", "TestAcc": 0.91, ... }, ...]`
/// * `.parquet` – one string index column plus numeric metric columns
pub fn load_file(path: &Path) -> Result<MetricsTable> {
    ensure_exists(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => return Err(MetricsError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!(
        "Loaded {} algorithms × {} metrics from {}",
        table.len(),
        table.metrics().len(),
        path.display()
    );
    Ok(table)
}

/// Load one table per `(dataset, path)` pair, normalize the `targets`
/// columns, and check the tables agree on algorithms and metrics.
pub fn load_collection(
    sources: &[(String, PathBuf)],
    mode: NormalizationMode,
    targets: &[&str],
) -> Result<MetricsCollection> {
    let mut tables = Vec::with_capacity(sources.len());
    for (name, path) in sources {
        let mut table = load_file(path)?;
        let scaled = normalize(&mut table, mode, targets)
            .with_context(|| format!("normalizing dataset '{name}'"))?;
        if !scaled.is_empty() {
            log::info!("{name}: rescaled percentage columns {scaled:?} to [0, 1]");
        }
        tables.push((name.clone(), table));
    }
    Ok(MetricsCollection::from_tables(tables)?)
}

/// Load a long-format comparison CSV: `Method, Data, <metric>...`.
///
/// Every metric cell must be numeric; thousands separators are accepted
/// (`"1,234,000"`), empty cells become NaN.
pub fn load_comparison(path: &Path) -> Result<ComparisonTable> {
    ensure_exists(path)?;
    let mut reader = csv::Reader::from_path(path).context("opening comparison CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let method_idx = column_position(&headers, "Method")?;
    let data_idx = column_position(&headers, "Data")?;
    let metric_cols: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != method_idx && *i != data_idx)
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut values = BTreeMap::new();
        for &(col_idx, name) in &metric_cols {
            let raw = record.get(col_idx).unwrap_or("");
            values.insert(name.clone(), parse_cell(raw, row_no, name)?);
        }
        rows.push(ComparisonRow {
            method: record.get(method_idx).unwrap_or("").trim().to_string(),
            data: record.get(data_idx).unwrap_or("").trim().to_string(),
            values,
        });
    }

    Ok(ComparisonTable {
        rows,
        metrics: metric_cols.into_iter().map(|(_, n)| n.clone()).collect(),
    })
}

/// Find `name` by trying `base/dir/name` for each search dir in order.
/// Absolute names are checked as-is.
pub fn resolve_input(name: &Path, base: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf, MetricsError> {
    if name.is_absolute() {
        return if name.exists() {
            Ok(name.to_path_buf())
        } else {
            Err(MetricsError::NotFound {
                path: name.to_path_buf(),
            })
        };
    }
    let candidates: Vec<PathBuf> = if search_dirs.is_empty() {
        vec![base.join(name)]
    } else {
        search_dirs.iter().map(|d| base.join(d).join(name)).collect()
    };
    let found = candidates.iter().find(|c| c.exists()).cloned();
    match found {
        Some(found) => {
            log::debug!("Resolved {} → {}", name.display(), found.display());
            Ok(found)
        }
        None => Err(MetricsError::NotFoundAny { candidates }),
    }
}

/// Parse a numeric cell: trims whitespace and strips thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok()
}

fn parse_cell(raw: &str, row: usize, column: &str) -> Result<f64, MetricsError> {
    if raw.trim().is_empty() {
        return Ok(f64::NAN);
    }
    parse_number(raw).ok_or_else(|| MetricsError::InvalidNumber {
        row,
        column: column.to_string(),
        raw: raw.to_string(),
    })
}

fn ensure_exists(path: &Path) -> Result<(), MetricsError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MetricsError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

fn column_position(headers: &[String], name: &str) -> Result<usize, MetricsError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| MetricsError::MissingColumn {
            column: name.to_string(),
        })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names; the `Algorithm` column (or the first column
/// when there is none) is the index, every other column is a metric.
fn load_csv(path: &Path) -> Result<MetricsTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() {
        bail!(MetricsError::Empty);
    }

    let index_idx = headers.iter().position(|h| h == INDEX_COLUMN).unwrap_or(0);
    let metric_cols: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index_idx)
        .collect();

    let mut algorithms = Vec::new();
    let mut values = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        algorithms.push(record.get(index_idx).unwrap_or("").trim().to_string());
        let row = metric_cols
            .iter()
            .map(|&(col_idx, name)| parse_cell(record.get(col_idx).unwrap_or(""), row_no, name))
            .collect::<Result<Vec<_>, _>>()?;
        values.push(row);
    }

    Ok(MetricsTable::new(
        headers[index_idx].clone(),
        algorithms,
        metric_cols.into_iter().map(|(_, n)| n.clone()).collect(),
        values,
    )?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Metric order is
/// the key order of the first record; numbers may also be given as strings.
fn load_json(path: &Path) -> Result<MetricsTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;
    let first = records
        .first()
        .and_then(|r| r.as_object())
        .ok_or(MetricsError::Empty)?;
    let metrics: Vec<String> = first
        .keys()
        .filter(|k| k.as_str() != INDEX_COLUMN)
        .cloned()
        .collect();

    let mut algorithms = Vec::with_capacity(records.len());
    let mut values = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let alg = obj
            .get(INDEX_COLUMN)
            .and_then(|v| v.as_str())
            .ok_or_else(|| MetricsError::MissingColumn {
                column: INDEX_COLUMN.to_string(),
            })?;
        algorithms.push(alg.to_string());

        let row = metrics
            .iter()
            .map(|m| json_to_f64(obj.get(m), i, m))
            .collect::<Result<Vec<_>, _>>()?;
        values.push(row);
    }

    Ok(MetricsTable::new(INDEX_COLUMN, algorithms, metrics, values)?)
}

fn json_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<f64, MetricsError> {
    match val {
        None | Some(JsonValue::Null) => Ok(f64::NAN),
        Some(JsonValue::Number(n)) => Ok(n.as_f64().unwrap_or(f64::NAN)),
        Some(JsonValue::String(s)) => parse_cell(s, row, col),
        Some(other) => Err(MetricsError::InvalidNumber {
            row,
            column: col.to_string(),
            raw: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet metrics table.
///
/// Expected schema:
/// - `Algorithm` (or the first string column): Utf8 / LargeUtf8
/// - every other column: Float64, Float32, Int64 or Int32
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<MetricsTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut index_name: Option<String> = None;
    let mut metrics: Vec<String> = Vec::new();
    let mut algorithms = Vec::new();
    let mut values = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", pretty_format_batches(&[batch.clone()])?);
        }
        let schema = batch.schema();

        let index_idx = match schema.index_of(INDEX_COLUMN) {
            Ok(i) => i,
            Err(_) => schema
                .fields()
                .iter()
                .position(|f| matches!(f.data_type(), DataType::Utf8 | DataType::LargeUtf8))
                .ok_or_else(|| MetricsError::MissingColumn {
                    column: INDEX_COLUMN.to_string(),
                })?,
        };
        let metric_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();
        if index_name.is_none() {
            index_name = Some(schema.field(index_idx).name().clone());
            metrics = metric_cols.iter().map(|(_, n)| n.clone()).collect();
        }

        let index_col = batch.column(index_idx);
        for row in 0..batch.num_rows() {
            algorithms.push(extract_string(index_col, row)?);
            let cells = metric_cols
                .iter()
                .map(|(i, name)| extract_f64(batch.column(*i), row, name))
                .collect::<Result<Vec<_>>>()?;
            values.push(cells);
        }
    }

    let index_name = index_name.ok_or(MetricsError::Empty)?;
    Ok(MetricsTable::new(index_name, algorithms, metrics, values)?)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("Row {row}: null algorithm name");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Index column must be a string column, got {other:?}"),
    }
}

/// Extract one numeric cell; nulls become NaN.
fn extract_f64(col: &Arc<dyn Array>, row: usize, name: &str) -> Result<f64> {
    if col.is_null(row) {
        return Ok(f64::NAN);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        other => bail!("Column '{name}' has type {other:?}, expected a numeric column"),
    };
    value.with_context(|| format!("Column '{name}': unexpected array layout"))
}

#[cfg(test)]
pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "rusty_metrics_{tag}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
