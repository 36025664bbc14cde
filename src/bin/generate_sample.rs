use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const ALGORITHMS: [&str; 5] = ["KMeans", "GMM", "Spectral", "Agglomerative", "DBSCAN"];
const METRICS: [&str; 3] = ["TestAcc", "NMI", "ARI"];

/// Per-algorithm base scores (accuracy, NMI, ARI) before dataset jitter.
const BASE_SCORES: [[f64; 3]; 5] = [
    [0.58, 0.50, 0.39],
    [0.62, 0.55, 0.44],
    [0.71, 0.68, 0.57],
    [0.66, 0.61, 0.49],
    [0.32, 0.28, 0.12],
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Scores for one dataset: `difficulty` shifts every algorithm down.
fn dataset_scores(rng: &mut SimpleRng, difficulty: f64) -> Vec<[f64; 3]> {
    BASE_SCORES
        .iter()
        .map(|&row| row.map(|v| (v - difficulty + rng.gauss(0.0, 0.03)).clamp(0.01, 0.99)))
        .collect()
}

fn write_metrics_csv(path: &Path, scores: &[[f64; 3]], percent: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let mut header = vec!["Algorithm"];
    header.extend(METRICS);
    wtr.write_record(&header)?;
    for (alg, row) in ALGORITHMS.iter().zip(scores) {
        let scale = if percent { 100.0 } else { 1.0 };
        let mut record = vec![alg.to_string()];
        record.extend(row.iter().map(|v| format!("{:.4}", v * scale)));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_metrics_parquet(path: &Path, scores: &[[f64; 3]]) -> Result<()> {
    let mut fields = vec![Field::new("Algorithm", DataType::Utf8, false)];
    fields.extend(METRICS.iter().map(|m| Field::new(*m, DataType::Float64, false)));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<Arc<dyn arrow::array::Array>> =
        vec![Arc::new(StringArray::from(ALGORITHMS.to_vec()))];
    for k in 0..METRICS.len() {
        columns.push(Arc::new(Float64Array::from(
            scores.iter().map(|row| row[k]).collect::<Vec<_>>(),
        )));
    }
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Long-format Original vs PCA table. FLOPs use thousands separators.
fn write_comparison_csv(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let methods: [(&str, f64, f64, f64); 4] = [
        ("Logistic Regression", 0.92, 14.0, 7.9e9),
        ("SVM", 0.97, 310.0, 2.4e11),
        ("Random Forest", 0.96, 48.0, 1.1e10),
        ("kNN", 0.95, 95.0, 4.7e10),
    ];

    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["Method", "Data", "Accuracy", "Wall-clock Time (s)", "FLOPs"])?;
    for (method, acc, time, flops) in methods {
        for (data, acc_shift, shrink) in [("Original", 0.0, 1.0), ("PCA", -0.015, 0.12)] {
            let accuracy = (acc + acc_shift + rng.gauss(0.0, 0.004)).min(0.999);
            let seconds = time * shrink * (1.0 + rng.gauss(0.0, 0.05)).max(0.5);
            let flops = (flops * shrink).round() as u64;
            wtr.write_record([
                method.to_string(),
                data.to_string(),
                format!("{accuracy:.4}"),
                format!("{seconds:.2}"),
                with_separators(flops),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// `1234567` → `1,234,567`
fn with_separators(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let mnist = dataset_scores(&mut rng, 0.0);
    let fashion = dataset_scores(&mut rng, 0.08);
    let medical = dataset_scores(&mut rng, -0.05);

    write_metrics_csv(&out_dir.join("MNIST-metrics.csv"), &mnist, false)?;
    write_metrics_csv(&out_dir.join("Fashion-MNIST-metrics.csv"), &fashion, false)?;
    // Percentages, as some evaluation scripts report them.
    write_metrics_csv(&out_dir.join("Medical-MNIST-metrics.csv"), &medical, true)?;
    write_metrics_parquet(&out_dir.join("MNIST-metrics.parquet"), &mnist)?;
    write_comparison_csv(&out_dir.join("MNIST-metrics-comparison.csv"), &mut rng)?;

    let config = serde_json::json!({
        "data_dir": ".",
        "datasets": [
            { "name": "MNIST", "file": "MNIST-metrics.csv" },
            { "name": "Fashion-MNIST", "file": "Fashion-MNIST-metrics.csv" },
            { "name": "Medical-MNIST", "file": "Medical-MNIST-metrics.csv" }
        ],
        "comparison_file": "MNIST-metrics-comparison.csv",
        "normalization": "global",
        "target_metrics": METRICS,
    });
    let config_path = out_dir.join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote 3 datasets × {} algorithms and a comparison table to {}",
        ALGORITHMS.len(),
        out_dir.display()
    );
    Ok(())
}
