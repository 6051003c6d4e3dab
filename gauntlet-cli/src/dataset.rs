use anyhow::Context;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const SYNTHETIC_PIXELS: usize = 10;

#[derive(Debug, Deserialize)]
struct Sample {
    input: Value,
    label: usize,
}

pub fn load(path: &Path, limit: usize) -> anyhow::Result<Vec<(Value, usize)>> {
    let file = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    read(BufReader::new(file), limit)
}

/// Read at most `limit` labeled samples from JSON lines. Blank lines are skipped.
pub fn read(reader: impl BufRead, limit: usize) -> anyhow::Result<Vec<(Value, usize)>> {
    let mut samples = vec![];
    for (n, line) in reader.lines().enumerate() {
        if samples.len() == limit {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let sample: Sample =
            serde_json::from_str(&line).with_context(|| format!("dataset line {}", n + 1))?;
        samples.push((sample.input, sample.label));
    }
    Ok(samples)
}

/// Random pixel vectors labeled with their brightest pixel, each asking the mock service for a
/// short reply delay.
pub fn synthetic(count: usize, rng: &mut impl Rng) -> Vec<(Value, usize)> {
    (0..count)
        .map(|_| {
            let pixels: Vec<f32> = (0..SYNTHETIC_PIXELS).map(|_| rng.gen()).collect();
            let label = pixels
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let delay_ms: u64 = rng.gen_range(1..20);
            (json!({ "pixels": pixels, "delay_ms": delay_ms }), label)
        })
        .collect()
}
