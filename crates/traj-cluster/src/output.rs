//! Text outputs of a finalized run: cluster-ID series, summary table,
//! human-readable info report, k-distance curve.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cluster::{Cluster, NOISE_ID};
use crate::config::OutputSpec;
use crate::engine::ClusterRun;
use crate::error::ClusterResult;
use crate::list::ClusterList;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub id: i32,
    pub population: usize,
    pub fraction: f64,
    /// Mean pairwise distance among members present in the distance matrix.
    pub avg_dist: f64,
    pub stdev: f64,
    pub centroid: Option<usize>,
    /// Mean distance from this centroid to the other clusters' centroids.
    pub avg_centroid_dist: f64,
}

pub fn summarize(list: &ClusterList) -> ClusterResult<Vec<SummaryRow>> {
    let clusters = list.ordered_clusters()?;
    let total = list.total_frames().max(1) as f64;
    let matrix = list.matrix();
    let mut rows = Vec::with_capacity(clusters.len());
    for (id, cluster) in clusters.iter().enumerate() {
        let resident: Vec<usize> = cluster.members().filter(|&f| matrix.contains(f)).collect();
        let mut sum = 0.0f64;
        let mut sum2 = 0.0f64;
        let mut pairs = 0usize;
        for (k, &a) in resident.iter().enumerate() {
            for &b in resident[k + 1..].iter() {
                let d = matrix.distance(a, b)?;
                sum += d;
                sum2 += d * d;
                pairs += 1;
            }
        }
        let (avg_dist, stdev) = if pairs > 0 {
            let mean = sum / pairs as f64;
            let var = (sum2 / pairs as f64 - mean * mean).max(0.0);
            (mean, var.sqrt())
        } else {
            (0.0, 0.0)
        };

        let mut cdist = 0.0f64;
        let mut n_other = 0usize;
        if let Some(own) = cluster.centroid() {
            for (other_id, other) in clusters.iter().enumerate() {
                if other_id == id {
                    continue;
                }
                if let Some(Ok(d)) = other.centroid().map(|c| matrix.distance(own, c)) {
                    cdist += d;
                    n_other += 1;
                }
            }
        }
        rows.push(SummaryRow {
            id: id as i32,
            population: cluster.population(),
            fraction: cluster.population() as f64 / total,
            avg_dist,
            stdev,
            centroid: cluster.centroid(),
            avg_centroid_dist: if n_other > 0 { cdist / n_other as f64 } else { 0.0 },
        });
    }
    Ok(rows)
}

pub fn write_series<W: Write>(out: &mut W, labels: &[i32]) -> ClusterResult<()> {
    writeln!(out, "#Frame Cluster")?;
    for (frame, id) in labels.iter().enumerate() {
        writeln!(out, "{frame:>8} {id:>8}")?;
    }
    Ok(())
}

pub fn write_summary<W: Write>(out: &mut W, list: &ClusterList) -> ClusterResult<()> {
    let rows = summarize(list)?;
    writeln!(
        out,
        "#{:>7} {:>8} {:>8} {:>10} {:>10} {:>8} {:>10}",
        "Cluster", "Frames", "Frac", "AvgDist", "Stdev", "Centroid", "AvgCDist"
    )?;
    for row in rows.iter() {
        let centroid = row
            .centroid
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:>8} {:>8} {:>8.3} {:>10.4} {:>10.4} {:>8} {:>10.4}",
            row.id,
            row.population,
            row.fraction,
            row.avg_dist,
            row.stdev,
            centroid,
            row.avg_centroid_dist
        )?;
    }
    let noise = list.noise_frames().len();
    let total = list.total_frames().max(1) as f64;
    writeln!(
        out,
        "{:>8} {:>8} {:>8.3}",
        NOISE_ID,
        noise,
        noise as f64 / total
    )?;
    Ok(())
}

/// Compact frame list, consecutive runs folded: `0-3 6 8-9`.
pub fn frame_ranges<I: IntoIterator<Item = usize>>(frames: I) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    for frame in frames {
        run = match run {
            Some((start, end)) if frame == end + 1 => Some((start, frame)),
            Some(done) => {
                parts.push(range_text(done));
                Some((frame, frame))
            }
            None => Some((frame, frame)),
        };
    }
    if let Some(done) = run {
        parts.push(range_text(done));
    }
    parts.join(" ")
}

fn range_text((start, end): (usize, usize)) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

pub fn write_info<W: Write>(out: &mut W, run: &ClusterRun) -> ClusterResult<()> {
    let list = &run.list;
    writeln!(out, "#Algorithm: {}", run.info)?;
    writeln!(out, "#Sieve: {}", list.sieve())?;
    writeln!(
        out,
        "#Centroid cost: {}",
        list.centroid_cost().as_str()
    )?;
    match list.matrix().stats() {
        Some(stats) => writeln!(
            out,
            "#Distances: {} pairs, min {:.4}, max {:.4}, mean {:.4}",
            stats.n_pairs, stats.min, stats.max, stats.mean
        )?,
        None => writeln!(out, "#Distances: none")?,
    }
    let clusters: Vec<&Cluster> = list.ordered_clusters()?;
    writeln!(
        out,
        "#Clustered {} frames into {} clusters",
        list.total_frames(),
        clusters.len()
    )?;
    for (id, cluster) in clusters.iter().enumerate() {
        let centroid = cluster
            .centroid()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "#Cluster {id} has {} frames, centroid {centroid}",
            cluster.population()
        )?;
        writeln!(out, "{}", frame_ranges(cluster.members()))?;
    }
    let noise = list.noise_frames();
    writeln!(out, "#Noise: {} frames", noise.len())?;
    if !noise.is_empty() {
        writeln!(out, "{}", frame_ranges(noise))?;
    }
    Ok(())
}

pub fn write_kdist<W: Write>(out: &mut W, k: usize, values: &[f64]) -> ClusterResult<()> {
    writeln!(out, "#Point {k}-dist")?;
    for (point, d) in values.iter().enumerate() {
        writeln!(out, "{point:>8} {d:>12.4}")?;
    }
    Ok(())
}

fn create(path: &str) -> ClusterResult<BufWriter<File>> {
    Ok(BufWriter::new(File::create(Path::new(path))?))
}

/// Write every output file named in `spec`.
pub fn write_run_outputs(spec: &OutputSpec, run: &ClusterRun) -> ClusterResult<()> {
    if let Some(path) = &spec.series {
        let mut out = create(path)?;
        write_series(&mut out, &run.output.labels)?;
        out.flush()?;
    }
    if let Some(path) = &spec.summary {
        let mut out = create(path)?;
        write_summary(&mut out, &run.list)?;
        out.flush()?;
    }
    if let Some(path) = &spec.info {
        let mut out = create(path)?;
        write_info(&mut out, run)?;
        out.flush()?;
    }
    if let (Some(path), Some((k, values))) = (&spec.kdist, &run.kdist) {
        let mut out = create(path)?;
        write_kdist(&mut out, *k, values)?;
        out.flush()?;
    }
    Ok(())
}
