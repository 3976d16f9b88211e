//! Frame-to-frame RMSD kernels.

use nalgebra::{Matrix3, Vector3};

/// RMSD after optimal superposition (Kabsch).
///
/// Mismatched or empty frames compare as 0.0; callers validate atom counts
/// before reaching this point.
pub fn kabsch_rmsd(a: &[[f32; 4]], b: &[[f32; 4]]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let x = to_vectors(a);
    let y = to_vectors(b);
    let cx = centroid(&x);
    let cy = centroid(&y);

    let mut h = Matrix3::<f64>::zeros();
    let mut sum_x2 = 0.0f64;
    let mut sum_y2 = 0.0f64;
    for (px, py) in x.iter().zip(y.iter()) {
        let x0 = px - cx;
        let y0 = py - cy;
        h += x0 * y0.transpose();
        sum_x2 += x0.dot(&x0);
        sum_y2 += y0.dot(&y0);
    }
    let svd = h.svd(true, true);
    let mut sigma_sum = svd.singular_values.sum();
    if let (Some(u), Some(v_t)) = (svd.u, svd.v_t) {
        // reflection: flip the smallest singular value
        if (v_t.transpose() * u.transpose()).determinant() < 0.0 {
            sigma_sum -= 2.0 * svd.singular_values.min();
        }
    }
    let rmsd2 = (sum_x2 + sum_y2 - 2.0 * sigma_sum) / a.len() as f64;
    if rmsd2 <= 0.0 {
        0.0
    } else {
        rmsd2.sqrt()
    }
}

/// RMSD of raw coordinates, no centering or rotation.
pub fn rmsd_nofit(a: &[[f32; 4]], b: &[[f32; 4]]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for (pa, pb) in a.iter().zip(b.iter()) {
        for k in 0..3 {
            let d = pa[k] as f64 - pb[k] as f64;
            sum += d * d;
        }
    }
    (sum / a.len() as f64).sqrt()
}

fn to_vectors(points: &[[f32; 4]]) -> Vec<Vector3<f64>> {
    points
        .iter()
        .map(|p| Vector3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        .collect()
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let mut c = Vector3::new(0.0, 0.0, 0.0);
    for p in points {
        c += p;
    }
    c / (points.len() as f64)
}
