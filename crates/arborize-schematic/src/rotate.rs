//! Morphology rotation
//!
//! Reconstructions are often digitized along an arbitrary axis. Rotating a
//! schematic once, before building, is cheaper than transforming every built
//! model, and lets the aligned morphology be written back to a file so the
//! rotation step can be dropped entirely.

use crate::error::{Result, SchematicError};
use crate::schematic::Schematic;

use arborize_model::Value;

/// 3×3 row-major rotation matrix
pub type Matrix3 = [[f64; 3]; 3];

const IDENTITY: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Rotation matrix taking direction `from` to direction `to` (Rodrigues).
///
/// Parallel directions yield the identity; antiparallel directions rotate π
/// about an axis orthogonal to `from`. Zero-length vectors are rejected.
pub fn rotation_matrix(from: [f64; 3], to: [f64; 3]) -> Result<Matrix3> {
    let from = normalize(from)?;
    let to = normalize(to)?;
    let cos_alpha = dot(from, to).clamp(-1.0, 1.0);
    let alpha = cos_alpha.acos();

    if alpha.abs() < 1e-9 {
        log::warn!("rotating between parallel orientation vectors, leaving morphology as-is");
        return Ok(IDENTITY);
    }

    let axis = if (alpha - std::f64::consts::PI).abs() < 1e-9 {
        log::warn!("rotating between antiparallel orientation vectors");
        normalize(orthogonal(from))?
    } else {
        let cross = cross(from, to);
        normalize([
            cross[0] / alpha.sin(),
            cross[1] / alpha.sin(),
            cross[2] / alpha.sin(),
        ])?
    };

    // Rodrigues' formula: R = I + sin(a) K + (1 - cos(a)) K².
    let k = [
        [0.0, -axis[2], axis[1]],
        [axis[2], 0.0, -axis[0]],
        [-axis[1], axis[0], 0.0],
    ];
    let k2 = matmul(k, k);
    let mut rotation = IDENTITY;
    for (i, row) in rotation.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value += alpha.sin() * k[i][j] + (1.0 - alpha.cos()) * k2[i][j];
        }
    }
    Ok(rotation)
}

/// Rotate every point of a schematic from direction `from` to direction `to`
pub fn rotate<V: Value>(
    schematic: &mut Schematic<V>,
    from: [f64; 3],
    to: [f64; 3],
) -> Result<()> {
    let rotation = rotation_matrix(from, to)?;
    schematic.transform_points(|coords| apply(rotation, coords))
}

/// Apply a rotation matrix to a point
pub fn apply(matrix: Matrix3, point: [f64; 3]) -> [f64; 3] {
    [
        dot(matrix[0], point),
        dot(matrix[1], point),
        dot(matrix[2], point),
    ]
}

fn normalize(v: [f64; 3]) -> Result<[f64; 3]> {
    let norm = dot(v, v).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(SchematicError::ZeroVector);
    }
    Ok([v[0] / norm, v[1] / norm, v[2] / norm])
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Any unit-independent vector orthogonal to `v`
fn orthogonal(v: [f64; 3]) -> [f64; 3] {
    if v[2].abs() > 1e-9 {
        [1.0, 1.0, -(v[0] + v[1]) / v[2]]
    } else if v[1].abs() > 1e-9 {
        [1.0, -(v[0] + v[2]) / v[1], 1.0]
    } else {
        [-(v[1] + v[2]) / v[0], 1.0, 1.0]
    }
}

fn matmul(a: Matrix3, b: Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn quarter_turn_about_z() {
        let rotation = rotation_matrix([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]).unwrap();
        assert!(close(apply(rotation, [1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
        assert!(close(apply(rotation, [0.0, 0.0, 1.0]), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn parallel_vectors_are_identity() {
        let rotation = rotation_matrix([0.0, 2.0, 0.0], [0.0, 5.0, 0.0]).unwrap();
        assert!(close(apply(rotation, [1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]));
    }

    #[test]
    fn antiparallel_vectors_flip() {
        let rotation = rotation_matrix([0.0, 0.0, 1.0], [0.0, 0.0, -1.0]).unwrap();
        let flipped = apply(rotation, [0.0, 0.0, 1.0]);
        assert!((flipped[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vectors_are_rejected() {
        assert!(matches!(
            rotation_matrix([0.0; 3], [0.0, 1.0, 0.0]),
            Err(SchematicError::ZeroVector)
        ));
    }

    #[test]
    fn rotating_a_schematic_moves_its_points() {
        let mut schematic = Schematic::<f64>::new();
        schematic
            .create_location((0, 0), [0.0, 0.0, 0.0], 1.0, ["soma"], None)
            .unwrap();
        schematic
            .create_location((0, 1), [1.0, 0.0, 0.0], 1.0, ["soma"], None)
            .unwrap();
        rotate(&mut schematic, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]).unwrap();
        let moved = schematic.cables()[0].points[1].coords;
        assert!(close(moved, [0.0, 1.0, 0.0]));
    }
}
