//! Three-vector and 3x3 matrix helpers over plain arrays.
//!
//! Rotation matrices follow the X-Y-Z intrinsic Euler convention:
//! `matrix_from_euler(ex, ey, ez) = Rx(ex) * Ry(ey) * Rz(ez)`.

pub type Vec3 = [f64; 3];
pub type Mat3 = [[f64; 3]; 3];

pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}

pub fn scale(v: Vec3, s: f64) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

/// Angle between two vectors in radians. Zero-length input maps to 0.
pub fn angle_between(a: Vec3, b: Vec3) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let cosine = (dot(a, b) / (na * nb)).clamp(-1.0, 1.0);
    cosine.acos()
}

pub fn mat_vec(m: &Mat3, v: Vec3) -> Vec3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

pub fn mat_transpose(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

pub fn mat_det(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse by adjugate. Returns `None` when the determinant is numerically
/// singular.
pub fn mat_inverse(m: &Mat3) -> Option<Mat3> {
    let det = mat_det(m);
    if det.abs() < 1.0e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

pub fn rotation_x(angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

pub fn rotation_y(angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
}

pub fn rotation_z(angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

pub fn matrix_from_euler(ex: f64, ey: f64, ez: f64) -> Mat3 {
    mat_mul(&rotation_x(ex), &mat_mul(&rotation_y(ey), &rotation_z(ez)))
}

/// Recover `(ex, ey, ez)` such that `matrix_from_euler(ex, ey, ez)`
/// reproduces `m`. At the gimbal singularity (`|sin(ey)| == 1`) the `ez`
/// component is fixed to zero.
pub fn euler_from_matrix(m: &Mat3) -> (f64, f64, f64) {
    let sy = m[0][2].clamp(-1.0, 1.0);
    let ey = sy.asin();
    if sy.abs() > 1.0 - 1.0e-10 {
        if sy > 0.0 {
            (m[1][0].atan2(m[1][1]), ey, 0.0)
        } else {
            ((-m[1][0]).atan2(m[1][1]), ey, 0.0)
        }
    } else {
        (
            (-m[1][2]).atan2(m[2][2]),
            ey,
            (-m[0][1]).atan2(m[0][0]),
        )
    }
}

/// Maximum absolute deviation of `m * m^T` from the identity.
pub fn orthonormality_deviation(m: &Mat3) -> f64 {
    let product = mat_mul(m, &mat_transpose(m));
    let mut deviation = 0.0f64;
    for i in 0..3 {
        for j in 0..3 {
            deviation = deviation.max((product[i][j] - IDENTITY[i][j]).abs());
        }
    }
    deviation
}
