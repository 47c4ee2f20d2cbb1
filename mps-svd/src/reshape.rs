//! Reshape adapters between MPS block pairs and the decomposed matrix
//!
//! Before decomposition the four blocks `A0..A3` of a two-site tensor are
//! packed as
//!
//! ```text
//! A0 A1
//! A2 A3
//! ```
//!
//! Afterwards `U` is split row-wise and `Vᴴ` column-wise into block pairs.

use crate::CMatrix;
use crate::error::SvdError;
use crate::utils::linalg::{dagger, tabulate};

/// Concatenate along `axis` (0 stacks rows, 1 appends columns)
pub fn concatenate(a: &CMatrix, b: &CMatrix, axis: usize) -> Result<CMatrix, SvdError> {
    let (ma, na) = *a.shape();
    let (mb, nb) = *b.shape();
    match axis {
        0 => {
            if na != nb {
                return Err(SvdError::ShapeMismatch(format!(
                    "cannot stack {ma}x{na} on {mb}x{nb}: column counts differ"
                )));
            }
            Ok(tabulate([ma + mb, na], |idx| {
                let (i, j) = (idx[0], idx[1]);
                if i < ma { a[[i, j]] } else { b[[i - ma, j]] }
            }))
        }
        1 => {
            if ma != mb {
                return Err(SvdError::ShapeMismatch(format!(
                    "cannot join {ma}x{na} and {mb}x{nb}: row counts differ"
                )));
            }
            Ok(tabulate([ma, na + nb], |idx| {
                let (i, j) = (idx[0], idx[1]);
                if j < na { a[[i, j]] } else { b[[i, j - na]] }
            }))
        }
        _ => Err(SvdError::ShapeMismatch(format!("invalid axis {axis}"))),
    }
}

/// Split into two equal halves along `axis`
pub fn split(a: &CMatrix, axis: usize) -> Result<[CMatrix; 2], SvdError> {
    let (m, n) = *a.shape();
    match axis {
        0 => {
            if m % 2 != 0 {
                return Err(SvdError::ShapeMismatch(format!(
                    "cannot split {m} rows into halves"
                )));
            }
            let half = m / 2;
            Ok([
                tabulate([half, n], |idx| a[[idx[0], idx[1]]]),
                tabulate([half, n], |idx| a[[idx[0] + half, idx[1]]]),
            ])
        }
        1 => {
            if n % 2 != 0 {
                return Err(SvdError::ShapeMismatch(format!(
                    "cannot split {n} columns into halves"
                )));
            }
            let half = n / 2;
            Ok([
                tabulate([m, half], |idx| a[[idx[0], idx[1]]]),
                tabulate([m, half], |idx| a[[idx[0], idx[1] + half]]),
            ])
        }
        _ => Err(SvdError::ShapeMismatch(format!("invalid axis {axis}"))),
    }
}

/// Pack `[A0, A1, A2, A3]` into one matrix
pub fn reshape_before_svd(blocks: &[CMatrix; 4]) -> Result<CMatrix, SvdError> {
    let top = concatenate(&blocks[0], &blocks[1], 1)?;
    let bottom = concatenate(&blocks[2], &blocks[3], 1)?;
    concatenate(&top, &bottom, 0)
}

/// Split `U` row-wise into the left-site block pair
pub fn reshape_u_after_svd(u: &CMatrix) -> Result<[CMatrix; 2], SvdError> {
    split(u, 0)
}

/// Split `V` (held in the `Columns` convention) into the right-site block pair
pub fn reshape_v_after_svd(v: &CMatrix) -> Result<[CMatrix; 2], SvdError> {
    split(&dagger(v), 1)
}

/// Split an already conjugate-transposed `Vᴴ` into the right-site block pair
pub fn reshape_vh_after_svd(vh: &CMatrix) -> Result<[CMatrix; 2], SvdError> {
    split(vh, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn block(m: usize, n: usize, tag: f64) -> CMatrix {
        CMatrix::from_fn([m, n], |idx| Complex64::new(tag, (idx[0] * n + idx[1]) as f64))
    }

    #[test]
    fn test_pack_layout() {
        let blocks = [block(2, 3, 0.0), block(2, 3, 1.0), block(2, 3, 2.0), block(2, 3, 3.0)];
        let packed = reshape_before_svd(&blocks).unwrap();
        assert_eq!(*packed.shape(), (4, 6));
        assert_eq!(packed[[0, 0]].re, 0.0);
        assert_eq!(packed[[1, 4]].re, 1.0);
        assert_eq!(packed[[1, 4]].im, 4.0);
        assert_eq!(packed[[3, 0]].re, 2.0);
        assert_eq!(packed[[3, 5]].re, 3.0);
    }

    #[test]
    fn test_pack_rejects_ragged_blocks() {
        let blocks = [block(2, 3, 0.0), block(1, 3, 1.0), block(2, 3, 2.0), block(2, 3, 3.0)];
        assert!(matches!(reshape_before_svd(&blocks), Err(SvdError::ShapeMismatch(_))));
    }

    #[test]
    fn test_split_halves() {
        let a = block(4, 2, 0.0);
        let [top, bottom] = reshape_u_after_svd(&a).unwrap();
        assert_eq!(*top.shape(), (2, 2));
        assert_eq!(bottom[[0, 1]], a[[2, 1]]);
        assert!(split(&block(3, 2, 0.0), 0).is_err());
    }

    #[test]
    fn test_v_and_vh_splits_agree() {
        let v = block(6, 2, 0.5);
        let [l0, l1] = reshape_v_after_svd(&v).unwrap();
        let [r0, r1] = reshape_vh_after_svd(&dagger(&v)).unwrap();
        assert_eq!(*l0.shape(), (2, 3));
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(l0[[i, j]], r0[[i, j]]);
                assert_eq!(l1[[i, j]], r1[[i, j]]);
                assert_eq!(l1[[i, j]], v[[j + 3, i]].conj());
            }
        }
    }
}
