//! Vendor SVD routines with a pluggable LAPACK provider
//!
//! This module provides the `zgesvd`/`zgesdd` calls of the vendor backend,
//! with support for runtime selection of the LAPACK implementation.
//!
//! # Design
//! - **Default**: Pure Rust faer SVD (no external dependencies)
//! - **Optional**: External LAPACK via function pointer injection
//! - **Thread-safe**: Global dispatcher protected by RwLock
//!
//! Both routines work on column-major buffers and return `Vᴴ`, so results of
//! this backend use [`VConvention::Adjoint`].
//!
//! # Example
//! ```ignore
//! use mps_svd::backend::lapack::set_lapack_backend;
//!
//! unsafe {
//!     set_lapack_backend(zgesvd_ as _, zgesdd_ as _);
//! }
//! ```

use crate::CMatrix;
use crate::config::DIVIDE_AND_CONQUER_MIN_DIM;
use crate::error::SvdError;
use crate::svd::{SvdResult, VConvention};
use crate::utils::linalg::{identity, tabulate};
use num_complex::Complex64;
use num_traits::Zero;
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

//==============================================================================
// LAPACK Function Pointer Types
//==============================================================================

/// LAPACK zgesvd function pointer type (LP64: 32-bit integers)
///
/// Fortran signature:
/// ```fortran
/// SUBROUTINE ZGESVD( JOBU, JOBVT, M, N, A, LDA, S, U, LDU, VT, LDVT,
///                    WORK, LWORK, RWORK, INFO )
/// ```
pub type ZgesvdFnPtr = unsafe extern "C" fn(
    jobu: *const libc::c_char,
    jobvt: *const libc::c_char,
    m: *const libc::c_int,
    n: *const libc::c_int,
    a: *mut Complex64,
    lda: *const libc::c_int,
    s: *mut libc::c_double,
    u: *mut Complex64,
    ldu: *const libc::c_int,
    vt: *mut Complex64,
    ldvt: *const libc::c_int,
    work: *mut Complex64,
    lwork: *const libc::c_int,
    rwork: *mut libc::c_double,
    info: *mut libc::c_int,
);

/// LAPACK zgesdd function pointer type (LP64: 32-bit integers)
///
/// Fortran signature:
/// ```fortran
/// SUBROUTINE ZGESDD( JOBZ, M, N, A, LDA, S, U, LDU, VT, LDVT,
///                    WORK, LWORK, RWORK, IWORK, INFO )
/// ```
pub type ZgesddFnPtr = unsafe extern "C" fn(
    jobz: *const libc::c_char,
    m: *const libc::c_int,
    n: *const libc::c_int,
    a: *mut Complex64,
    lda: *const libc::c_int,
    s: *mut libc::c_double,
    u: *mut Complex64,
    ldu: *const libc::c_int,
    vt: *mut Complex64,
    ldvt: *const libc::c_int,
    work: *mut Complex64,
    lwork: *const libc::c_int,
    rwork: *mut libc::c_double,
    iwork: *mut libc::c_int,
    info: *mut libc::c_int,
);

//==============================================================================
// LapackBackend Trait
//==============================================================================

/// Full complex SVD `A = U · diag(S) · Vᴴ` on column-major buffers
///
/// `a` is `m × n` and may be overwritten, `u` is `m × m`, `vt` is `n × n`,
/// `s` has `min(m, n)` entries. Returns the LAPACK `info` code.
pub trait LapackBackend: Send + Sync {
    /// Standard driver (`zgesvd`)
    fn zgesvd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32;

    /// Divide-and-conquer driver (`zgesdd`)
    fn zgesdd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32;

    /// Returns backend name for debugging
    fn name(&self) -> &'static str;
}

//==============================================================================
// Faer Backend (Default, Pure Rust)
//==============================================================================

/// Default faer provider (Pure Rust, no external dependencies)
struct FaerLapack;

impl FaerLapack {
    fn svd(
        m: usize,
        n: usize,
        a: &[Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32 {
        let mat = faer::Mat::<faer::c64>::from_fn(m, n, |i, j| a[i + j * m]);
        let svd = match mat.svd() {
            Ok(svd) => svd,
            // LAPACK reports non-convergence with a positive info
            Err(_) => return 1,
        };

        let (u_faer, v_faer) = (svd.U(), svd.V());
        let s_faer = svd.S().column_vector();
        for (i, value) in s.iter_mut().enumerate().take(m.min(n)) {
            *value = s_faer[i].re;
        }
        for j in 0..m {
            for i in 0..m {
                u[i + j * m] = u_faer[(i, j)];
            }
        }
        for j in 0..n {
            for i in 0..n {
                vt[i + j * n] = v_faer[(j, i)].conj();
            }
        }
        0
    }
}

impl LapackBackend for FaerLapack {
    fn zgesvd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32 {
        Self::svd(m, n, a, s, u, vt)
    }

    fn zgesdd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32 {
        Self::svd(m, n, a, s, u, vt)
    }

    fn name(&self) -> &'static str {
        "Faer (Pure Rust)"
    }
}

//==============================================================================
// External LAPACK Backend (LP64)
//==============================================================================

/// External LAPACK provider (LP64: 32-bit integers)
struct ExternalLapack {
    zgesvd: ZgesvdFnPtr,
    zgesdd: ZgesddFnPtr,
}

impl LapackBackend for ExternalLapack {
    fn zgesvd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32 {
        let min_dim = m.min(n);
        let lwork = (2 * min_dim + m.max(n)).max(1);
        let mut work = vec![Complex64::zero(); lwork];
        let mut rwork = vec![0.0f64; (5 * min_dim).max(1)];

        let (m_i, n_i, lwork_i) = (m as libc::c_int, n as libc::c_int, lwork as libc::c_int);
        let (ldu, ldvt) = (m_i.max(1), n_i.max(1));
        let mut info: libc::c_int = 0;

        unsafe {
            (self.zgesvd)(
                c"A".as_ptr(),
                c"A".as_ptr(),
                &m_i,
                &n_i,
                a.as_mut_ptr(),
                &ldu, // lda
                s.as_mut_ptr(),
                u.as_mut_ptr(),
                &ldu,
                vt.as_mut_ptr(),
                &ldvt,
                work.as_mut_ptr(),
                &lwork_i,
                rwork.as_mut_ptr(),
                &mut info,
            );
        }
        info
    }

    fn zgesdd(
        &self,
        m: usize,
        n: usize,
        a: &mut [Complex64],
        s: &mut [f64],
        u: &mut [Complex64],
        vt: &mut [Complex64],
    ) -> i32 {
        let mn = m.min(n);
        let mx = m.max(n);
        let rwork_size = (5 * mn * mn + 5 * mn).max(2 * mx * mn + 2 * mn * mn + mn);
        let mut rwork = vec![0.0f64; rwork_size.max(1)];
        let mut iwork = vec![0 as libc::c_int; (8 * mn).max(1)];

        let (m_i, n_i) = (m as libc::c_int, n as libc::c_int);
        let (ldu, ldvt) = (m_i.max(1), n_i.max(1));
        let mut info: libc::c_int = 0;

        // Workspace query
        let mut query = [Complex64::zero()];
        let lwork_query: libc::c_int = -1;
        unsafe {
            (self.zgesdd)(
                c"A".as_ptr(),
                &m_i,
                &n_i,
                a.as_mut_ptr(),
                &ldu,
                s.as_mut_ptr(),
                u.as_mut_ptr(),
                &ldu,
                vt.as_mut_ptr(),
                &ldvt,
                query.as_mut_ptr(),
                &lwork_query,
                rwork.as_mut_ptr(),
                iwork.as_mut_ptr(),
                &mut info,
            );
        }
        if info != 0 {
            return info;
        }

        let lwork = (query[0].re as usize).max(1);
        let lwork_i = lwork as libc::c_int;
        let mut work = vec![Complex64::zero(); lwork];
        unsafe {
            (self.zgesdd)(
                c"A".as_ptr(),
                &m_i,
                &n_i,
                a.as_mut_ptr(),
                &ldu,
                s.as_mut_ptr(),
                u.as_mut_ptr(),
                &ldu,
                vt.as_mut_ptr(),
                &ldvt,
                work.as_mut_ptr(),
                &lwork_i,
                rwork.as_mut_ptr(),
                iwork.as_mut_ptr(),
                &mut info,
            );
        }
        info
    }

    fn name(&self) -> &'static str {
        "External LAPACK (LP64)"
    }
}

//==============================================================================
// Global Dispatcher
//==============================================================================

/// Global LAPACK dispatcher (thread-safe)
static LAPACK_DISPATCHER: Lazy<RwLock<Box<dyn LapackBackend>>> =
    Lazy::new(|| RwLock::new(Box::new(FaerLapack)));

/// Set LAPACK backend (LP64: 32-bit integers)
///
/// # Safety
/// - Function pointers must be valid and thread-safe
/// - Must remain valid for the lifetime of the program
/// - Must follow the Fortran LAPACK calling convention (all arguments by
///   reference, column-major storage)
pub unsafe fn set_lapack_backend(zgesvd: ZgesvdFnPtr, zgesdd: ZgesddFnPtr) {
    let backend = ExternalLapack { zgesvd, zgesdd };
    let mut dispatcher = LAPACK_DISPATCHER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *dispatcher = Box::new(backend);
}

/// Clear LAPACK backend (reset to default faer)
pub fn clear_lapack_backend() {
    let mut dispatcher = LAPACK_DISPATCHER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *dispatcher = Box::new(FaerLapack);
}

/// Get current LAPACK backend information
///
/// Returns:
/// - `(backend_name, is_external)`
pub fn get_lapack_backend_info() -> (&'static str, bool) {
    let dispatcher = LAPACK_DISPATCHER
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    let name = dispatcher.name();
    (name, !name.contains("Faer"))
}

//==============================================================================
// Public API
//==============================================================================

/// Divide-and-conquer pays off once both dimensions reach the threshold
pub fn use_divide_and_conquer(m: usize, n: usize) -> bool {
    m >= DIVIDE_AND_CONQUER_MIN_DIM && n >= DIVIDE_AND_CONQUER_MIN_DIM
}

/// Full SVD through the registered LAPACK provider
///
/// The result holds `Vᴴ` ([`VConvention::Adjoint`]). A non-zero `info` from
/// the provider is reported as [`SvdError::VendorFailure`].
pub fn lapack_svd(a: CMatrix) -> Result<SvdResult, SvdError> {
    let (m, n) = *a.shape();
    if m.min(n) == 0 {
        return Ok(SvdResult::new(
            identity(m),
            Vec::new(),
            identity(n),
            VConvention::Adjoint,
        ));
    }
    if m > i32::MAX as usize || n > i32::MAX as usize {
        return Err(SvdError::ShapeMismatch(format!(
            "{m}x{n} is too large for LP64 LAPACK"
        )));
    }

    // Column-major copies for the Fortran interface
    let mut buffer: Vec<Complex64> = (0..m * n).map(|k| a[[k % m, k / m]]).collect();
    let mut s = vec![0.0; m.min(n)];
    let mut u = vec![Complex64::zero(); m * m];
    let mut vt = vec![Complex64::zero(); n * n];

    let dispatcher = LAPACK_DISPATCHER
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    let (routine, info) = if use_divide_and_conquer(m, n) {
        ("zgesdd", dispatcher.zgesdd(m, n, &mut buffer, &mut s, &mut u, &mut vt))
    } else {
        ("zgesvd", dispatcher.zgesvd(m, n, &mut buffer, &mut s, &mut u, &mut vt))
    };
    log::debug!("{routine} via {} on a {m}x{n} matrix: info = {info}", dispatcher.name());

    if info != 0 {
        return Err(SvdError::VendorFailure { routine, info });
    }

    let u = tabulate([m, m], |idx| u[idx[0] + idx[1] * m]);
    let vh = tabulate([n, n], |idx| vt[idx[0] + idx[1] * n]);
    Ok(SvdResult::new(u, s, vh, VConvention::Adjoint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_choice() {
        assert!(!use_divide_and_conquer(63, 200));
        assert!(!use_divide_and_conquer(200, 63));
        assert!(use_divide_and_conquer(64, 64));
    }

    #[test]
    fn test_faer_provider_diagonal() {
        // diag(1, 3) in column-major order
        let mut a = vec![
            Complex64::new(1.0, 0.0),
            Complex64::zero(),
            Complex64::zero(),
            Complex64::new(0.0, 3.0),
        ];
        let mut s = vec![0.0; 2];
        let mut u = vec![Complex64::zero(); 4];
        let mut vt = vec![Complex64::zero(); 4];
        let info = FaerLapack.zgesvd(2, 2, &mut a, &mut s, &mut u, &mut vt);
        assert_eq!(info, 0);
        assert!((s[0] - 3.0).abs() < 1e-14);
        assert!((s[1] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_lapack_svd_empty() {
        let a = CMatrix::from_elem([0, 3], Complex64::zero());
        let result = lapack_svd(a).unwrap();
        assert!(result.s.is_empty());
        assert_eq!(*result.v.shape(), (3, 3));
        assert_eq!(result.convention, VConvention::Adjoint);
    }
}
