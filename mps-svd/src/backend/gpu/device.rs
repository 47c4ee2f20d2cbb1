//! cuTensorNet device backend
//!
//! The input matrix is treated as a two-mode tensor `(i, j)` and split into
//! `U(i, m)`, `S(m)` and `V(m, j)`. cuTensorNet's `V` is `Vᴴ` in matrix
//! terms; results are converted to [`VConvention::Columns`] before they are
//! returned.

use super::{SvdCutoff, TruncationInfo};
use crate::CMatrix;
use crate::backend::SvdBackend;
use crate::config::SvdPolicy;
use crate::error::SvdError;
use crate::svd::{SvdResult, VConvention};
use crate::utils::linalg::{dagger, identity, tabulate};
use num_complex::Complex64;
use num_traits::Zero;
use std::ffi::c_void;
use std::ptr;
use std::sync::{Mutex, PoisonError};

//==============================================================================
// FFI
//==============================================================================

type Handle = *mut c_void;
type TensorDescriptor = *mut c_void;
type SvdConfig = *mut c_void;
type SvdInfo = *mut c_void;
type WorkspaceDescriptor = *mut c_void;
type Stream = *mut c_void;
type Status = libc::c_int;

const SUCCESS: Status = 0;
const CUDA_C_64F: libc::c_int = 5;

const CONFIG_ABS_CUTOFF: libc::c_int = 0;
const CONFIG_REL_CUTOFF: libc::c_int = 1;

const INFO_FULL_EXTENT: libc::c_int = 0;
const INFO_REDUCED_EXTENT: libc::c_int = 1;
const INFO_DISCARDED_WEIGHT: libc::c_int = 2;

const MEMSPACE_DEVICE: libc::c_int = 0;
const MEMSPACE_HOST: libc::c_int = 1;
const WORKSPACE_SCRATCH: libc::c_int = 0;
const WORKSIZE_PREF_RECOMMENDED: libc::c_int = 1;

const MEMCPY_HOST_TO_DEVICE: libc::c_int = 1;
const MEMCPY_DEVICE_TO_HOST: libc::c_int = 2;

#[link(name = "cutensornet")]
unsafe extern "C" {
    fn cutensornetCreate(handle: *mut Handle) -> Status;
    fn cutensornetDestroy(handle: Handle) -> Status;
    fn cutensornetCreateTensorDescriptor(
        handle: Handle,
        num_modes: i32,
        extents: *const i64,
        strides: *const i64,
        modes: *const i32,
        data_type: libc::c_int,
        desc: *mut TensorDescriptor,
    ) -> Status;
    fn cutensornetDestroyTensorDescriptor(desc: TensorDescriptor) -> Status;
    fn cutensornetCreateTensorSVDConfig(handle: Handle, config: *mut SvdConfig) -> Status;
    fn cutensornetTensorSVDConfigSetAttribute(
        handle: Handle,
        config: SvdConfig,
        attr: libc::c_int,
        buf: *const c_void,
        size: usize,
    ) -> Status;
    fn cutensornetDestroyTensorSVDConfig(config: SvdConfig) -> Status;
    fn cutensornetCreateTensorSVDInfo(handle: Handle, info: *mut SvdInfo) -> Status;
    fn cutensornetTensorSVDInfoGetAttribute(
        handle: Handle,
        info: SvdInfo,
        attr: libc::c_int,
        buf: *mut c_void,
        size: usize,
    ) -> Status;
    fn cutensornetDestroyTensorSVDInfo(info: SvdInfo) -> Status;
    fn cutensornetCreateWorkspaceDescriptor(handle: Handle, desc: *mut WorkspaceDescriptor) -> Status;
    fn cutensornetWorkspaceComputeSVDSizes(
        handle: Handle,
        desc_in: TensorDescriptor,
        desc_u: TensorDescriptor,
        desc_v: TensorDescriptor,
        config: SvdConfig,
        work: WorkspaceDescriptor,
    ) -> Status;
    fn cutensornetWorkspaceGetMemorySize(
        handle: Handle,
        work: WorkspaceDescriptor,
        pref: libc::c_int,
        mem_space: libc::c_int,
        kind: libc::c_int,
        size: *mut i64,
    ) -> Status;
    fn cutensornetWorkspaceSetMemory(
        handle: Handle,
        work: WorkspaceDescriptor,
        mem_space: libc::c_int,
        kind: libc::c_int,
        ptr: *mut c_void,
        size: i64,
    ) -> Status;
    fn cutensornetDestroyWorkspaceDescriptor(desc: WorkspaceDescriptor) -> Status;
    fn cutensornetTensorSVD(
        handle: Handle,
        desc_in: TensorDescriptor,
        raw_in: *const c_void,
        desc_u: TensorDescriptor,
        u: *mut c_void,
        s: *mut c_void,
        desc_v: TensorDescriptor,
        v: *mut c_void,
        config: SvdConfig,
        info: SvdInfo,
        work: WorkspaceDescriptor,
        stream: Stream,
    ) -> Status;
}

#[link(name = "cudart")]
unsafe extern "C" {
    fn cudaMalloc(ptr: *mut *mut c_void, size: usize) -> libc::c_int;
    fn cudaFree(ptr: *mut c_void) -> libc::c_int;
    fn cudaMemcpy(dst: *mut c_void, src: *const c_void, count: usize, kind: libc::c_int) -> libc::c_int;
    fn cudaStreamCreate(stream: *mut Stream) -> libc::c_int;
    fn cudaStreamSynchronize(stream: Stream) -> libc::c_int;
    fn cudaStreamDestroy(stream: Stream) -> libc::c_int;
}

fn check(status: libc::c_int, call: &str) -> Result<(), SvdError> {
    if status == SUCCESS {
        Ok(())
    } else {
        Err(SvdError::Gpu(format!("{call} returned status {status}")))
    }
}

/// Recommended scratch size in bytes for `mem_space`
fn scratch_size(handle: Handle, work: WorkspaceDescriptor, mem_space: libc::c_int) -> Result<usize, SvdError> {
    let mut size: i64 = 0;
    check(
        unsafe {
            cutensornetWorkspaceGetMemorySize(
                handle,
                work,
                WORKSIZE_PREF_RECOMMENDED,
                mem_space,
                WORKSPACE_SCRATCH,
                &mut size,
            )
        },
        "cutensornetWorkspaceGetMemorySize",
    )?;
    Ok(size.max(0) as usize)
}

/// Hand `size` bytes at `ptr` to the workspace; a zero size attaches nothing
fn attach_scratch(
    handle: Handle,
    work: WorkspaceDescriptor,
    mem_space: libc::c_int,
    ptr: *mut c_void,
    size: usize,
) -> Result<(), SvdError> {
    if size == 0 {
        return Ok(());
    }
    check(
        unsafe { cutensornetWorkspaceSetMemory(handle, work, mem_space, WORKSPACE_SCRATCH, ptr, size as i64) },
        "cutensornetWorkspaceSetMemory",
    )
}

//==============================================================================
// RAII wrappers
//==============================================================================

/// Destroy-on-drop wrapper for an opaque library object
struct Owned<T: Copy> {
    raw: T,
    destroy: unsafe extern "C" fn(T) -> Status,
}

impl<T: Copy> Drop for Owned<T> {
    fn drop(&mut self) {
        let status = unsafe { (self.destroy)(self.raw) };
        if status != SUCCESS {
            log::warn!("cuTensorNet destroy returned status {status}");
        }
    }
}

struct DeviceBuffer {
    ptr: *mut c_void,
    bytes: usize,
}

impl DeviceBuffer {
    fn new(bytes: usize) -> Result<Self, SvdError> {
        let mut ptr = ptr::null_mut();
        if bytes > 0 {
            check(unsafe { cudaMalloc(&mut ptr, bytes) }, "cudaMalloc")?;
        }
        Ok(Self { ptr, bytes })
    }

    fn upload<T>(data: &[T]) -> Result<Self, SvdError> {
        let buffer = Self::new(std::mem::size_of_val(data))?;
        if buffer.bytes > 0 {
            check(
                unsafe {
                    cudaMemcpy(buffer.ptr, data.as_ptr().cast(), buffer.bytes, MEMCPY_HOST_TO_DEVICE)
                },
                "cudaMemcpy (host to device)",
            )?;
        }
        Ok(buffer)
    }

    fn download<T>(&self, out: &mut [T]) -> Result<(), SvdError> {
        let bytes = std::mem::size_of_val(out).min(self.bytes);
        if bytes == 0 {
            return Ok(());
        }
        check(
            unsafe { cudaMemcpy(out.as_mut_ptr().cast(), self.ptr, bytes, MEMCPY_DEVICE_TO_HOST) },
            "cudaMemcpy (device to host)",
        )
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                cudaFree(self.ptr);
            }
        }
    }
}

struct LibraryHandle(Handle);

// The handle is only used while the backend's mutex is held
unsafe impl Send for LibraryHandle {}

impl Drop for LibraryHandle {
    fn drop(&mut self) {
        unsafe {
            cutensornetDestroy(self.0);
        }
    }
}

//==============================================================================
// Backend
//==============================================================================

/// cuTensorNet tensor SVD with fused value cutoffs
pub struct GpuBackend {
    handle: Mutex<LibraryHandle>,
}

impl GpuBackend {
    pub fn new() -> Result<Self, SvdError> {
        let mut handle = ptr::null_mut();
        check(unsafe { cutensornetCreate(&mut handle) }, "cutensornetCreate")?;
        log::debug!("cuTensorNet handle created");
        Ok(Self {
            handle: Mutex::new(LibraryHandle(handle)),
        })
    }

    fn tensor_descriptor(
        handle: Handle,
        extents: [i64; 2],
        modes: [i32; 2],
    ) -> Result<Owned<TensorDescriptor>, SvdError> {
        let mut desc = ptr::null_mut();
        check(
            unsafe {
                cutensornetCreateTensorDescriptor(
                    handle,
                    2,
                    extents.as_ptr(),
                    ptr::null(), // column-major
                    modes.as_ptr(),
                    CUDA_C_64F,
                    &mut desc,
                )
            },
            "cutensornetCreateTensorDescriptor",
        )?;
        Ok(Owned {
            raw: desc,
            destroy: cutensornetDestroyTensorDescriptor,
        })
    }

    fn run(&self, a: &CMatrix, cutoff: &SvdCutoff) -> Result<SvdResult, SvdError> {
        let (m, n) = *a.shape();
        let k = m.min(n);
        let guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = guard.0;

        let (mode_i, mode_j, mode_m) = (b'i' as i32, b'j' as i32, b'm' as i32);
        let desc_in = Self::tensor_descriptor(handle, [m as i64, n as i64], [mode_i, mode_j])?;
        let desc_u = Self::tensor_descriptor(handle, [m as i64, k as i64], [mode_i, mode_m])?;
        let desc_v = Self::tensor_descriptor(handle, [k as i64, n as i64], [mode_m, mode_j])?;

        let mut config = ptr::null_mut();
        check(
            unsafe { cutensornetCreateTensorSVDConfig(handle, &mut config) },
            "cutensornetCreateTensorSVDConfig",
        )?;
        let config = Owned {
            raw: config,
            destroy: cutensornetDestroyTensorSVDConfig,
        };
        for (attr, value) in [(CONFIG_ABS_CUTOFF, cutoff.abs), (CONFIG_REL_CUTOFF, cutoff.rel)] {
            check(
                unsafe {
                    cutensornetTensorSVDConfigSetAttribute(
                        handle,
                        config.raw,
                        attr,
                        (&value as *const f64).cast(),
                        std::mem::size_of::<f64>(),
                    )
                },
                "cutensornetTensorSVDConfigSetAttribute",
            )?;
        }

        let mut info = ptr::null_mut();
        check(
            unsafe { cutensornetCreateTensorSVDInfo(handle, &mut info) },
            "cutensornetCreateTensorSVDInfo",
        )?;
        let info = Owned {
            raw: info,
            destroy: cutensornetDestroyTensorSVDInfo,
        };

        let mut work = ptr::null_mut();
        check(
            unsafe { cutensornetCreateWorkspaceDescriptor(handle, &mut work) },
            "cutensornetCreateWorkspaceDescriptor",
        )?;
        let work = Owned {
            raw: work,
            destroy: cutensornetDestroyWorkspaceDescriptor,
        };
        check(
            unsafe {
                cutensornetWorkspaceComputeSVDSizes(
                    handle,
                    desc_in.raw,
                    desc_u.raw,
                    desc_v.raw,
                    config.raw,
                    work.raw,
                )
            },
            "cutensornetWorkspaceComputeSVDSizes",
        )?;
        // The SVD may ask for host scratch as well as device scratch
        let device_size = scratch_size(handle, work.raw, MEMSPACE_DEVICE)?;
        let device_scratch = DeviceBuffer::new(device_size)?;
        attach_scratch(handle, work.raw, MEMSPACE_DEVICE, device_scratch.ptr, device_size)?;
        let host_size = scratch_size(handle, work.raw, MEMSPACE_HOST)?;
        let mut host_scratch = vec![0u8; host_size];
        attach_scratch(handle, work.raw, MEMSPACE_HOST, host_scratch.as_mut_ptr().cast(), host_size)?;

        let host_in: Vec<Complex64> = (0..m * n).map(|idx| a[[idx % m, idx / m]]).collect();
        let d_in = DeviceBuffer::upload(&host_in)?;
        let d_u = DeviceBuffer::new(m * k * std::mem::size_of::<Complex64>())?;
        let d_s = DeviceBuffer::new(k * std::mem::size_of::<f64>())?;
        let d_v = DeviceBuffer::new(k * n * std::mem::size_of::<Complex64>())?;

        let mut stream = ptr::null_mut();
        check(unsafe { cudaStreamCreate(&mut stream) }, "cudaStreamCreate")?;
        let stream = Owned {
            raw: stream,
            destroy: cudaStreamDestroy,
        };
        check(
            unsafe {
                cutensornetTensorSVD(
                    handle,
                    desc_in.raw,
                    d_in.ptr,
                    desc_u.raw,
                    d_u.ptr,
                    d_s.ptr,
                    desc_v.raw,
                    d_v.ptr,
                    config.raw,
                    info.raw,
                    work.raw,
                    stream.raw,
                )
            },
            "cutensornetTensorSVD",
        )?;
        check(unsafe { cudaStreamSynchronize(stream.raw) }, "cudaStreamSynchronize")?;

        let mut full_extent: i64 = k as i64;
        let mut reduced_extent: i64 = k as i64;
        let mut discarded_weight: f64 = 0.0;
        for (attr, buf, size) in [
            (INFO_FULL_EXTENT, (&mut full_extent as *mut i64).cast::<c_void>(), 8),
            (INFO_REDUCED_EXTENT, (&mut reduced_extent as *mut i64).cast(), 8),
            (INFO_DISCARDED_WEIGHT, (&mut discarded_weight as *mut f64).cast(), 8),
        ] {
            check(
                unsafe { cutensornetTensorSVDInfoGetAttribute(handle, info.raw, attr, buf, size) },
                "cutensornetTensorSVDInfoGetAttribute",
            )?;
        }
        let kept = (reduced_extent.max(0) as usize).min(k);

        let mut host_u = vec![Complex64::zero(); m * kept];
        let mut host_s = vec![0.0f64; kept];
        let mut host_v = vec![Complex64::zero(); kept * n];
        d_u.download(&mut host_u)?;
        d_s.download(&mut host_s)?;
        d_v.download(&mut host_v)?;

        // The output descriptors shrink to the reduced extent
        let u = tabulate([m, kept], |idx| host_u[idx[0] + idx[1] * m]);
        let vh = tabulate([kept, n], |idx| host_v[idx[0] + idx[1] * kept]);

        let mut result = SvdResult::new(u, host_s, dagger(&vh), VConvention::Columns);
        result.truncation = Some(TruncationInfo {
            full_extent: full_extent.max(0) as usize,
            reduced_extent: kept,
            discarded_weight,
        });
        Ok(result)
    }
}

impl SvdBackend for GpuBackend {
    fn decompose(&self, a: CMatrix, policy: &SvdPolicy) -> Result<SvdResult, SvdError> {
        let (m, n) = *a.shape();
        if m.min(n) == 0 {
            return Ok(SvdResult::new(identity(m), Vec::new(), identity(n), VConvention::Columns));
        }
        let result = self.run(&a, &SvdCutoff::from_policy(policy))?;
        if let Some(info) = result.truncation {
            log::debug!(
                "cuTensorNet SVD of {m}x{n}: kept {} of {} (discarded weight {:e})",
                info.reduced_extent,
                info.full_extent,
                info.discarded_weight
            );
        }
        Ok(result)
    }

    fn convention(&self) -> VConvention {
        VConvention::Columns
    }

    fn name(&self) -> &'static str {
        "cuTensorNet"
    }
}
