//! Impulse response management
//!
//! Loading, listing and combining the `*.irs` kernels used by the convolver.

mod combine;
mod kernel;

pub use combine::{combine_kernels, validate_output_name, KernelCombiner, MAX_NAME_LEN};
pub use kernel::{kernel_path, list_kernels, ImpulseResponse};
