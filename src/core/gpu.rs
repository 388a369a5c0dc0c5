use nvml_wrapper::Nvml;
use tracing::{debug, warn};

/// Source of the GPU indices that become dispatcher slots.
pub trait GpuProbe {
    fn gpu_indices(&self) -> Vec<u32>;
}

/// Asks NVML how many devices this machine has.
#[derive(Debug, Default, Clone, Copy)]
pub struct NvmlProbe;

impl GpuProbe for NvmlProbe {
    fn gpu_indices(&self) -> Vec<u32> {
        let nvml = match Nvml::init() {
            Ok(nvml) => nvml,
            Err(e) => {
                warn!("Failed to initialize NVML, assuming no GPUs: {e}");
                return Vec::new();
            }
        };

        let device_count = nvml.device_count().unwrap_or(0);
        debug!("NVML reports {device_count} device(s)");
        (0..device_count).collect()
    }
}

/// Resolve the device list for the dispatcher.
///
/// An explicit list wins over probing. Duplicates are dropped so that no two
/// slots share a device; order is otherwise preserved.
pub fn resolve_devices(explicit: Option<&[u32]>, probe: &dyn GpuProbe) -> Vec<u32> {
    let mut devices = match explicit {
        Some(indices) => indices.to_vec(),
        None => probe.gpu_indices(),
    };

    let mut seen = std::collections::HashSet::new();
    devices.retain(|index| seen.insert(*index));
    devices
}
