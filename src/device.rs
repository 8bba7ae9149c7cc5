use std::time::Instant;

/// The device model computations run on.
///
/// Accelerators may execute work asynchronously from the host, `synchronize` must return only
/// once every queued kernel has completed so that elapsed times reflect real compute.
pub trait ComputeDevice: Send {
    fn synchronize(&self);
}

/// Host execution, everything is already synchronous.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDevice;

impl ComputeDevice for HostDevice {
    #[inline]
    fn synchronize(&self) {}
}

/// Source of monotonic timestamps for throughput accounting.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
