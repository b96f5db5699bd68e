//! Scanner: filters discovery results for the supervisor.
//!
//! The scanner holds no radio handle; it only decides what a discovery
//! means given the current target. Starting and stopping the radio scan is
//! the supervisor's job.

use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::id::DeviceId;

use crate::ports::DiscoveredPeripheral;

/// What the supervisor should do with a discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    /// The peripheral is the current target.
    Matched(DeviceRef),
    /// Discovery mode: a device not seen before in this window.
    Listed(DeviceRef),
    /// Not relevant (wrong target, duplicate, or nobody is scanning).
    Ignored,
}

/// Filter state for one scan.
#[derive(Debug, Default)]
pub struct Scanner {
    target: Option<DeviceId>,
    discovering: bool,
    nearby: Vec<DeviceRef>,
}

impl Scanner {
    /// Filter subsequent results for `target` only.
    pub fn target(&mut self, target: DeviceId) {
        self.discovering = false;
        self.target = Some(target);
    }

    /// Accept every device, deduplicated, for discovery mode.
    pub fn begin_discovery(&mut self) {
        self.target = None;
        self.discovering = true;
        self.nearby.clear();
    }

    /// Stop filtering; every subsequent result is ignored.
    pub fn stop(&mut self) {
        self.target = None;
        self.discovering = false;
    }

    /// Drop the list of nearby devices.
    pub fn clear_nearby(&mut self) {
        self.nearby.clear();
    }

    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    /// Devices listed during the current or last discovery window.
    #[must_use]
    pub fn nearby(&self) -> &[DeviceRef] {
        &self.nearby
    }

    /// Classify one discovery result.
    pub fn accept(&mut self, peripheral: DiscoveredPeripheral) -> ScanVerdict {
        if let Some(target) = &self.target {
            if *target == peripheral.id {
                return ScanVerdict::Matched(peripheral.into_device_ref());
            }
            return ScanVerdict::Ignored;
        }
        if !self.discovering {
            return ScanVerdict::Ignored;
        }
        if self.nearby.iter().any(|known| known.id == peripheral.id) {
            return ScanVerdict::Ignored;
        }
        let device = peripheral.into_device_ref();
        self.nearby.push(device.clone());
        ScanVerdict::Listed(device)
    }
}
