//! Device registry: counts attached gaze devices.

use crate::source::types::{DeviceEvent, GazeDevice};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Capability to attach gaze-sample delivery once a device is present.
pub trait SampleHookup {
    fn attach_gaze_source(&mut self);
}

/// Counts devices and renders lifecycle transitions as log messages.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    device_count: i64,
    hooked: AtomicBool,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_count(&self) -> i64 {
        self.device_count
    }

    pub fn is_hooked(&self) -> bool {
        self.hooked.load(Ordering::SeqCst)
    }

    /// Apply a device event and return the message to log.
    ///
    /// The first `Added` event triggers `hookup` exactly once.
    pub fn apply(&mut self, event: &DeviceEvent, hookup: &mut dyn SampleHookup) -> String {
        match event {
            DeviceEvent::Added { device } => {
                self.device_count += 1;
                let message =
                    describe(&format!("Device added, count={}", self.device_count), device);

                if self
                    .hooked
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    info!(device_id = device.id, "Attaching gaze source");
                    hookup.attach_gaze_source();
                }
                message
            }
            DeviceEvent::Removed { device } => {
                self.device_count -= 1;
                describe(&format!("Device removed, count={}", self.device_count), device)
            }
            DeviceEvent::Updated { device } => describe("Device updated", device),
            DeviceEvent::EnumerationCompleted => {
                format!("Device enumeration complete, count={}", self.device_count)
            }
        }
    }
}

fn describe(message: &str, device: &GazeDevice) -> String {
    format!(
        "{message}\tId={}, State={}, Eyes={}, Head={}",
        device.id, device.configuration_state, device.can_track_eyes, device.can_track_head
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::ConfigurationState;

    #[derive(Default)]
    struct CountingHookup {
        attached: u32,
    }

    impl SampleHookup for CountingHookup {
        fn attach_gaze_source(&mut self) {
            self.attached += 1;
        }
    }

    fn device(id: u32) -> GazeDevice {
        GazeDevice::new(id, ConfigurationState::Ready)
    }

    #[test]
    fn test_device_count_tracks_lifecycle() {
        let mut registry = DeviceRegistry::new();
        let mut hookup = CountingHookup::default();

        registry.apply(&DeviceEvent::Added { device: device(1) }, &mut hookup);
        registry.apply(&DeviceEvent::Added { device: device(2) }, &mut hookup);
        registry.apply(&DeviceEvent::Updated { device: device(2) }, &mut hookup);
        let removed = registry.apply(&DeviceEvent::Removed { device: device(1) }, &mut hookup);

        assert_eq!(registry.device_count(), 1);
        assert_eq!(
            removed,
            "Device removed, count=1\tId=1, State=Ready, Eyes=true, Head=false"
        );
        assert_eq!(
            registry.apply(&DeviceEvent::EnumerationCompleted, &mut hookup),
            "Device enumeration complete, count=1"
        );
    }

    #[test]
    fn test_hookup_happens_once() {
        let mut registry = DeviceRegistry::new();
        let mut hookup = CountingHookup::default();

        registry.apply(&DeviceEvent::Updated { device: device(1) }, &mut hookup);
        assert!(!registry.is_hooked());

        registry.apply(&DeviceEvent::Added { device: device(1) }, &mut hookup);
        registry.apply(&DeviceEvent::Removed { device: device(1) }, &mut hookup);
        registry.apply(&DeviceEvent::Added { device: device(1) }, &mut hookup);

        assert!(registry.is_hooked());
        assert_eq!(hookup.attached, 1);
    }

    #[test]
    fn test_updated_line_keeps_count_out() {
        let mut registry = DeviceRegistry::new();
        let mut hookup = CountingHookup::default();
        let mut updated = device(4);
        updated.configuration_state = ConfigurationState::UserCalibrationNeeded;
        updated.can_track_head = true;

        let line = registry.apply(&DeviceEvent::Updated { device: updated }, &mut hookup);
        assert_eq!(
            line,
            "Device updated\tId=4, State=UserCalibrationNeeded, Eyes=true, Head=true"
        );
        assert_eq!(registry.device_count(), 0);
    }
}
