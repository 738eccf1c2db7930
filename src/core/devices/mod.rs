//! Host audio devices.
//!
//! With the `device-audio` feature the default input and output devices are
//! driven through cpal. Without it, both report themselves unavailable, and
//! sessions can still run against injected sources such as
//! [`VirtualClock`](crate::core::playback::VirtualClock).

use std::sync::Arc;

use crate::core::playback::AudioOutputFactory;
use crate::core::session::MicrophoneSource;

mod capture;
mod mixer;

#[cfg(feature = "device-audio")]
mod cpal_backend;
#[cfg(feature = "device-audio")]
pub use cpal_backend::{DeviceMicrophone, DeviceOutputFactory};

#[cfg(not(feature = "device-audio"))]
mod stub;
#[cfg(not(feature = "device-audio"))]
pub use stub::{DeviceMicrophone, DeviceOutputFactory};

/// Whether this build can open host audio devices
pub fn is_supported() -> bool {
    cfg!(feature = "device-audio")
}

/// Default input device as a session microphone
pub fn default_microphone() -> Arc<dyn MicrophoneSource> {
    Arc::new(DeviceMicrophone::new())
}

/// Default output device as a playback output factory
pub fn default_output() -> Arc<dyn AudioOutputFactory> {
    Arc::new(DeviceOutputFactory::new())
}
