//! Desktop audio devices backed by cpal.
//!
//! cpal streams are not `Send`, so each device spawns a dedicated thread
//! that owns its stream; the thread exits (releasing the device) when the
//! handle on the async side is dropped or closed.

mod capture;
mod output;

pub use capture::DesktopCaptureDevice;
pub use output::DesktopOutputDevice;
