//! Device registry operations.

use color_eyre::eyre::WrapErr as _;
use gcm_core::Device;
use gcm_storage::DeviceStore;

/// Deactivate a device and persist it.
///
/// `error_message` is the gateway error that caused the deactivation; when
/// given it is logged with the device.
pub fn mark_inactive<S>(
    store: &S,
    device: &mut Device,
    error_message: Option<&str>,
) -> color_eyre::eyre::Result<()>
where
    S: DeviceStore + ?Sized,
{
    device.deactivate();

    store
        .save_device(device)
        .wrap_err_with(|| format!("failed to deactivate device {}", device.device_id))?;

    if let Some(error) = error_message {
        tracing::info!(
            device_id = %device.device_id,
            name = ?device.display_name,
            error = %error,
            "device marked inactive"
        );
    }

    Ok(())
}
