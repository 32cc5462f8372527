pub mod auth;
pub mod comment;
pub mod feed;
pub mod inquiry;
pub mod survey;

use chrono::Utc;

use crate::context::UserInfo;
use crate::device::{DeviceStore, ACTION_COOLDOWN_MS};
use crate::error::Error;
use crate::AdminEmail;

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn is_admin(user: &Option<UserInfo>, admin: &AdminEmail) -> bool {
    user.as_ref().map(|u| u.email == admin.0).unwrap_or(false)
}

/// Synthetic, locally raised before any store write. Administrators
/// bypass the class entirely.
pub(crate) fn enforce_cooldown(devices: &DeviceStore, device_id: &str, bypass: bool) -> Result<(), Error> {
    let now = now_ms();
    if !devices.check_rate_limit(device_id, now, ACTION_COOLDOWN_MS, bypass)? {
        let wait_ms = devices.rate_limit_wait_ms(device_id, now, ACTION_COOLDOWN_MS)?;
        return Err(Error::RateLimited { wait_ms });
    }
    Ok(())
}
