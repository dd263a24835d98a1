//! Statically provisioned ABP session

use crate::config::session;

/// Keys and address identifying the node to the network
///
/// Fixed for the lifetime of the node: there is no join, rotation or re-join.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Network identifier
    pub session_id: u32,
    pub dev_addr: u32,
    pub nwk_skey: [u8; 16],
    pub app_skey: [u8; 16],
}

impl Session {
    /// The session baked into the firmware image
    pub const fn provisioned() -> Self {
        Self {
            session_id: session::SESSION_ID,
            dev_addr: session::DEV_ADDR,
            nwk_skey: session::NWK_SKEY,
            app_skey: session::APP_SKEY,
        }
    }
}

// Keys stay out of logs
impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("dev_addr", &format_args!("{:08X}", self.dev_addr))
            .finish_non_exhaustive()
    }
}
