//! Desktop pairing: a signed-in browser mints a one-time code, the desktop
//! app redeems it for a session.
//!
//! States per code: issued, then redeemed or left to expire. A code is
//! redeemable only while unused and inside its window. The store consumes the
//! code and opens the session in one unit, and its conditional update is the
//! only thing that decides a redemption race.

pub mod codes;
pub mod service;


pub use codes::{AuthCodes, IssuedCode};
pub use service::{PairingService, TokenGrant};
