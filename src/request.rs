//! Authorization-request and end-session-request builders.

pub mod signin;
pub mod signout;

pub use signin::*;
pub use signout::*;
