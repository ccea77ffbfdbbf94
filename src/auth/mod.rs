//! Bearer-token verification. Tokens are issued by the external identity
//! service; this crate only checks them and reads the professional id.

pub(crate) mod claims;
pub mod extractors;

pub use extractors::AuthProfessional;
