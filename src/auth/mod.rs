mod claims;
pub(crate) mod extractors;
pub mod jwt;
pub mod token;

pub use extractors::AuthUser;
