pub mod claims;
pub mod token;

pub use claims::Claims;
pub use token::{Jwt, JwtState, SignatureValidated, Unvalidated, Validated, SIGNING_ALGORITHM};
