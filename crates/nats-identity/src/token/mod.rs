//! Token construction and the credentials bundle.

pub mod creds;
pub mod jwt;

pub use creds::{format_user_creds, parse_user_creds};
pub use jwt::{build, decode, SignedToken, ALGORITHM, TOKEN_TYPE};
