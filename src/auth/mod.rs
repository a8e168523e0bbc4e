/// Authentication primitives
///
/// JWT issuance/verification, password hashing, and single-use token
/// generation. Refresh-token persistence lives in the store layer.

mod claims;
mod jwt;
mod one_time;
mod password;

pub use claims::Claims;
pub use jwt::{issue_access_token, issue_token_pair, verify_token, TokenPair};
pub use one_time::{new_phone_code, new_reset_token, new_verification_token};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
