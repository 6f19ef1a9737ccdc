mod backend;
mod extractor;
mod password;
mod router;

pub use backend::AuthBackend;
pub use backend::AuthSession;
pub use extractor::AuthUser;
pub use password::{hash_password, verify_password};
pub use router::router;
