pub mod comment;
pub mod job_request;
pub mod notification;
pub mod opportunity;
pub mod resource;
pub mod user;

pub use comment::*;
pub use job_request::*;
pub use notification::*;
pub use opportunity::*;
pub use resource::*;
pub use user::*;

use crate::utils::{AppError, AppResult};

/// Documents that belong to exactly one user. Every mutation of such a
/// document goes through `ensure_owned_by`.
pub trait Owned {
    fn owner_id(&self) -> &str;

    fn is_owned_by(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.owner_id() == user_id
    }

    fn ensure_owned_by(&self, user_id: &str) -> AppResult<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not authorized".to_string()))
        }
    }
}
