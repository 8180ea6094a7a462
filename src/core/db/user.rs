use time::OffsetDateTime;

use crate::error::Result;

/// A tenant of the store. Registration, passwords and sessions live outside
/// this crate; users exist here so project ownership is real.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub created_at: OffsetDateTime,
    pub(super) _guard: (),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
}

pub trait UserRepository {
    fn add_user(&self, user: NewUser) -> impl Future<Output = Result<User>>;
    fn get_user_by_id(&self, id: i64) -> impl Future<Output = Result<Option<User>>>;
    fn get_user_by_email(&self, email: &str) -> impl Future<Output = Result<Option<User>>>;
}
