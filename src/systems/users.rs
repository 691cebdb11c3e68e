use parking_lot::Mutex;

use super::password::{Digest, PasswordHasher};
use crate::protocol::status::{LoginError, LogoutError};

#[derive(Debug)]
struct User {
    username: String,
    digest: Digest,
    logged_in: bool,
}

// Users are never removed, lookups are linear scans under one lock
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Mutex<Vec<User>>,
}

impl UserDirectory {
    // The whole decision happens under one lock, so racing first logins create one record
    pub fn login(
        &self,
        username: &str,
        password: &[u8],
        hasher: &dyn PasswordHasher,
    ) -> Result<(), LoginError> {
        let mut users = self.users.lock();

        let Some(user) = users.iter_mut().find(|user| user.username == username) else {
            users.push(User {
                username: username.to_owned(),
                digest: hasher.hash(password),
                logged_in: true,
            });
            return Ok(());
        };

        if user.logged_in {
            return Err(LoginError::ActiveUser);
        }

        if !hasher.verify(password, &user.digest) {
            return Err(LoginError::IncorrectPassword);
        }

        user.logged_in = true;
        Ok(())
    }

    pub fn logout(&self, username: &str) -> Result<(), LogoutError> {
        let mut users = self.users.lock();

        let user = users
            .iter_mut()
            .find(|user| user.username == username)
            .ok_or(LogoutError::UserNotFound)?;

        if !user.logged_in {
            return Err(LogoutError::UserNotLoggedIn);
        }

        user.logged_in = false;
        Ok(())
    }

    pub fn is_logged_in(&self, username: &str) -> bool {
        self.users
            .lock()
            .iter()
            .any(|user| user.username == username && user.logged_in)
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }
}
