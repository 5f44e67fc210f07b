//! # Account module
//!
//! Module dedicated to user accounts. Accounts are created by the
//! provisioning surface, which is out of scope here: this core only
//! reads them back from the record store and verifies credentials.

mod error;
pub mod passwd;

#[doc(inline)]
pub use self::error::{Error, Result};

/// A provisioned user account.
///
/// Read-only from the point of view of the transport core. The
/// password digest shape is described in [`passwd`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// The account identifier.
    pub id: String,

    /// The account email address, lowercase and unique across the
    /// record store.
    pub email: String,

    /// The salted password digest, issued by provisioning.
    pub password_hash: String,

    /// The identifier of the domain the account belongs to.
    pub domain_id: String,
}

impl User {
    /// Verify a candidate password against the stored digest.
    pub fn check_password(&self, candidate: &str) -> Result<()> {
        if passwd::verify(candidate, &self.password_hash) {
            Ok(())
        } else {
            Err(Error::AuthenticateUserError(self.email.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: "u1".into(),
            email: "alice@example.com".into(),
            password_hash: passwd::hash("password", "salt"),
            domain_id: "d1".into(),
        }
    }

    #[test]
    fn check_password_matches() {
        assert!(alice().check_password("password").is_ok());
    }

    #[test]
    fn check_password_mismatch() {
        let err = alice().check_password("letmein").unwrap_err();
        assert!(matches!(err, Error::AuthenticateUserError(_)));
    }
}
