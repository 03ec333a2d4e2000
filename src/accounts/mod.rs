//! User accounts.
//!
//! # Responsibilities
//! - Register users with a salted password digest
//! - Exchange credentials for a session token
//! - Rotate passwords and delete users
//!
//! # Design Decisions
//! - Emails are stored lowercase; wallets in canonical form
//! - The admin role is granted at registration to configured wallets only
//! - Login failures do not reveal whether the email exists

pub mod service;

pub use service::{AccountService, Credentials, Message, PasswordChange, Registration, Session};
