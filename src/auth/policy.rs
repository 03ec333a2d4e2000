//! Admin-vs-self authorization, independent of the HTTP layer.

use crate::auth::context::RequestAuth;
use crate::blockchain::types::WalletAddress;
use crate::error::CoreError;
use crate::mirror::models::Role;

/// Admins may act on any wallet; everyone else only on their own.
pub fn authorize(actor_role: Role, actor_wallet: &WalletAddress, target_wallet: &WalletAddress) -> bool {
    actor_role == Role::Admin || actor_wallet == target_wallet
}

/// [`authorize`] for a request, as a `Forbidden` error.
pub fn ensure_access(auth: &RequestAuth, target_wallet: &WalletAddress) -> Result<(), CoreError> {
    if authorize(auth.role, &auth.wallet, target_wallet) {
        Ok(())
    } else {
        Err(CoreError::Forbidden("not allowed to access another user's records".into()))
    }
}

/// The wallet filter a listing should apply: none for admins.
pub fn listing_scope(auth: &RequestAuth) -> Option<&WalletAddress> {
    if auth.is_admin() {
        None
    } else {
        Some(&auth.wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn wallet(byte: u8) -> WalletAddress {
        format!("0x{}", hex::encode([byte; 20])).parse().unwrap()
    }

    #[test]
    fn test_admin_reaches_everyone() {
        assert!(authorize(Role::Admin, &wallet(1), &wallet(2)));
    }

    #[test]
    fn test_user_reaches_only_self() {
        assert!(authorize(Role::User, &wallet(1), &wallet(1)));
        assert!(!authorize(Role::User, &wallet(1), &wallet(2)));
    }

    #[test]
    fn test_self_match_ignores_case() {
        let lower: WalletAddress = format!("0x{}", "ab".repeat(20)).parse().unwrap();
        let upper: WalletAddress = format!("0x{}", "AB".repeat(20)).parse().unwrap();
        assert!(authorize(Role::User, &lower, &upper));
    }

    #[test]
    fn test_listing_scope() {
        let user = RequestAuth { user_id: Uuid::new_v4(), wallet: wallet(7), role: Role::User };
        assert_eq!(listing_scope(&user), Some(&wallet(7)));
        let admin = RequestAuth { role: Role::Admin, ..user };
        assert_eq!(listing_scope(&admin), None);
    }
}
