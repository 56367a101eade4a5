use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Address, LedgerEvent};

use super::{CallContext, LedgerState};

/// What an account may do on the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Unauthorized,
    /// An authorized voter.
    Voter,
    /// The owner or an authorized admin.
    Admin,
}

impl LedgerState {
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_owner(&self, account: &Address) -> bool {
        *account == self.owner
    }

    /// Is this account the owner or an authorized admin?
    pub fn is_admin(&self, account: &Address) -> bool {
        self.is_owner(account) || self.admins.contains(account)
    }

    /// Authorized admins, excluding the owner.
    pub fn admins(&self) -> impl Iterator<Item = &Address> {
        self.admins.iter()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Admin takes precedence if an account is both.
    pub fn role_of(&self, account: &Address) -> Role {
        if self.is_admin(account) {
            Role::Admin
        } else if self.is_authorized_voter(account) {
            Role::Voter
        } else {
            Role::Unauthorized
        }
    }

    pub(super) fn require_admin(&self, ctx: &CallContext) -> Result<()> {
        if self.is_admin(&ctx.caller) {
            Ok(())
        } else {
            Err(Error::unauthorized("Caller is not an admin"))
        }
    }

    pub(super) fn require_owner(&self, ctx: &CallContext) -> Result<()> {
        if self.is_owner(&ctx.caller) {
            Ok(())
        } else {
            Err(Error::unauthorized("Caller is not the owner"))
        }
    }

    /// Grant admin rights. Owner only.
    pub fn authorize_admin(&mut self, ctx: &CallContext, account: Address) -> Result<()> {
        self.require_owner(ctx)?;
        self.check_authorize_admin(&account)?;
        self.apply_authorize_admin(ctx.now, account);
        Ok(())
    }

    /// Withdraw admin rights. Owner only; the owner itself cannot be revoked.
    pub fn revoke_admin(&mut self, ctx: &CallContext, account: Address) -> Result<()> {
        self.require_owner(ctx)?;
        self.check_revoke_admin(&account)?;
        self.apply_revoke_admin(ctx.now, account);
        Ok(())
    }

    /// Stop all voting until unpaused. Owner only.
    pub fn pause(&mut self, ctx: &CallContext) -> Result<()> {
        self.require_owner(ctx)?;
        self.check_pause()?;
        self.apply_pause(ctx.now, ctx.caller);
        Ok(())
    }

    pub fn unpause(&mut self, ctx: &CallContext) -> Result<()> {
        self.require_owner(ctx)?;
        self.check_unpause()?;
        self.apply_unpause(ctx.now, ctx.caller);
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        self.require_owner(ctx)?;
        self.check_transfer_ownership(&new_owner)?;
        self.apply_transfer_ownership(ctx.now, new_owner);
        Ok(())
    }

    pub(super) fn check_authorize_admin(&self, account: &Address) -> Result<()> {
        if account.is_zero() {
            return Err(Error::validation("Invalid admin address"));
        }
        if self.is_admin(account) {
            return Err(Error::state("Account is already an admin"));
        }
        Ok(())
    }

    pub(super) fn apply_authorize_admin(&mut self, now: DateTime<Utc>, account: Address) {
        self.admins.insert(account);
        info!("Admin {account} authorized");
        self.emit(now, LedgerEvent::AdminAuthorized { admin: account });
    }

    pub(super) fn check_revoke_admin(&self, account: &Address) -> Result<()> {
        if self.is_owner(account) {
            return Err(Error::state("Cannot revoke the owner"));
        }
        if !self.admins.contains(account) {
            return Err(Error::state("Account is not an admin"));
        }
        Ok(())
    }

    pub(super) fn apply_revoke_admin(&mut self, now: DateTime<Utc>, account: Address) {
        self.admins.remove(&account);
        info!("Admin {account} revoked");
        self.emit(now, LedgerEvent::AdminRevoked { admin: account });
    }

    pub(super) fn check_pause(&self) -> Result<()> {
        if self.paused {
            return Err(Error::state("Ledger is already paused"));
        }
        Ok(())
    }

    pub(super) fn apply_pause(&mut self, now: DateTime<Utc>, by: Address) {
        self.paused = true;
        warn!("Voting paused by {by}");
        self.emit(now, LedgerEvent::Paused { by });
    }

    pub(super) fn check_unpause(&self) -> Result<()> {
        if !self.paused {
            return Err(Error::state("Ledger is not paused"));
        }
        Ok(())
    }

    pub(super) fn apply_unpause(&mut self, now: DateTime<Utc>, by: Address) {
        self.paused = false;
        info!("Voting resumed by {by}");
        self.emit(now, LedgerEvent::Unpaused { by });
    }

    pub(super) fn check_transfer_ownership(&self, new_owner: &Address) -> Result<()> {
        if new_owner.is_zero() {
            return Err(Error::validation("Invalid owner address"));
        }
        if self.is_owner(new_owner) {
            return Err(Error::state("Account already owns the ledger"));
        }
        Ok(())
    }

    pub(super) fn apply_transfer_ownership(&mut self, now: DateTime<Utc>, new_owner: Address) {
        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        // An admin promoted to owner no longer needs a separate grant.
        self.admins.remove(&new_owner);
        info!("Ownership transferred from {previous_owner} to {new_owner}");
        self.emit(
            now,
            LedgerEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::examples::{ctx, genesis};
    use super::*;

    #[ledger_test]
    fn admin_lifecycle(ledger: &mut LedgerState) {
        let owner = ctx(Address::owner_example(), genesis());
        let deputy = Address::from_label("deputy");

        assert_eq!(ledger.role_of(&Address::owner_example()), Role::Admin);
        assert_eq!(ledger.role_of(&deputy), Role::Unauthorized);

        // Grant.
        ledger.authorize_admin(&owner, deputy).unwrap();
        assert!(ledger.is_admin(&deputy));
        assert_eq!(ledger.admins().collect::<Vec<_>>(), vec![&deputy]);

        // Granting twice, or granting the owner, is rejected.
        assert_eq!(
            ledger.authorize_admin(&owner, deputy),
            Err(Error::state("Account is already an admin"))
        );
        assert_eq!(
            ledger.authorize_admin(&owner, Address::owner_example()),
            Err(Error::state("Account is already an admin"))
        );
        assert_eq!(
            ledger.authorize_admin(&owner, Address::ZERO),
            Err(Error::validation("Invalid admin address"))
        );

        // Admins cannot grant or revoke; only the owner can.
        let as_deputy = ctx(deputy, genesis());
        assert_eq!(
            ledger.authorize_admin(&as_deputy, Address::from_label("other")),
            Err(Error::unauthorized("Caller is not the owner"))
        );

        // Revoke.
        assert_eq!(
            ledger.revoke_admin(&owner, Address::owner_example()),
            Err(Error::state("Cannot revoke the owner"))
        );
        ledger.revoke_admin(&owner, deputy).unwrap();
        assert!(!ledger.is_admin(&deputy));
        assert_eq!(
            ledger.revoke_admin(&owner, deputy),
            Err(Error::state("Account is not an admin"))
        );

        let kinds: Vec<_> = ledger
            .events()
            .iter()
            .map(|record| record.event.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                LedgerEvent::AdminAuthorized { admin: deputy },
                LedgerEvent::AdminRevoked { admin: deputy },
            ]
        );
    }

    #[ledger_test]
    fn pause_toggle(ledger: &mut LedgerState) {
        let owner = ctx(Address::owner_example(), genesis());

        assert_eq!(ledger.unpause(&owner), Err(Error::state("Ledger is not paused")));
        ledger.pause(&owner).unwrap();
        assert!(ledger.is_paused());
        assert_eq!(ledger.pause(&owner), Err(Error::state("Ledger is already paused")));

        let stranger = ctx(Address::from_label("stranger"), genesis());
        assert_eq!(
            ledger.unpause(&stranger),
            Err(Error::unauthorized("Caller is not the owner"))
        );
        ledger.unpause(&owner).unwrap();
        assert!(!ledger.is_paused());
    }

    #[ledger_test]
    fn ownership_transfer(ledger: &mut LedgerState) {
        let owner = ctx(Address::owner_example(), genesis());
        let successor = Address::from_label("successor");
        ledger.authorize_admin(&owner, successor).unwrap();

        assert_eq!(
            ledger.transfer_ownership(&owner, Address::owner_example()),
            Err(Error::state("Account already owns the ledger"))
        );
        ledger.transfer_ownership(&owner, successor).unwrap();
        assert_eq!(ledger.owner(), successor);
        assert_eq!(ledger.admins().count(), 0);

        // The previous owner has lost every privilege.
        assert_eq!(ledger.role_of(&Address::owner_example()), Role::Unauthorized);
        assert_eq!(
            ledger.pause(&owner),
            Err(Error::unauthorized("Caller is not the owner"))
        );
    }
}
