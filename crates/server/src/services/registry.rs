//! Parking lot registry: creation, sharing, deletion and access checks.

use std::collections::HashSet;

use tracing::{info, instrument};

use garagem_core::{Email, ParkingLotId, UserId};

use super::ServiceError;
use crate::clock::Clock;
use crate::db::{RecordStore, SetChange};
use crate::models::{CurrentUser, ParkingLot};

/// Maximum length of a lot name.
pub const MAX_NAME_LENGTH: usize = 120;

/// Manages parking lots and who may operate them.
pub struct ParkingLotRegistry<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> ParkingLotRegistry<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create a lot owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ValidationFailure` for a blank or overlong name.
    #[instrument(skip(self), fields(owner_id = %owner))]
    pub async fn create(&self, name: &str, owner: UserId) -> Result<ParkingLot, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Informe o nome do estacionamento"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ServiceError::validation(format!(
                "O nome do estacionamento deve ter no máximo {MAX_NAME_LENGTH} caracteres"
            )));
        }

        let lot = ParkingLot {
            id: ParkingLotId::generate(),
            name: name.to_owned(),
            owner_id: owner,
            shared_with: Vec::new(),
            created_at: self.clock.now(),
        };
        self.store.insert_lot(&lot).await?;

        info!(parking_lot_id = %lot.id, "Parking lot created");
        Ok(lot)
    }

    /// Give the account behind `email` access to the lot.
    ///
    /// Sharing with the requester's own email is rejected before anything
    /// else is looked at.
    ///
    /// # Errors
    ///
    /// - `SelfShareRejected` if `email` is the requester's
    /// - `ValidationFailure` if `email` is malformed
    /// - `NotFound` / `Forbidden` if the lot is missing or not the requester's
    /// - `UnknownUser` if no account uses `email`
    /// - `AlreadyShared` if the lot is already shared with `email`
    #[instrument(skip(self, requester), fields(parking_lot_id = %lot_id, user_id = %requester.id))]
    pub async fn share_with(
        &self,
        lot_id: ParkingLotId,
        requester: &CurrentUser,
        email: &str,
    ) -> Result<ParkingLot, ServiceError> {
        let email = parse_email(email)?;
        if email == requester.email {
            return Err(ServiceError::SelfShareRejected);
        }

        let lot = self
            .owned_lot(
                lot_id,
                requester.id,
                "Apenas o proprietário pode compartilhar este estacionamento",
            )
            .await?;
        if self.store.user_by_email(&email).await?.is_none() {
            return Err(ServiceError::UnknownUser(email));
        }

        match self.store.add_share(lot.id, &email).await? {
            SetChange::Applied => {
                info!(shared_with = %email, "Parking lot shared");
                self.lot(lot.id).await
            }
            SetChange::Unchanged => Err(ServiceError::AlreadyShared(email)),
            SetChange::LotMissing => Err(ServiceError::NotFound("Estacionamento")),
        }
    }

    /// A shared user leaves the lot.
    ///
    /// Leaving a lot one no longer has access to succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lot and `ValidationFailure` if the
    /// owner tries to leave their own lot.
    #[instrument(skip(self, user), fields(parking_lot_id = %lot_id, user_id = %user.id))]
    pub async fn revoke_self_access(
        &self,
        lot_id: ParkingLotId,
        user: &CurrentUser,
    ) -> Result<(), ServiceError> {
        let lot = self.lot(lot_id).await?;
        if lot.is_owner(user.id) {
            return Err(ServiceError::validation(
                "O proprietário não pode remover o próprio acesso ao estacionamento",
            ));
        }

        match self.store.remove_share(lot_id, &user.email).await? {
            SetChange::Applied | SetChange::Unchanged => {
                info!("Shared access revoked by user");
                Ok(())
            }
            SetChange::LotMissing => Err(ServiceError::NotFound("Estacionamento")),
        }
    }

    /// The owner removes `email` from the share list.
    ///
    /// Removing an email that is not on the list succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` / `Forbidden` if the lot is missing or not the
    /// requester's, and `ValidationFailure` for a malformed email.
    #[instrument(skip(self, requester), fields(parking_lot_id = %lot_id, user_id = %requester.id))]
    pub async fn revoke_shared_access(
        &self,
        lot_id: ParkingLotId,
        requester: &CurrentUser,
        email: &str,
    ) -> Result<ParkingLot, ServiceError> {
        let email = parse_email(email)?;
        let lot = self
            .owned_lot(
                lot_id,
                requester.id,
                "Apenas o proprietário pode remover acessos",
            )
            .await?;

        match self.store.remove_share(lot.id, &email).await? {
            SetChange::Applied | SetChange::Unchanged => {
                info!(removed = %email, "Shared access revoked by owner");
                self.lot(lot.id).await
            }
            SetChange::LotMissing => Err(ServiceError::NotFound("Estacionamento")),
        }
    }

    /// Delete a lot and every vehicle record in it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` / `Forbidden` if the lot is missing or not the
    /// requester's.
    #[instrument(skip(self, requester), fields(parking_lot_id = %lot_id, user_id = %requester.id))]
    pub async fn delete(
        &self,
        lot_id: ParkingLotId,
        requester: &CurrentUser,
    ) -> Result<(), ServiceError> {
        let lot = self
            .owned_lot(
                lot_id,
                requester.id,
                "Apenas o proprietário pode excluir este estacionamento",
            )
            .await?;
        if !self.store.delete_lot(lot.id).await? {
            return Err(ServiceError::NotFound("Estacionamento"));
        }
        info!("Parking lot deleted");
        Ok(())
    }

    /// Lots the user owns followed by lots shared with them, without
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the store fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_accessible(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<ParkingLot>, ServiceError> {
        let owned = self.store.lots_owned_by(user.id).await?;
        let shared = self.store.lots_shared_with(&user.email).await?;

        let mut seen = HashSet::with_capacity(owned.len() + shared.len());
        Ok(owned
            .into_iter()
            .chain(shared)
            .filter(|lot| seen.insert(lot.id))
            .collect())
    }

    /// Resolve a lot the user may operate on.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lot and `Forbidden` if the user is
    /// neither the owner nor on the share list.
    pub async fn ensure_access(
        &self,
        lot_id: ParkingLotId,
        user: &CurrentUser,
    ) -> Result<ParkingLot, ServiceError> {
        let lot = self.lot(lot_id).await?;
        if lot.can_access(user.id, &user.email) {
            Ok(lot)
        } else {
            Err(ServiceError::Forbidden(
                "Você não tem acesso a este estacionamento",
            ))
        }
    }

    async fn lot(&self, lot_id: ParkingLotId) -> Result<ParkingLot, ServiceError> {
        self.store
            .lot_by_id(lot_id)
            .await?
            .ok_or(ServiceError::NotFound("Estacionamento"))
    }

    async fn owned_lot(
        &self,
        lot_id: ParkingLotId,
        requester: UserId,
        denied: &'static str,
    ) -> Result<ParkingLot, ServiceError> {
        let lot = self.lot(lot_id).await?;
        if lot.is_owner(requester) {
            Ok(lot)
        } else {
            Err(ServiceError::Forbidden(denied))
        }
    }
}

fn parse_email(email: &str) -> Result<Email, ServiceError> {
    Email::parse(email).map_err(|e| ServiceError::validation(format!("Email inválido: {e}")))
}
