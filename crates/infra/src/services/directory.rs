//! Participant directory: registration, profiles, administration.

use tracing::{Span, instrument};

use bookstore_auth::{Principal, Role, require_owner_or_admin, require_role};
use bookstore_core::{DomainError, Page, ParticipantId};
use bookstore_participants::{
    ChangeScope, NewParticipant, ParticipantChanges, ParticipantFilter, ParticipantProfile,
    RegistrationChannel,
};

use super::{ServiceError, Services, finish};
use crate::store::{NewParticipantRecord, UnitOfWork};

impl Services {
    /// Public sign-up. Cannot create administrators.
    pub async fn register(&self, new: NewParticipant) -> Result<ParticipantProfile, ServiceError> {
        self.create_participant(new, RegistrationChannel::SelfService).await
    }

    /// Administrator-only account creation (any participant type).
    pub async fn admin_create(
        &self,
        principal: &Principal,
        new: NewParticipant,
    ) -> Result<ParticipantProfile, ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.create_participant(new, RegistrationChannel::Admin).await
    }

    #[instrument(skip(self, new), fields(name = %new.name, role = %new.role, participant_id), err)]
    pub(crate) async fn create_participant(
        &self,
        new: NewParticipant,
        channel: RegistrationChannel,
    ) -> Result<ParticipantProfile, ServiceError> {
        let new = new.validated(channel)?;
        let digest = self.passwords.hash(&new.password)?;

        let mut uow = self.store.begin().await?;
        let result = insert_participant(uow.as_mut(), new, digest).await;
        let profile = finish(uow, result).await?;

        Span::current().record("participant_id", profile.id.get());
        Ok(profile)
    }

    /// Create the first administrator if none exists yet. Returns `None` when
    /// an administrator is already present.
    #[instrument(skip(self, password), err)]
    pub async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<ParticipantProfile>, ServiceError> {
        let new = NewParticipant {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            address: None,
            role: Role::Administrator,
        }
        .validated(RegistrationChannel::Admin)?;
        let digest = self.passwords.hash(&new.password)?;

        let mut uow = self.store.begin().await?;
        let result = insert_first_admin(uow.as_mut(), new, digest).await;
        let created = finish(uow, result).await?;

        if let Some(profile) = &created {
            tracing::info!(participant_id = %profile.id, name = %profile.name, "bootstrapped administrator");
        }
        Ok(created)
    }

    pub async fn me(&self, principal: &Principal) -> Result<ParticipantProfile, ServiceError> {
        self.participant(principal, principal.id).await
    }

    /// Self or administrator.
    pub async fn participant(
        &self,
        principal: &Principal,
        id: ParticipantId,
    ) -> Result<ParticipantProfile, ServiceError> {
        require_owner_or_admin(principal, id)?;

        let mut uow = self.store.begin().await?;
        let result = uow.participant(id).await.map_err(ServiceError::from);
        finish(uow, result)
            .await?
            .map(|p| p.profile())
            .ok_or_else(|| DomainError::not_found(format!("Participant {id}")).into())
    }

    pub async fn update_me(
        &self,
        principal: &Principal,
        changes: ParticipantChanges,
    ) -> Result<ParticipantProfile, ServiceError> {
        self.apply_changes(principal.id, changes, ChangeScope::Own).await
    }

    pub async fn admin_update(
        &self,
        principal: &Principal,
        id: ParticipantId,
        changes: ParticipantChanges,
    ) -> Result<ParticipantProfile, ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.apply_changes(id, changes, ChangeScope::Admin).await
    }

    #[instrument(skip(self, changes), err)]
    async fn apply_changes(
        &self,
        id: ParticipantId,
        changes: ParticipantChanges,
        scope: ChangeScope,
    ) -> Result<ParticipantProfile, ServiceError> {
        let changes = changes.validated(scope)?;
        let digest = changes
            .password
            .as_deref()
            .map(|p| self.passwords.hash(p))
            .transpose()?;

        let mut uow = self.store.begin().await?;
        let result = update_participant(uow.as_mut(), id, &changes, digest).await;
        finish(uow, result).await
    }

    pub async fn delete_me(&self, principal: &Principal) -> Result<(), ServiceError> {
        self.delete_participant(principal.id).await
    }

    pub async fn admin_delete(&self, principal: &Principal, id: ParticipantId) -> Result<(), ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.delete_participant(id).await
    }

    #[instrument(skip(self), err)]
    async fn delete_participant(&self, id: ParticipantId) -> Result<(), ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = match uow.delete_participant(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DomainError::not_found(format!("Participant {id}")).into()),
            Err(e) => Err(e.into()),
        };
        finish(uow, result).await
    }

    pub async fn list_participants(
        &self,
        principal: &Principal,
        page: Page,
    ) -> Result<Vec<ParticipantProfile>, ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.query_participants(ParticipantFilter::default(), page).await
    }

    pub async fn search_participants(
        &self,
        principal: &Principal,
        filter: ParticipantFilter,
        page: Page,
    ) -> Result<Vec<ParticipantProfile>, ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.query_participants(filter, page).await
    }

    /// Store directory, visible to any authenticated participant.
    pub async fn list_stores(&self, page: Page) -> Result<Vec<ParticipantProfile>, ServiceError> {
        self.query_participants(ParticipantFilter::by_role(Role::Store), page)
            .await
    }

    async fn query_participants(
        &self,
        filter: ParticipantFilter,
        page: Page,
    ) -> Result<Vec<ParticipantProfile>, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .list_participants(&filter, page)
            .await
            .map_err(ServiceError::from);
        Ok(finish(uow, result)
            .await?
            .iter()
            .map(|p| p.profile())
            .collect())
    }
}

async fn insert_participant(
    uow: &mut dyn UnitOfWork,
    new: NewParticipant,
    password_digest: String,
) -> Result<ParticipantProfile, ServiceError> {
    ensure_unique(uow, Some(&new.name), Some(&new.email), None).await?;
    let participant = uow
        .insert_participant(NewParticipantRecord {
            name: new.name,
            email: new.email,
            password_digest,
            address: new.address,
            role: new.role,
        })
        .await?;
    Ok(participant.profile())
}

async fn insert_first_admin(
    uow: &mut dyn UnitOfWork,
    new: NewParticipant,
    password_digest: String,
) -> Result<Option<ParticipantProfile>, ServiceError> {
    if uow.administrator_exists().await? {
        return Ok(None);
    }
    insert_participant(uow, new, password_digest).await.map(Some)
}

async fn update_participant(
    uow: &mut dyn UnitOfWork,
    id: ParticipantId,
    changes: &ParticipantChanges,
    password_digest: Option<String>,
) -> Result<ParticipantProfile, ServiceError> {
    let mut participant = uow
        .participant(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Participant {id}")))?;

    ensure_unique(uow, changes.name.as_deref(), changes.email.as_deref(), Some(id)).await?;
    changes.apply_to(&mut participant);
    if let Some(digest) = password_digest {
        participant.password_digest = digest;
    }
    uow.update_participant(&participant).await?;
    Ok(participant.profile())
}

/// Name and email are unique across the directory; `except` is the record
/// being edited.
async fn ensure_unique(
    uow: &mut dyn UnitOfWork,
    name: Option<&str>,
    email: Option<&str>,
    except: Option<ParticipantId>,
) -> Result<(), ServiceError> {
    let taken = |found: Option<ParticipantId>| found.is_some_and(|id| Some(id) != except);

    if let Some(name) = name {
        let found = uow.participant_by_name(name).await?.map(|p| p.id);
        if taken(found) {
            return Err(DomainError::validation("Username already registered").into());
        }
    }
    if let Some(email) = email {
        let found = uow.participant_by_email(email).await?.map(|p| p.id);
        if taken(found) {
            return Err(DomainError::validation("Email already registered").into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{fixture, services, stock};

    fn signup(name: &str, email: &str, role: Role) -> NewParticipant {
        NewParticipant {
            name: name.into(),
            email: email.into(),
            password: "secret".into(),
            address: None,
            role,
        }
    }

    fn is_validation(err: &ServiceError) -> bool {
        matches!(err.domain(), Some(DomainError::Validation(_)))
    }

    fn is_forbidden(err: &ServiceError) -> bool {
        matches!(err.domain(), Some(DomainError::Forbidden(_)))
    }

    #[tokio::test]
    async fn register_rejects_duplicate_name_and_email() {
        let services = services();
        services.register(signup("dave", "dave@example.com", Role::Buyer)).await.unwrap();

        let same_name = services
            .register(signup("dave", "other@example.com", Role::Buyer))
            .await
            .unwrap_err();
        let same_email = services
            .register(signup("dave2", "dave@example.com", Role::Store))
            .await
            .unwrap_err();

        assert_eq!(
            same_name.domain(),
            Some(&DomainError::validation("Username already registered"))
        );
        assert_eq!(
            same_email.domain(),
            Some(&DomainError::validation("Email already registered"))
        );
    }

    #[tokio::test]
    async fn register_refuses_administrators() {
        let err = services()
            .register(signup("root", "root@example.com", Role::Administrator))
            .await
            .unwrap_err();
        assert!(is_forbidden(&err));
    }

    #[tokio::test]
    async fn bootstrap_admin_runs_once() {
        let services = services();
        let first = services.bootstrap_admin("root", "root@example.com", "pw").await.unwrap();
        assert_eq!(first.map(|p| p.role), Some(Role::Administrator));

        let second = services.bootstrap_admin("root2", "root2@example.com", "pw").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn participants_see_themselves_admins_see_everyone() {
        let f = fixture().await;
        assert_eq!(f.services.me(&f.buyer).await.unwrap().name, "buyer-1");

        let err = f.services.participant(&f.buyer, f.other_buyer.id).await.unwrap_err();
        assert!(is_forbidden(&err));
        assert!(f.services.participant(&f.admin, f.other_buyer.id).await.is_ok());

        let missing = f
            .services
            .participant(&f.admin, ParticipantId::new(9_999))
            .await
            .unwrap_err();
        assert!(matches!(missing.domain(), Some(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_me_changes_fields_and_password() {
        let f = fixture().await;
        let updated = f
            .services
            .update_me(
                &f.buyer,
                ParticipantChanges {
                    address: Some("42 New Road".into()),
                    password: Some("new-pw".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("42 New Road"));

        assert!(f.services.login("buyer-1", "new-pw", &[]).await.is_ok());
        assert!(f.services.login("buyer-1", "pw-buyer-1", &[]).await.is_err());
    }

    #[tokio::test]
    async fn update_me_rejects_empty_taken_and_type_changes() {
        let f = fixture().await;

        let empty = f.services.update_me(&f.buyer, ParticipantChanges::default()).await.unwrap_err();
        assert!(is_validation(&empty));

        let taken = f
            .services
            .update_me(
                &f.buyer,
                ParticipantChanges {
                    email: Some("buyer-2@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(is_validation(&taken));

        let promote = f
            .services
            .update_me(
                &f.buyer,
                ParticipantChanges {
                    role: Some(Role::Administrator),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(is_forbidden(&promote));

        // Re-submitting one's own current name is not a conflict.
        assert!(
            f.services
                .update_me(
                    &f.buyer,
                    ParticipantChanges {
                        name: Some("buyer-1".into()),
                        ..Default::default()
                    },
                )
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn admin_operations_require_administrator() {
        let f = fixture().await;

        let err = f.services.list_participants(&f.buyer, Page::default()).await.unwrap_err();
        assert!(is_forbidden(&err));
        assert_eq!(
            f.services.list_participants(&f.admin, Page::default()).await.unwrap().len(),
            5
        );

        let promoted = f
            .services
            .admin_update(
                &f.admin,
                f.buyer.id,
                ParticipantChanges {
                    role: Some(Role::Store),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Store);

        let created = f
            .services
            .admin_create(&f.admin, signup("ops", "ops@example.com", Role::Administrator))
            .await
            .unwrap();
        assert_eq!(created.role, Role::Administrator);

        assert!(is_forbidden(
            &f.services.admin_delete(&f.store_a, created.id).await.unwrap_err()
        ));
        f.services.admin_delete(&f.admin, created.id).await.unwrap();
        let gone = f.services.admin_delete(&f.admin, created.id).await.unwrap_err();
        assert!(matches!(gone.domain(), Some(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn search_filters_by_query_and_type() {
        let f = fixture().await;
        let stores = f
            .services
            .search_participants(
                &f.admin,
                ParticipantFilter {
                    query: Some("STORE".into()),
                    role: None,
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(stores.len(), 2);

        let buyers = f
            .services
            .search_participants(&f.admin, ParticipantFilter::by_role(Role::Buyer), Page::new(Some(1), None))
            .await
            .unwrap();
        assert_eq!(buyers.len(), 1);
        assert_eq!(buyers[0].name, "buyer-2");

        let listed = f.services.list_stores(Page::default()).await.unwrap();
        assert!(listed.iter().all(|p| p.role == Role::Store));
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_store_removes_its_books() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "10.00", 3).await;

        f.services.delete_me(&f.store_a).await.unwrap();
        let err = f.services.book(&crate::services::test_support::isbn("111")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::NotFound(_))));
    }
}
