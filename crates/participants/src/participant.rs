use serde::{Deserialize, Serialize};

use bookstore_auth::{Principal, Role};
use bookstore_core::{DomainError, DomainResult, Entity, ParticipantId};

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Directory record. Carries the password digest; never serialize it outward,
/// use [`Participant::profile`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub address: Option<String>,
    pub role: Role,
}

impl Participant {
    pub fn profile(&self) -> ParticipantProfile {
        ParticipantProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            role: self.role,
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.name.clone(), self.role)
    }
}

impl Entity for Participant {
    type Id = ParticipantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Public view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub role: Role,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Who is creating the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationChannel {
    /// Public sign-up endpoint.
    SelfService,
    /// An administrator creating an account on someone's behalf.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub role: Role,
}

impl NewParticipant {
    /// Trim and validate. Administrators can only be created by administrators.
    pub fn validated(mut self, channel: RegistrationChannel) -> DomainResult<Self> {
        if channel == RegistrationChannel::SelfService && self.role == Role::Administrator {
            return Err(DomainError::forbidden(
                "administrator accounts cannot be self-registered",
            ));
        }

        self.name = validate_name(&self.name)?;
        self.email = validate_email(&self.email)?;
        validate_password(&self.password)?;
        self.address = normalize_optional(self.address);
        Ok(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────────────

/// Which update surface a change set came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// `/user/me`: a participant editing their own record.
    Own,
    /// `/user/admin/:id`: an administrator editing any record.
    Admin,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "type")]
    pub role: Option<Role>,
}

impl ParticipantChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.password.is_none()
            && self.role.is_none()
    }

    /// Trim and validate. A participant cannot change their own type.
    pub fn validated(mut self, scope: ChangeScope) -> DomainResult<Self> {
        if self.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }
        if scope == ChangeScope::Own && self.role.is_some() {
            return Err(DomainError::forbidden(
                "participant type can only be changed by an administrator",
            ));
        }

        self.name = self.name.as_deref().map(validate_name).transpose()?;
        self.email = self.email.as_deref().map(validate_email).transpose()?;
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        self.address = self.address.map(|a| a.trim().to_string());
        Ok(self)
    }

    /// Apply to a record. The caller hashes `password` separately.
    pub fn apply_to(&self, participant: &mut Participant) {
        if let Some(name) = &self.name {
            participant.name = name.clone();
        }
        if let Some(email) = &self.email {
            participant.email = email.clone();
        }
        if let Some(address) = &self.address {
            participant.address = Some(address.clone()).filter(|a| !a.is_empty());
        }
        if let Some(role) = self.role {
            participant.role = role;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantFilter {
    /// Case-insensitive substring over name or email.
    pub query: Option<String>,
    pub role: Option<Role>,
}

impl ParticipantFilter {
    pub fn by_role(role: Role) -> Self {
        Self {
            query: None,
            role: Some(role),
        }
    }

    /// The query, lowercased, or `None` when blank.
    pub fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, participant: &Participant) -> bool {
        if self.role.is_some_and(|role| role != participant.role) {
            return false;
        }
        match self.needle() {
            Some(needle) => {
                participant.name.to_lowercase().contains(&needle)
                    || participant.email.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

const NAME_MAX_LEN: usize = 100;

fn validate_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name cannot exceed {NAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email.to_string())
        }
        _ => Err(DomainError::validation(format!("invalid email address '{email}'"))),
    }
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::validation("password cannot be empty"));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_participant(role: Role) -> NewParticipant {
        NewParticipant {
            name: "  alice ".into(),
            email: "alice@example.com".into(),
            password: "pw".into(),
            address: Some("   ".into()),
            role,
        }
    }

    fn record() -> Participant {
        Participant {
            id: ParticipantId::new(1),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_digest: "digest".into(),
            address: None,
            role: Role::Buyer,
        }
    }

    #[test]
    fn self_registration_trims_and_drops_blank_address() {
        let valid = new_participant(Role::Buyer)
            .validated(RegistrationChannel::SelfService)
            .unwrap();
        assert_eq!(valid.name, "alice");
        assert_eq!(valid.address, None);
    }

    #[test]
    fn self_registration_cannot_create_administrators() {
        let err = new_participant(Role::Administrator)
            .validated(RegistrationChannel::SelfService)
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        assert!(
            new_participant(Role::Administrator)
                .validated(RegistrationChannel::Admin)
                .is_ok()
        );
    }

    #[test]
    fn registration_rejects_bad_email() {
        for email in ["", "nobody", "@example.com", "a@", "a@b@c"] {
            let mut p = new_participant(Role::Store);
            p.email = email.into();
            assert!(
                matches!(p.validated(RegistrationChannel::SelfService), Err(DomainError::Validation(_))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn empty_change_set_is_rejected() {
        let err = ParticipantChanges::default()
            .validated(ChangeScope::Own)
            .unwrap_err();
        assert_eq!(err, DomainError::validation("No fields to update"));
    }

    #[test]
    fn own_changes_cannot_touch_type() {
        let changes = ParticipantChanges {
            role: Some(Role::Administrator),
            ..Default::default()
        };
        assert!(matches!(
            changes.clone().validated(ChangeScope::Own),
            Err(DomainError::Forbidden(_))
        ));
        assert!(changes.validated(ChangeScope::Admin).is_ok());
    }

    #[test]
    fn apply_overwrites_only_present_fields() {
        let mut p = record();
        ParticipantChanges {
            address: Some("1 Main St".into()),
            role: Some(Role::Store),
            ..Default::default()
        }
        .apply_to(&mut p);

        assert_eq!(p.name, "Alice");
        assert_eq!(p.address.as_deref(), Some("1 Main St"));
        assert_eq!(p.role, Role::Store);
    }

    #[test]
    fn filter_matches_name_or_email_case_insensitively() {
        let p = record();
        let by_name = ParticipantFilter {
            query: Some("ALI".into()),
            role: None,
        };
        let by_email = ParticipantFilter {
            query: Some("example.COM".into()),
            role: Some(Role::Buyer),
        };
        assert!(by_name.matches(&p));
        assert!(by_email.matches(&p));
        assert!(!ParticipantFilter::by_role(Role::Store).matches(&p));
        assert!(ParticipantFilter::default().matches(&p));
    }

    #[test]
    fn profile_omits_digest_and_renames_type() {
        let json = serde_json::to_value(record().profile()).unwrap();
        assert_eq!(json["type"], "buyer");
        assert!(json.get("password_digest").is_none());
    }
}
