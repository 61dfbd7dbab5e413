//! Participant directory domain module (buyers, stores, administrators).
//!
//! Business rules for accounts, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage). Uniqueness of name/email is enforced by the
//! service layer against the store.

pub mod participant;

pub use participant::{
    ChangeScope, NewParticipant, Participant, ParticipantChanges, ParticipantFilter,
    ParticipantProfile, RegistrationChannel,
};
