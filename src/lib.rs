#![forbid(unsafe_code)]
//! Gardes — bibliothèque de répartition du personnel sur des postes de garde.
//!
//! - Catalogue en mémoire (tags, personnel, postes, incompatibilités), stockage JSON.
//! - Filtre d'éligibilité (restrictions contre conditions).
//! - Sélection d'équipes sans incompatibilité, aptitude exigée.
//! - Rotation tenant compte du repos, avec relâchement par paliers.
//! - Heures murales sans fuseau ; un créneau dont la fin précède le début passe minuit.

pub mod catalog;
pub mod io;
pub mod model;
pub mod scheduler;
pub mod storage;

pub use catalog::{Catalog, CatalogError};
pub use model::{
    AssignedPersonnel, DutyAssignment, DutyId, GuardDuty, Incompatibilities, Personnel,
    PersonnelId, Post, PostId, Tag, TagId, TagKind, TimeWindow,
};
pub use scheduler::{
    Conflict, ConflictKind, Engine, EngineOptions, QualificationPolicy, SchedError, Schedule,
    TeamPolicy, Warning, WarningKind,
};
pub use storage::{JsonStorage, Storage};
