use crate::model::{
    DutyId, GuardDuty, Incompatibilities, Personnel, PersonnelId, Post, PostId, Tag, TagId,
    TagKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{} '{}' already exists", .0.as_str(), .1)]
    DuplicateTag(TagKind, String),
    #[error("unknown tag: {0}")]
    UnknownTag(String),
    #[error("unknown personnel: {0}")]
    UnknownPersonnel(String),
    #[error("unknown post: {0}")]
    UnknownPost(String),
    #[error("unknown guard duty: {0}")]
    UnknownDuty(String),
    #[error("post '{0}' must require at least one person")]
    InvalidRequiredCount(String),
    #[error("invalid time range: end must be after start")]
    InvalidTimeRange,
}

/// Catalogue complet : tags, personnel, postes, incompatibilités, gardes.
///
/// Stockage clé/valeur simple en mémoire ; la persistance passe par [`crate::storage`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub personnel: Vec<Personnel>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub incompatibilities: Incompatibilities,
    #[serde(default)]
    pub duties: Vec<GuardDuty>,
}

impl Catalog {
    // --- tags ---

    pub fn add_tag<N: Into<String>>(&mut self, kind: TagKind, name: N) -> Result<TagId, CatalogError> {
        let name = name.into();
        if self.find_tag_by_name(kind, &name).is_some() {
            return Err(CatalogError::DuplicateTag(kind, name));
        }
        let tag = Tag::new(kind, name);
        let id = tag.id.clone();
        self.tags.push(tag);
        Ok(id)
    }

    /// Retourne l'id du tag `name`, en le créant au besoin.
    pub fn ensure_tag(&mut self, kind: TagKind, name: &str) -> TagId {
        if let Some(tag) = self.find_tag_by_name(kind, name) {
            return tag.id.clone();
        }
        let tag = Tag::new(kind, name);
        let id = tag.id.clone();
        self.tags.push(tag);
        id
    }

    pub fn tags_of_kind(&self, kind: TagKind) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |t| t.kind == kind)
    }

    pub fn find_tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.id == id)
    }

    pub fn find_tag_by_name(&self, kind: TagKind, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.kind == kind && t.name == name)
    }

    /// Supprime un tag et toutes les références qui le visent.
    pub fn remove_tag(&mut self, id: &TagId) -> Result<Tag, CatalogError> {
        let pos = self
            .tags
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| CatalogError::UnknownTag(id.as_str().to_string()))?;
        let tag = self.tags.remove(pos);

        for p in self.personnel.iter_mut() {
            p.functionalities.remove(id);
            p.restrictions.remove(id);
        }
        for post in self.posts.iter_mut() {
            post.conditions.remove(id);
            post.restrictions.remove(id);
            post.functionalities.remove(id);
            if post.requires_functionality.as_ref() == Some(id) {
                post.requires_functionality = None;
            }
        }
        Ok(tag)
    }

    // --- personnel ---

    /// Plus petit entier positif non utilisé comme `index`.
    pub fn next_index(&self) -> u32 {
        let mut used: Vec<u32> = self.personnel.iter().map(|p| p.index).collect();
        used.sort_unstable();
        let mut candidate = 1u32;
        for idx in used {
            if idx == candidate {
                candidate += 1;
            } else if idx > candidate {
                break;
            }
        }
        candidate
    }

    /// Insère une personne : attribue l'index, écarte les tags inconnus ou de
    /// mauvaise famille, enregistre les incompatibilités vers des personnes connues.
    pub fn insert_personnel(
        &mut self,
        mut person: Personnel,
        incompatible_with: &[PersonnelId],
    ) -> PersonnelId {
        person.index = self.next_index();
        person
            .functionalities
            .retain(|id| self.tag_has_kind(id, TagKind::Functionality));
        person
            .restrictions
            .retain(|id| self.tag_has_kind(id, TagKind::Restriction));

        let id = person.id.clone();
        for other in incompatible_with {
            if self.find_personnel(other).is_some() {
                self.incompatibilities.insert(&id, other);
            } else {
                tracing::debug!(personnel = %other.as_str(), "ignoring unknown incompatibility reference");
            }
        }
        self.personnel.push(person);
        id
    }

    pub fn find_personnel(&self, id: &PersonnelId) -> Option<&Personnel> {
        self.personnel.iter().find(|p| &p.id == id)
    }

    pub fn find_personnel_by_index(&self, index: u32) -> Option<&Personnel> {
        self.personnel.iter().find(|p| p.index == index)
    }

    /// Personnel trié par index.
    pub fn personnel_by_index(&self) -> Vec<&Personnel> {
        let mut out: Vec<&Personnel> = self.personnel.iter().collect();
        out.sort_by_key(|p| p.index);
        out
    }

    /// Supprime une personne ; son index redevient disponible.
    pub fn remove_personnel(&mut self, id: &PersonnelId) -> Result<Personnel, CatalogError> {
        let pos = self
            .personnel
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| CatalogError::UnknownPersonnel(id.as_str().to_string()))?;
        self.incompatibilities.detach(id);
        self.duties.retain(|d| &d.personnel != id);
        Ok(self.personnel.remove(pos))
    }

    pub fn add_incompatibility(&mut self, a: &PersonnelId, b: &PersonnelId) -> Result<bool, CatalogError> {
        for id in [a, b] {
            if self.find_personnel(id).is_none() {
                return Err(CatalogError::UnknownPersonnel(id.as_str().to_string()));
            }
        }
        Ok(self.incompatibilities.insert(a, b))
    }

    pub fn remove_incompatibility(&mut self, a: &PersonnelId, b: &PersonnelId) -> bool {
        self.incompatibilities.remove(a, b)
    }

    // --- posts ---

    /// Ajoute un poste. Une exigence d'aptitude inconnue est une erreur ;
    /// les autres tags inconnus sont écartés.
    pub fn insert_post(&mut self, mut post: Post) -> Result<PostId, CatalogError> {
        if post.required_count == 0 {
            return Err(CatalogError::InvalidRequiredCount(post.name));
        }
        if let Some(req) = &post.requires_functionality {
            if !self.tag_has_kind(req, TagKind::Functionality) {
                return Err(CatalogError::UnknownTag(req.as_str().to_string()));
            }
        }
        post.conditions
            .retain(|id| self.tag_has_kind(id, TagKind::Condition));
        post.restrictions
            .retain(|id| self.tag_has_kind(id, TagKind::Restriction));
        post.functionalities
            .retain(|id| self.tag_has_kind(id, TagKind::Functionality));

        let id = post.id.clone();
        self.posts.push(post);
        Ok(id)
    }

    pub fn find_post(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|p| &p.id == id)
    }

    pub fn find_post_by_name(&self, name: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.name == name)
    }

    pub fn remove_post(&mut self, id: &PostId) -> Result<Post, CatalogError> {
        let pos = self
            .posts
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| CatalogError::UnknownPost(id.as_str().to_string()))?;
        self.duties.retain(|d| &d.post != id);
        Ok(self.posts.remove(pos))
    }

    // --- guard duties ---

    pub fn add_duty(&mut self, duty: GuardDuty) -> Result<DutyId, CatalogError> {
        if self.find_personnel(&duty.personnel).is_none() {
            return Err(CatalogError::UnknownPersonnel(duty.personnel.as_str().to_string()));
        }
        if self.find_post(&duty.post).is_none() {
            return Err(CatalogError::UnknownPost(duty.post.as_str().to_string()));
        }
        if duty.end <= duty.start {
            return Err(CatalogError::InvalidTimeRange);
        }
        let id = duty.id.clone();
        self.duties.push(duty);
        Ok(id)
    }

    pub fn remove_duty(&mut self, id: &DutyId) -> Result<GuardDuty, CatalogError> {
        let pos = self
            .duties
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| CatalogError::UnknownDuty(id.as_str().to_string()))?;
        Ok(self.duties.remove(pos))
    }

    fn tag_has_kind(&self, id: &TagId, kind: TagKind) -> bool {
        self.find_tag(id).is_some_and(|t| t.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn person(catalog: &mut Catalog, name: &str) -> PersonnelId {
        catalog.insert_personnel(Personnel::new(name, "Test"), &[])
    }

    #[test]
    fn index_fills_gaps() {
        let mut c = Catalog::default();
        let a = person(&mut c, "a");
        let b = person(&mut c, "b");
        let _ = person(&mut c, "c");
        assert_eq!(c.find_personnel(&b).unwrap().index, 2);

        c.remove_personnel(&b).unwrap();
        let d = person(&mut c, "d");
        assert_eq!(c.find_personnel(&d).unwrap().index, 2);

        c.remove_personnel(&a).unwrap();
        assert_eq!(c.next_index(), 1);
    }

    #[test]
    fn duplicate_tag_names_are_rejected_per_kind() {
        let mut c = Catalog::default();
        c.add_tag(TagKind::Functionality, "Marksman").unwrap();
        assert_eq!(
            c.add_tag(TagKind::Functionality, "Marksman"),
            Err(CatalogError::DuplicateTag(TagKind::Functionality, "Marksman".into()))
        );
        assert!(c.add_tag(TagKind::Condition, "Marksman").is_ok());
    }

    #[test]
    fn insert_ignores_stale_references() {
        let mut c = Catalog::default();
        let cond = c.add_tag(TagKind::Condition, "Night").unwrap();
        let mut p = Personnel::new("a", "b");
        p.restrictions.insert(cond);
        p.restrictions.insert(TagId::new("ghost"));
        let id = c.insert_personnel(p, &[PersonnelId::new("ghost")]);

        assert!(c.find_personnel(&id).unwrap().restrictions.is_empty());
        assert!(c.incompatibilities.is_empty());
    }

    #[test]
    fn removing_personnel_drops_edges_and_duties() {
        let mut c = Catalog::default();
        let a = person(&mut c, "a");
        let b = c.insert_personnel(Personnel::new("b", "b"), &[a.clone()]);
        let post = c.insert_post(Post::new("Gate", 1).unwrap()).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let duty = GuardDuty::new(
            a.clone(),
            post,
            day.and_hms_opt(8, 0, 0).unwrap(),
            day.and_hms_opt(12, 0, 0).unwrap(),
        )
        .unwrap();
        c.add_duty(duty).unwrap();

        assert!(c.incompatibilities.contains(&a, &b));
        c.remove_personnel(&a).unwrap();
        assert!(c.incompatibilities.is_empty());
        assert!(c.duties.is_empty());
    }

    #[test]
    fn post_without_seats_is_rejected() {
        let mut c = Catalog::default();
        let mut post = Post::new("Gate", 1).unwrap();
        post.required_count = 0;
        assert_eq!(
            c.insert_post(post),
            Err(CatalogError::InvalidRequiredCount("Gate".into()))
        );
        assert!(c.posts.is_empty());
    }

    #[test]
    fn removing_tag_clears_post_requirement() {
        let mut c = Catalog::default();
        let marks = c.add_tag(TagKind::Functionality, "Marksman").unwrap();
        let mut post = Post::new("Tower", 1).unwrap();
        post.requires_functionality = Some(marks.clone());
        let post = c.insert_post(post).unwrap();

        c.remove_tag(&marks).unwrap();
        assert!(c.find_post(&post).unwrap().requires_functionality.is_none());
    }

    #[test]
    fn duty_requires_known_references() {
        let mut c = Catalog::default();
        let day = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let duty = GuardDuty::new(
            PersonnelId::new("nobody"),
            PostId::new("nowhere"),
            day.and_hms_opt(8, 0, 0).unwrap(),
            day.and_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(matches!(c.add_duty(duty), Err(CatalogError::UnknownPersonnel(_))));
    }
}
