//! Vue résolue du catalogue et filtre d'éligibilité par poste.

use crate::catalog::Catalog;
use crate::model::{Personnel, PersonnelId, Post, Tag, TagId, TagKind};
use std::collections::BTreeSet;

/// Personne du vivier, restrictions résolues par nom.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'a> {
    pub person: &'a Personnel,
    restriction_names: BTreeSet<&'a str>,
}

impl<'a> Candidate<'a> {
    pub fn resolve(catalog: &'a Catalog, person: &'a Personnel) -> Self {
        Self {
            person,
            restriction_names: names(catalog, &person.restrictions, TagKind::Restriction),
        }
    }

    pub fn id(&self) -> &'a PersonnelId {
        &self.person.id
    }

    pub fn holds(&self, functionality: &TagId) -> bool {
        self.person.functionalities.contains(functionality)
    }
}

/// Poste avec conditions et exigence résolues.
#[derive(Debug, Clone)]
pub(crate) struct PostView<'a> {
    pub post: &'a Post,
    condition_names: BTreeSet<&'a str>,
    pub requirement: Option<&'a Tag>,
}

impl<'a> PostView<'a> {
    pub fn resolve(catalog: &'a Catalog, post: &'a Post) -> Self {
        let requirement = post.requires_functionality.as_ref().and_then(|id| {
            let tag = catalog
                .find_tag(id)
                .filter(|t| t.kind == TagKind::Functionality);
            if tag.is_none() {
                tracing::debug!(post = %post.name, tag = %id.as_str(), "ignoring stale functionality requirement");
            }
            tag
        });
        Self {
            post,
            condition_names: names(catalog, &post.conditions, TagKind::Condition),
            requirement,
        }
    }

    pub fn required(&self) -> usize {
        self.post.required_count as usize
    }
}

fn names<'a>(catalog: &'a Catalog, ids: &BTreeSet<TagId>, kind: TagKind) -> BTreeSet<&'a str> {
    ids.iter()
        .filter_map(|id| catalog.find_tag(id))
        .filter(|t| t.kind == kind)
        .map(|t| t.name.as_str())
        .collect()
}

/// Vrai si la personne est exclue du poste : une de ses restrictions porte le
/// nom d'une condition du poste, ou figure parmi les restrictions du poste.
pub(crate) fn is_excluded(candidate: &Candidate<'_>, post: &PostView<'_>) -> bool {
    !candidate.restriction_names.is_disjoint(&post.condition_names)
        || !candidate.person.restrictions.is_disjoint(&post.post.restrictions)
}

/// Indices (dans l'ordre du vivier) des personnes éligibles au poste.
pub(crate) fn eligible(pool: &[Candidate<'_>], post: &PostView<'_>) -> Vec<usize> {
    pool.iter()
        .enumerate()
        .filter(|(_, c)| !is_excluded(c, post))
        .map(|(idx, _)| idx)
        .collect()
}
