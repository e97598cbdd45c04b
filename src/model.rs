use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour un tag (aptitude, restriction ou condition)
    TagId
);
string_id!(
    /// Identifiant fort pour un membre du personnel
    PersonnelId
);
string_id!(
    /// Identifiant fort pour un poste de garde
    PostId
);
string_id!(
    /// Identifiant fort pour une garde enregistrée
    DutyId
);

/// Les trois familles de tags, disjointes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// Aptitude détenue (ex. une certification)
    Functionality,
    /// Inaptitude détenue, confrontée aux conditions d'un poste
    Restriction,
    /// Caractéristique d'un poste
    Condition,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Functionality => "functionality",
            TagKind::Restriction => "restriction",
            TagKind::Condition => "condition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub kind: TagKind,
    pub name: String,
}

impl Tag {
    pub fn new<N: Into<String>>(kind: TagKind, name: N) -> Self {
        Self {
            id: TagId::random(),
            kind,
            name: name.into(),
        }
    }
}

/// Membre du personnel.
///
/// `index` est attribué par le catalogue (plus petit entier positif libre).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: PersonnelId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_id: Option<String>,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub functionalities: BTreeSet<TagId>,
    #[serde(default)]
    pub restrictions: BTreeSet<TagId>,
}

impl Personnel {
    pub fn new<F: Into<String>, L: Into<String>>(first_name: F, last_name: L) -> Self {
        Self {
            id: PersonnelId::random(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            personal_id: None,
            index: 0,
            functionalities: BTreeSet::new(),
            restrictions: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: PersonnelId) -> Self {
        self.id = id;
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Poste de garde
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub name: String,
    pub required_count: u32,
    /// Au moins un membre de l'équipe doit détenir cette aptitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_functionality: Option<TagId>,
    #[serde(default)]
    pub conditions: BTreeSet<TagId>,
    #[serde(default)]
    pub restrictions: BTreeSet<TagId>,
    #[serde(default)]
    pub functionalities: BTreeSet<TagId>,
}

impl Post {
    /// Crée un poste en validant `required_count >= 1`.
    pub fn new<N: Into<String>>(name: N, required_count: u32) -> Result<Self, String> {
        if required_count == 0 {
            return Err("required_count must be at least 1".to_string());
        }
        Ok(Self {
            id: PostId::random(),
            name: name.into(),
            required_count,
            requires_functionality: None,
            conditions: BTreeSet::new(),
            restrictions: BTreeSet::new(),
            functionalities: BTreeSet::new(),
        })
    }

    pub fn with_id(mut self, id: PostId) -> Self {
        self.id = id;
        self
    }
}

/// Relation d'incompatibilité, symétrique et irréflexive.
///
/// Chaque paire est stockée une seule fois sous forme canonique `(min, max)`.
///
/// La forme sérialisée est une liste de paires ; au chargement, chaque paire
/// repasse par [`Incompatibilities::insert`] (ordre rétabli, auto-références écartées).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<(PersonnelId, PersonnelId)>",
    into = "Vec<(PersonnelId, PersonnelId)>"
)]
pub struct Incompatibilities {
    edges: BTreeSet<(PersonnelId, PersonnelId)>,
}

impl Incompatibilities {
    fn canonical(a: &PersonnelId, b: &PersonnelId) -> (PersonnelId, PersonnelId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    /// Ajoute l'arête `a — b`. Retourne `false` pour une auto-référence ou un doublon.
    pub fn insert(&mut self, a: &PersonnelId, b: &PersonnelId) -> bool {
        if a == b {
            return false;
        }
        self.edges.insert(Self::canonical(a, b))
    }

    pub fn remove(&mut self, a: &PersonnelId, b: &PersonnelId) -> bool {
        self.edges.remove(&Self::canonical(a, b))
    }

    pub fn contains(&self, a: &PersonnelId, b: &PersonnelId) -> bool {
        a != b && self.edges.contains(&Self::canonical(a, b))
    }

    /// Personnes incompatibles avec `id`, dans les deux sens.
    pub fn partners_of<'a>(&'a self, id: &'a PersonnelId) -> impl Iterator<Item = &'a PersonnelId> + 'a {
        self.edges.iter().filter_map(move |(a, b)| {
            if a == id {
                Some(b)
            } else if b == id {
                Some(a)
            } else {
                None
            }
        })
    }

    /// Retire toutes les arêtes touchant `id`.
    pub fn detach(&mut self, id: &PersonnelId) {
        self.edges.retain(|(a, b)| a != id && b != id);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl From<Vec<(PersonnelId, PersonnelId)>> for Incompatibilities {
    fn from(pairs: Vec<(PersonnelId, PersonnelId)>) -> Self {
        let mut out = Self::default();
        for (a, b) in &pairs {
            out.insert(a, b);
        }
        out
    }
}

impl From<Incompatibilities> for Vec<(PersonnelId, PersonnelId)> {
    fn from(inc: Incompatibilities) -> Self {
        inc.edges.into_iter().collect()
    }
}

/// Garde enregistrée (une personne, un poste, un intervalle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDuty {
    pub id: DutyId,
    pub personnel: PersonnelId,
    pub post: PostId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl GuardDuty {
    /// Crée une garde en validant que `end > start`.
    pub fn new(
        personnel: PersonnelId,
        post: PostId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, String> {
        if end <= start {
            return Err("end must be strictly after start".to_string());
        }
        Ok(Self {
            id: DutyId::random(),
            personnel,
            post,
            start,
            end,
        })
    }
}

/// Membre affecté, tel que restitué dans une affectation générée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPersonnel {
    pub id: PersonnelId,
    pub name: String,
}

/// Affectation produite par le moteur : un poste, une équipe, un créneau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyAssignment {
    pub post_id: PostId,
    pub post: String,
    pub personnel: Vec<AssignedPersonnel>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Créneau demandé, en heures murales (`"HH:MM"`), sans date.
///
/// Les champs sont optionnels : un créneau incomplet est ignoré individuellement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl TimeWindow {
    pub fn new<S: Into<String>, E: Into<String>>(start: S, end: E) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}
