use crate::catalog::Catalog;
use crate::model::{Personnel, PersonnelId, TagKind, TimeWindow};
use crate::scheduler::Schedule;
use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Import de personnel depuis CSV :
/// header `first_name,last_name[,personal_id][,functionalities][,restrictions]`.
///
/// Les tags sont séparés par `;` et créés s'ils n'existent pas.
pub fn import_personnel_csv<P: AsRef<Path>>(
    path: P,
    catalog: &mut Catalog,
) -> anyhow::Result<Vec<PersonnelId>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let first = rec.get(0).context("missing first_name")?.trim();
        let last = rec.get(1).context("missing last_name")?.trim();
        if first.is_empty() || last.is_empty() {
            bail!("invalid personnel row (empty name)");
        }
        let mut person = Personnel::new(first, last);
        if let Some(pid) = rec.get(2).map(str::trim).filter(|s| !s.is_empty()) {
            person.personal_id = Some(pid.to_string());
        }
        for name in tag_list(rec.get(3)) {
            person
                .functionalities
                .insert(catalog.ensure_tag(TagKind::Functionality, name));
        }
        for name in tag_list(rec.get(4)) {
            person
                .restrictions
                .insert(catalog.ensure_tag(TagKind::Restriction, name));
        }
        out.push(catalog.insert_personnel(person, &[]));
    }
    Ok(out)
}

fn tag_list(field: Option<&str>) -> impl Iterator<Item = &str> {
    field
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Corps d'une demande de génération : `{"shift_times": [{"start", "end"}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftRequest {
    #[serde(default)]
    pub shift_times: Vec<TimeWindow>,
}

/// Créneaux d'une demande ; une liste vide est acceptée, l'appelant peut la compléter.
pub fn load_request<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TimeWindow>> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let request: ShiftRequest = serde_json::from_slice(&data)
        .with_context(|| format!("parsing request {}", path.display()))?;
    Ok(request.shift_times)
}

/// `"HH:MM-HH:MM"` → créneau. Sans séparateur, la fin manque et le créneau
/// sera ignoré à la normalisation.
pub fn parse_window_spec(raw: &str) -> TimeWindow {
    match raw.split_once('-') {
        Some((start, end)) => TimeWindow::new(start.trim(), end.trim()),
        None => TimeWindow {
            start: Some(raw.trim().to_string()),
            end: None,
        },
    }
}

/// Date-heure ISO sans fuseau, secondes facultatives.
pub fn parse_instant(raw: &str) -> anyhow::Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .with_context(|| format!("invalid ISO timestamp: {raw}"))
}

/// Ligne à plat d'une affectation générée (une par personne).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub post: String,
    pub personnel_id: String,
    pub personnel_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Rapport de génération : affectations à plat et avertissements lisibles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generated_shifts: Vec<ReportRow>,
    pub warnings: Vec<String>,
}

impl From<&Schedule> for GenerationReport {
    fn from(schedule: &Schedule) -> Self {
        let generated_shifts = schedule
            .assignments
            .iter()
            .flat_map(|a| {
                a.personnel.iter().map(move |p| ReportRow {
                    post: a.post.clone(),
                    personnel_id: p.id.as_str().to_string(),
                    personnel_name: p.name.clone(),
                    start_time: a.start,
                    end_time: a.end,
                })
            })
            .collect();
        Self {
            generated_shifts,
            warnings: schedule.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Export JSON du rapport (jolie mise en forme)
pub fn export_schedule_json<P: AsRef<Path>>(path: P, schedule: &Schedule) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(&GenerationReport::from(schedule))?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV des affectations : header `post,personnel_id,personnel_name,start,end`
pub fn export_assignments_csv<P: AsRef<Path>>(path: P, schedule: &Schedule) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["post", "personnel_id", "personnel_name", "start", "end"])?;
    for a in &schedule.assignments {
        let start = a.start.format("%Y-%m-%dT%H:%M:%S").to_string();
        let end = a.end.format("%Y-%m-%dT%H:%M:%S").to_string();
        for p in &a.personnel {
            w.write_record([
                a.post.as_str(),
                p.id.as_str(),
                p.name.as_str(),
                start.as_str(),
                end.as_str(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spec_splits_on_dash() {
        assert_eq!(parse_window_spec("22:00-06:00"), TimeWindow::new("22:00", "06:00"));
        assert_eq!(parse_window_spec("22:00").end, None);
    }

    #[test]
    fn instant_accepts_optional_seconds() {
        let a = parse_instant("2025-10-01T08:00").unwrap();
        let b = parse_instant("2025-10-01T08:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_instant("08:00").is_err());
    }
}
