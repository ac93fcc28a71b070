use crate::filter::Qualified;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Output record for one surviving film. Built once, serialized
/// immediately, never mutated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub title: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directors: Vec<String>,

    pub release_year: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_link: Option<String>,

    pub language: String,

    #[serde(skip_serializing_if = "is_false")]
    pub on_local_media: bool,

    pub runtime_mins: u32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streaming_on: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streaming_on_mine: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_millions: Option<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<&Qualified> for Recommendation {
    fn from(qualified: &Qualified) -> Self {
        let imdb_id = qualified.film.ids.imdb.clone();
        Self {
            title: qualified.film.title.clone(),
            directors: qualified.details.directors.clone(),
            release_year: qualified
                .details
                .release_year
                .unwrap_or(qualified.film.year),
            imdb_link: imdb_id
                .as_ref()
                .map(|id| format!("https://www.imdb.com/title/{}", id)),
            imdb_id,
            language: qualified.details.original_language.clone(),
            on_local_media: qualified.on_local_media,
            runtime_mins: qualified.details.runtime_mins,
            streaming_on: qualified.streaming.clone(),
            streaming_on_mine: qualified.streaming_mine.clone(),
            genres: qualified.details.genres.clone(),
            budget_millions: (qualified.details.budget > 0)
                .then(|| qualified.details.budget as f64 / 1_000_000.0),
        }
    }
}

/// Write one recommendation as its own pretty-printed document.
pub fn emit<W: Write>(recommendation: &Recommendation, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, recommendation)?;
    writeln!(out)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExternalIds, Film};
    use crate::metadata::MovieDetails;

    fn qualified() -> Qualified {
        Qualified {
            film: Film {
                title: "The Mission".to_string(),
                year: 1986,
                ids: ExternalIds {
                    imdb: Some("tt0091530".to_string()),
                    tmdb: Some("11416".to_string()),
                },
            },
            details: MovieDetails {
                id: 11416,
                title: "The Mission".to_string(),
                original_language: "en".to_string(),
                release_year: Some(1986),
                runtime_mins: 125,
                budget: 24_500_000,
                genres: vec!["Drama".to_string()],
                directors: vec!["Roland Joff\u{e9}".to_string()],
            },
            streaming: vec!["Netflix".to_string(), "Hulu".to_string()],
            streaming_mine: vec!["Netflix".to_string()],
            on_local_media: false,
        }
    }

    #[test]
    fn test_mapping_from_qualified() {
        let rec = Recommendation::from(&qualified());
        assert_eq!(rec.title, "The Mission");
        assert_eq!(rec.release_year, 1986);
        assert_eq!(
            rec.imdb_link.as_deref(),
            Some("https://www.imdb.com/title/tt0091530")
        );
        assert_eq!(rec.streaming_on_mine, vec!["Netflix"]);
        assert_eq!(rec.budget_millions, Some(24.5));
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let mut q = qualified();
        q.film.ids.imdb = None;
        q.details.budget = 0;
        q.streaming_mine.clear();
        let rec = Recommendation::from(&q);

        let mut buf = Vec::new();
        emit(&rec, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("\"title\""));
        assert!(!text.contains("imdb_id"));
        assert!(!text.contains("imdb_link"));
        assert!(!text.contains("budget_millions"));
        assert!(!text.contains("streaming_on_mine"));
        assert!(!text.contains("on_local_media"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_release_year_falls_back_to_catalog_year() {
        let mut q = qualified();
        q.details.release_year = None;
        assert_eq!(Recommendation::from(&q).release_year, 1986);
    }
}
