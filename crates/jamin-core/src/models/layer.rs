use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Persisted collaborator recording attached to a theme.
///
/// Immutable once created by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LayerRecord {
    pub id: Uuid,
    pub theme_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub instrument: Option<String>,
    pub tempo: i32,
    pub description: Option<String>,
    pub audio_url: String,
    pub content_type: String,
    pub file_size: i64,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload handed to the layer store once the upload has succeeded.
#[derive(Debug, Clone)]
pub struct NewLayerRecord {
    pub theme_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub instrument: Option<String>,
    pub tempo: i32,
    pub description: Option<String>,
    pub audio_url: String,
    pub content_type: String,
    pub file_size: i64,
    pub duration_seconds: Option<f64>,
}

/// Descriptive fields submitted alongside the layer recording
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct LayerForm {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(max = 100, message = "Instrument must be at most 100 characters"))]
    pub instrument: Option<String>,
    pub tempo: i32,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

impl LayerForm {
    /// Build a form from raw multipart text values.
    ///
    /// Blank optional fields become `None`; tempo is parsed with [`parse_tempo`].
    pub fn from_raw(
        title: Option<String>,
        instrument: Option<String>,
        tempo: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            title: title.map(|t| t.trim().to_string()).unwrap_or_default(),
            instrument: non_blank(instrument),
            tempo: parse_tempo(tempo.as_deref()),
            description: non_blank(description),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lenient tempo parsing: leading integer digits are used, anything unparseable is 0.
///
/// No range is enforced; the parsed value is stored as given.
///
/// `"120"` -> 120, `"96 bpm"` -> 96, `"abc"` -> 0, missing -> 0.
pub fn parse_tempo(raw: Option<&str>) -> i32 {
    let Some(raw) = raw else {
        return 0;
    };
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    leading.parse::<i32>().map(|v| v * sign).unwrap_or(0)
}

/// Success body of the add-layer endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLayerResponse {
    pub success: bool,
    pub message: String,
    pub redirect_to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tempo_lenient() {
        assert_eq!(parse_tempo(Some("120")), 120);
        assert_eq!(parse_tempo(Some(" 96 bpm")), 96);
        assert_eq!(parse_tempo(Some("abc")), 0);
        assert_eq!(parse_tempo(Some("")), 0);
        assert_eq!(parse_tempo(Some("-5")), -5);
        assert_eq!(parse_tempo(None), 0);
    }

    #[test]
    fn test_form_from_raw_trims_and_drops_blanks() {
        let form = LayerForm::from_raw(
            Some("  Bass line ".to_string()),
            Some("   ".to_string()),
            Some("not a number".to_string()),
            None,
        );
        assert_eq!(form.title, "Bass line");
        assert_eq!(form.instrument, None);
        assert_eq!(form.tempo, 0);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_form_requires_title() {
        let form = LayerForm::from_raw(None, None, None, None);
        let err = form.validate().unwrap_err();
        assert!(err.field_errors().contains_key("title"));
    }

    #[test]
    fn test_form_accepts_any_parsed_tempo() {
        for (raw, expected) in [("500", 500), ("-5", -5), ("1000 bpm", 1000)] {
            let form = LayerForm::from_raw(
                Some("Drums".to_string()),
                None,
                Some(raw.to_string()),
                None,
            );
            assert_eq!(form.tempo, expected);
            assert!(form.validate().is_ok(), "tempo {raw:?} should be accepted");
        }
    }

    #[test]
    fn test_add_layer_response_is_camel_case() {
        let body = AddLayerResponse {
            success: true,
            message: "Layer added".to_string(),
            redirect_to: "/themes/abc".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["redirectTo"], "/themes/abc");
    }
}
