//! Analysis service response
//!
//! Every field is optional. Missing fields are degraded data, not errors;
//! callers fall back to prior or default values. A field of the wrong type
//! decodes as missing instead of failing the whole reply, and so does a
//! landmark without numeric coordinates.

use serde::{Deserialize, Serialize};

/// Warning label meaning nobody is visible in the frame
pub const NO_PERSON_WARNING: &str = "no_person";

/// Event label marking a completed repetition
pub const REP_COMPLETED_EVENT: &str = "rep_completed";

/// A normalized 2D body-joint position; x and y are in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One analyzed frame as returned by the pose-analysis service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    /// Preferred rep count
    #[serde(deserialize_with = "lenient::count")]
    pub rep_count: Option<u32>,
    /// Alternate rep count, used when `rep_count` is absent
    #[serde(deserialize_with = "lenient::count")]
    pub count: Option<u32>,
    /// Coarse movement phase
    #[serde(deserialize_with = "lenient::text")]
    pub stage: Option<String>,
    /// Tracked joint angle in degrees
    #[serde(deserialize_with = "lenient::number")]
    pub angle: Option<f64>,
    /// Warning label (see [`NO_PERSON_WARNING`])
    #[serde(deserialize_with = "lenient::text")]
    pub warning: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub feedback: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub guidance: Option<String>,
    /// Ordered landmarks; `None` entries are points the service could not place
    #[serde(deserialize_with = "lenient::landmarks")]
    pub landmarks: Option<Vec<Option<Landmark>>>,
    /// Event label (see [`REP_COMPLETED_EVENT`])
    #[serde(deserialize_with = "lenient::text")]
    pub event: Option<String>,
}

impl AnalysisResult {
    /// Reported rep count, preferring `rep_count` over `count`
    pub fn reported_reps(&self) -> Option<u32> {
        self.rep_count.or(self.count)
    }

    /// Stage label, or `None` when missing or empty
    pub fn stage_label(&self) -> Option<&str> {
        self.stage.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether the service flagged that no person is visible
    pub fn is_no_person(&self) -> bool {
        self.warning.as_deref() == Some(NO_PERSON_WARNING)
    }

    pub fn is_rep_completed(&self) -> bool {
        self.event.as_deref() == Some(REP_COMPLETED_EVENT)
    }

    /// Landmarks when at least one entry is present
    pub fn drawable_landmarks(&self) -> Option<&[Option<Landmark>]> {
        match self.landmarks.as_deref() {
            Some(points) if !points.is_empty() => Some(points),
            _ => None,
        }
    }
}

/// Per-field decoders that map unexpected JSON types to `None`
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Landmark;

    pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Some(n) = value.as_u64() {
            return Ok(u32::try_from(n).ok());
        }
        // Whole-number floats such as 3.0 are accepted
        Ok(value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u32))
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_f64())
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_str().map(str::to_string))
    }

    pub fn landmarks<'de, D>(deserializer: D) -> Result<Option<Vec<Option<Landmark>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_array()
            .map(|points| points.iter().map(point).collect()))
    }

    fn point(value: &Value) -> Option<Landmark> {
        let x = value.get("x")?.as_f64()?;
        let y = value.get("y")?.as_f64()?;
        Some(Landmark::new(x as f32, y as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_object() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result, AnalysisResult::default());
        assert!(result.reported_reps().is_none());
        assert!(!result.is_no_person());
        assert!(result.drawable_landmarks().is_none());
    }

    #[test]
    fn test_parse_full_packet() {
        let json = serde_json::json!({
            "rep_count": 4,
            "stage": "up",
            "angle": 42.5,
            "feedback": "Good depth",
            "guidance": "Keep elbows tucked",
            "event": "rep_completed",
            "landmarks": [{"x": 0.1, "y": 0.2, "z": -0.3, "visibility": 0.9}, null],
            "model": "ignored"
        })
        .to_string();

        let result: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result.reported_reps(), Some(4));
        assert_eq!(result.stage.as_deref(), Some("up"));
        assert!((result.angle.unwrap() - 42.5).abs() < 1e-9);
        assert!(result.is_rep_completed());

        let points = result.drawable_landmarks().unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].unwrap().x - 0.1).abs() < 1e-6);
        assert!(points[1].is_none());
    }

    #[test]
    fn test_alternate_count_field() {
        let result: AnalysisResult = serde_json::from_str(r#"{"count": 7}"#).unwrap();
        assert_eq!(result.reported_reps(), Some(7));

        let both: AnalysisResult =
            serde_json::from_str(r#"{"rep_count": 3, "count": 9}"#).unwrap();
        assert_eq!(both.reported_reps(), Some(3));
    }

    #[test]
    fn test_no_person_warning() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"warning": "no_person", "landmarks": []}"#).unwrap();
        assert!(result.is_no_person());
        assert!(result.drawable_landmarks().is_none());
    }

    #[test]
    fn test_whole_float_count_keeps_other_fields() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"rep_count": 3.0, "stage": "up", "feedback": "ok"}"#).unwrap();
        assert_eq!(result.reported_reps(), Some(3));
        assert_eq!(result.stage_label(), Some("up"));
        assert_eq!(result.feedback.as_deref(), Some("ok"));

        let fractional: AnalysisResult = serde_json::from_str(r#"{"rep_count": 2.5, "count": 2}"#).unwrap();
        assert_eq!(fractional.rep_count, None);
        assert_eq!(fractional.reported_reps(), Some(2));
    }

    #[test]
    fn test_mistyped_fields_decode_as_missing() {
        let json = serde_json::json!({
            "rep_count": "four",
            "count": -1,
            "stage": 7,
            "angle": "wide",
            "warning": ["no_person"],
            "feedback": {"text": "hi"},
            "guidance": null,
            "event": true,
            "landmarks": "none"
        })
        .to_string();

        let result: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn test_bad_landmark_becomes_absent_point() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{"rep_count": 3, "landmarks": [{"x": null, "y": 0.2}, {"x": 0.5, "y": 0.5}, {"y": 0.1}, 4]}"#,
        )
        .unwrap();

        assert_eq!(result.reported_reps(), Some(3));
        let points = result.drawable_landmarks().unwrap();
        assert_eq!(
            points,
            &[None, Some(Landmark::new(0.5, 0.5)), None, None][..]
        );
    }

    #[test]
    fn test_empty_stage_has_no_label() {
        let result = AnalysisResult {
            stage: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(result.stage_label(), None);
    }
}
