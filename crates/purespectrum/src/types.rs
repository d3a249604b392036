use {
    serde::{Deserialize, Deserializer, Serialize},
    serde_json::Value,
};

/// Treat an explicit JSON `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Render a JSON scalar the way it reads on screen (`"abc"` → `abc`).
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Human-readable label for a PureSpectrum survey status code.
pub fn status_label(code: Option<i64>) -> String {
    match code {
        Some(22) => "Active".into(),
        Some(33) => "Paused".into(),
        Some(code) => format!("Status {code}"),
        None => "Unknown".into(),
    }
}

/// Numeric reading of a scalar: numbers as is, numeric strings parsed.
fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(scalar_number)
        .filter(|n| n.is_finite()))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_f64(deserializer)?.map(|n| n.round() as i64))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(lenient_u64(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(scalar_text))
}

/// Survey fields as returned by the buyer API. Field types vary between
/// accounts, so scalars are read leniently and mismatches become `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSurvey {
    ps_survey_id: Option<Value>,
    id: Option<Value>,
    #[serde(rename = "_id")]
    object_id: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    survey_title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    ps_survey_status: Option<i64>,
    #[serde(deserialize_with = "lenient_u64")]
    fielded: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    completes_required: Option<u64>,
    #[serde(deserialize_with = "lenient_f64")]
    average_cpi: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    expected_loi: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    expected_ir: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    current_incidence: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    current_cost: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    country_code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    survey_launch_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    project_last_complete_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    mod_on: Option<String>,
}

/// A survey normalised from the buyer API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub status: String,
    pub status_code: Option<i64>,
    pub completes: u64,
    pub target: u64,
    pub cpi: f64,
    pub loi: f64,
    /// Fraction, not percent (0.35 = 35%).
    pub incidence: f64,
    pub current_cost: f64,
    pub country_code: String,
    pub launch_date: Option<String>,
    pub updated_at: Option<String>,
}

impl Survey {
    /// Build a survey from one element of the surveys endpoint.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let raw: RawSurvey = serde_json::from_value(value)?;
        let id = [&raw.ps_survey_id, &raw.id, &raw.object_id]
            .into_iter()
            .flatten()
            .find_map(scalar_text)
            .unwrap_or_else(|| "unknown".into());
        let title = raw
            .survey_title
            .filter(|t| !t.is_empty())
            .or(raw.title)
            .unwrap_or_else(|| "Untitled".into());
        let incidence = raw
            .expected_ir
            .filter(|ir| *ir != 0.0)
            .or(raw.current_incidence)
            .unwrap_or_default();
        let updated_at = raw
            .project_last_complete_date
            .filter(|d| !d.is_empty())
            .or(raw.mod_on);

        Ok(Self {
            id,
            title,
            status: status_label(raw.ps_survey_status),
            status_code: raw.ps_survey_status,
            completes: raw.fielded.unwrap_or_default(),
            target: raw.completes_required.unwrap_or_default(),
            cpi: raw.average_cpi.unwrap_or_default(),
            loi: raw.expected_loi.unwrap_or_default(),
            incidence,
            current_cost: raw.current_cost.unwrap_or_default(),
            country_code: raw.country_code.unwrap_or_default(),
            launch_date: raw.survey_launch_date,
            updated_at,
        })
    }

    /// Completes as a percentage of target, `0.0` without a target.
    pub fn progress_pct(&self) -> f64 {
        percent(self.completes, self.target)
    }
}

pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Age bounds of a qualification, numbers or strings depending on survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSet {
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default)]
    pub to: Option<Value>,
}

/// One targeting criterion of a quota.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default, deserialize_with = "null_default")]
    pub qualification_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub condition_names: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub range_sets: Vec<RangeSet>,
}

/// A quota cell of a survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub ps_quota_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quota_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quota_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub achieved: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub required_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub current_target: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub currently_open: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub in_progress: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub criteria: Vec<Criterion>,
}

impl Quota {
    /// Group used to cluster quotas in listings.
    pub fn group(&self) -> &str {
        self.group_key
            .as_deref()
            .or(self.quota_category.as_deref())
            .unwrap_or("General")
    }

    pub fn progress_pct(&self) -> f64 {
        percent(self.achieved, self.required_count)
    }

    /// Readable name built from the quota's gender, age, and children
    /// criteria, falling back to its title or a short id.
    pub fn display_name(&self) -> String {
        if self.criteria.is_empty() {
            return self
                .quota_title
                .clone()
                .unwrap_or_else(|| "General Quota".into());
        }

        let parts: Vec<String> = self
            .criteria
            .iter()
            .filter_map(|criterion| match criterion.qualification_name.as_str() {
                "Gender" => criterion.condition_names.first().cloned(),
                "Age" => {
                    let range = criterion.range_sets.first()?;
                    let from = range.from.as_ref().and_then(scalar_text)?;
                    let to = range.to.as_ref().and_then(scalar_text)?;
                    Some(format!("{from}-{to} yr"))
                },
                "Children" => {
                    let condition = criterion.condition_names.first()?.to_lowercase();
                    if condition.contains("no children") {
                        Some("No Children".into())
                    } else if condition.contains("children") {
                        Some("Has Children".into())
                    } else {
                        None
                    }
                },
                _ => None,
            })
            .collect();

        if !parts.is_empty() {
            return parts.join(", ");
        }
        if let Some(title) = self.quota_title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        let id = self
            .ps_quota_id
            .as_ref()
            .and_then(scalar_text)
            .unwrap_or_default();
        format!("Quota {}", id.chars().take(8).collect::<String>())
    }
}

/// A survey change notification, pushed by PureSpectrum or produced by
/// polling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyEvent {
    pub survey_id: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub completes: Option<u64>,
    #[serde(default)]
    pub target: Option<u64>,
    #[serde(default)]
    pub incidence: Option<f64>,
    #[serde(default)]
    pub cpi: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SurveyEvent {
    /// One-line summary: `Survey 123 | event=statusUpdate | completes=50`.
    pub fn to_text(&self) -> String {
        let non_empty = |s: &Option<String>| s.as_deref().filter(|v| !v.is_empty()).map(str::to_string);
        let fields = [
            ("event", non_empty(&self.event)),
            ("status", non_empty(&self.status)),
            ("completes", self.completes.map(|v| v.to_string())),
            ("target", self.target.map(|v| v.to_string())),
            ("incidence", self.incidence.map(|v| v.to_string())),
            ("cpi", self.cpi.map(|v| v.to_string())),
            ("updatedAt", non_empty(&self.updated_at)),
        ];
        std::iter::once(format!("Survey {}", self.survey_id))
            .chain(
                fields
                    .into_iter()
                    .filter_map(|(name, value)| value.map(|v| format!("{name}={v}"))),
            )
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
