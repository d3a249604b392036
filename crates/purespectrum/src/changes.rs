use std::collections::HashMap;

use crate::types::{Survey, SurveyEvent};

pub const SURVEY_CREATED: &str = "surveyCreated";
pub const STATUS_UPDATE: &str = "statusUpdate";

/// Turns successive survey listings into change events.
///
/// A survey absent from the previous listing yields `surveyCreated`; a change
/// of status or completes yields `statusUpdate`. Surveys missing from the new
/// listing are forgotten.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: HashMap<String, Survey>,
    primed: bool,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a baseline without reporting anything.
    pub fn prime(&mut self, surveys: &[Survey]) {
        self.last = index(surveys);
        self.primed = true;
    }

    /// Whether a baseline listing has been recorded.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn detect(&mut self, current: &[Survey]) -> Vec<SurveyEvent> {
        let events = current
            .iter()
            .filter_map(|survey| {
                let event = match self.last.get(&survey.id) {
                    None => SURVEY_CREATED,
                    Some(previous)
                        if previous.status != survey.status
                            || previous.completes != survey.completes =>
                    {
                        STATUS_UPDATE
                    },
                    Some(_) => return None,
                };
                Some(SurveyEvent {
                    survey_id: survey.id.clone(),
                    event: Some(event.into()),
                    status: Some(survey.status.clone()),
                    completes: Some(survey.completes),
                    target: Some(survey.target),
                    updated_at: survey.updated_at.clone(),
                    ..Default::default()
                })
            })
            .collect();
        self.last = index(current);
        self.primed = true;
        events
    }
}

fn index(surveys: &[Survey]) -> HashMap<String, Survey> {
    surveys.iter().map(|s| (s.id.clone(), s.clone())).collect()
}
