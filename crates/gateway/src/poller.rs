//! Background survey polling.

use std::{collections::HashSet, sync::Arc, time::Duration};

use {
    quotabot_purespectrum::{ChangeDetector, ProviderError, SurveyProvider},
    quotabot_subscriptions::Broadcaster,
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

/// Run one polling round.
///
/// The first successful round only records a baseline. Later rounds
/// broadcast each detected change to the survey's subscribers, if it has
/// any. Returns the number of events broadcast.
pub async fn poll_once(
    provider: &dyn SurveyProvider,
    detector: &mut ChangeDetector,
    broadcaster: &Broadcaster,
) -> Result<usize, ProviderError> {
    let surveys = provider.list_surveys().await?;
    if !detector.is_primed() {
        detector.prime(&surveys);
        debug!(count = surveys.len(), "poller baseline recorded");
        return Ok(0);
    }

    let events = detector.detect(&surveys);
    if events.is_empty() {
        return Ok(0);
    }

    let subscribed: HashSet<String> = broadcaster.store().surveys().into_iter().collect();
    let mut sent = 0;
    for event in events
        .iter()
        .filter(|event| subscribed.contains(&event.survey_id))
    {
        let report = broadcaster.broadcast(&event.survey_id, &event.to_text()).await;
        debug!(
            survey_id = %event.survey_id,
            attempted = report.attempted,
            "change broadcast"
        );
        sent += 1;
    }
    Ok(sent)
}

/// Spawn the polling loop. A zero interval disables polling.
pub fn spawn_poller(
    provider: Arc<dyn SurveyProvider>,
    broadcaster: Broadcaster,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    info!(interval_secs = interval.as_secs(), "survey poller started");
    Some(tokio::spawn(async move {
        let mut detector = ChangeDetector::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = poll_once(provider.as_ref(), &mut detector, &broadcaster).await {
                warn!(error = %e, "survey poll failed");
            }
        }
    }))
}
