//! Autonomous booking scheduler -- ticks once per second, arms saved
//! windows ahead of their portal release instant, and fires a burst of
//! booking attempts the moment the clock hits the trigger second.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Timelike};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::library::booking::BookingClient;
use crate::store::{BookingProfile, BookingWindow, ProfileStore};

/// Lifecycle of one window on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirePhase {
    Idle,
    Armed,
    Firing,
    Succeeded,
    Exhausted,
}

/// Phase map key: a window fires at most once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FireKey {
    window_id: i64,
    date: NaiveDate,
}

/// Terminal result of one dispatched booking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Exhausted,
}

/// The work dispatched when a window fires.
///
/// Split out as a trait so the tick logic can be exercised without a
/// live portal behind it.
#[async_trait]
pub trait BookingRunner: Send + Sync {
    async fn run(&self, profile: &BookingProfile, window: &BookingWindow) -> RunOutcome;
}

/// Production runner: portal login followed by a burst of reservation
/// attempts against the profile's stored seat id.
pub struct PortalBookingRunner {
    client: BookingClient,
    attempts: u32,
}

impl PortalBookingRunner {
    pub fn new(client: BookingClient, attempts: u32) -> Self {
        Self { client, attempts }
    }
}

#[async_trait]
impl BookingRunner for PortalBookingRunner {
    async fn run(&self, profile: &BookingProfile, window: &BookingWindow) -> RunOutcome {
        let Some(seat_id) = profile.seat_id else {
            warn!(
                student = %profile.student_id,
                label = %profile.seat_label,
                "profile has no resolved seat id, skipping window"
            );
            return RunOutcome::Exhausted;
        };
        let auth = match self
            .client
            .login(&profile.student_id, &profile.password)
            .await
        {
            Ok(auth) => auth,
            Err(e) => {
                warn!(student = %profile.student_id, "portal login failed: {e}");
                return RunOutcome::Exhausted;
            }
        };

        let date = Local::now().format("%Y-%m-%d").to_string();
        let start = format!("{date} {}:00", window.start_time);
        let end = format!("{date} {}:00", window.end_time);

        // No pause between attempts; the release race is decided within
        // the first second after the window opens.
        for attempt in 1..=self.attempts {
            match self.client.attempt(seat_id, &start, &end, &auth).await {
                Ok(outcome) if outcome.success => {
                    info!(
                        student = %profile.student_id,
                        seat = seat_id,
                        attempt,
                        "seat booked: {}",
                        outcome.message
                    );
                    return RunOutcome::Succeeded;
                }
                Ok(outcome) => {
                    debug!(
                        student = %profile.student_id,
                        attempt,
                        "booking refused: {}",
                        outcome.message
                    );
                }
                Err(e) => {
                    warn!(student = %profile.student_id, attempt, "booking attempt failed: {e}");
                }
            }
        }
        warn!(
            student = %profile.student_id,
            seat = seat_id,
            attempts = self.attempts,
            "booking attempts exhausted"
        );
        RunOutcome::Exhausted
    }
}

/// Second-precision scheduler over the saved profiles and windows.
pub struct BookingScheduler {
    store: Arc<dyn ProfileStore>,
    runner: Arc<dyn BookingRunner>,
    lead_secs: u32,
    phases: Arc<Mutex<HashMap<FireKey, FirePhase>>>,
}

impl BookingScheduler {
    pub fn new(store: Arc<dyn ProfileStore>, runner: Arc<dyn BookingRunner>, lead_secs: u32) -> Self {
        Self {
            store,
            runner,
            lead_secs,
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs the scheduler until the task is dropped.
    ///
    /// The trigger match is an exact second comparison, so the process
    /// must be alive and ticking across the trigger instant; a window
    /// whose second passes unobserved stays idle until the next day.
    pub async fn run(&self) {
        info!(lead_secs = self.lead_secs, "booking scheduler started");
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_tick(Local::now()).await;
        }
    }

    /// One scheduler tick at the given wall-clock instant.
    async fn run_tick(&self, now: DateTime<Local>) {
        let profiles = match self.store.auto_enabled_profiles() {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("profile scan failed: {e:#}");
                return;
            }
        };

        let mut candidates = Vec::new();
        for profile in profiles {
            match self.store.active_windows(&profile.student_id) {
                Ok(windows) => {
                    for window in windows {
                        candidates.push((profile.clone(), window));
                    }
                }
                Err(e) => {
                    warn!(student = %profile.student_id, "window scan failed: {e:#}");
                }
            }
        }

        let today = now.date_naive();
        let mut phases = self.phases.lock().await;
        phases.retain(|key, _| key.date == today);

        for (profile, window) in candidates {
            let key = FireKey {
                window_id: window.id,
                date: today,
            };
            let phase = phases.get(&key).copied().unwrap_or(FirePhase::Idle);
            if matches!(
                phase,
                FirePhase::Firing | FirePhase::Succeeded | FirePhase::Exhausted
            ) {
                continue;
            }

            let Some(trigger) = trigger_time(&window.auto_start_time, self.lead_secs) else {
                warn!(
                    window = window.id,
                    raw = %window.auto_start_time,
                    "unparseable auto-start time"
                );
                continue;
            };

            if due_at(&now, trigger) {
                // Marked before the spawn so a second tick within the
                // same second cannot dispatch the window twice.
                phases.insert(key, FirePhase::Firing);
                info!(
                    student = %profile.student_id,
                    window = window.id,
                    slot = format!("{}-{}", window.start_time, window.end_time),
                    "window fired"
                );
                let runner = Arc::clone(&self.runner);
                let phases_map = Arc::clone(&self.phases);
                tokio::spawn(async move {
                    let outcome = runner.run(&profile, &window).await;
                    let phase = match outcome {
                        RunOutcome::Succeeded => FirePhase::Succeeded,
                        RunOutcome::Exhausted => FirePhase::Exhausted,
                    };
                    phases_map.lock().await.insert(key, phase);
                });
            } else if phase == FirePhase::Idle && trigger > now.time() {
                phases.insert(key, FirePhase::Armed);
                debug!(
                    student = %profile.student_id,
                    window = window.id,
                    trigger = %trigger,
                    "window armed"
                );
            }
        }
    }
}

/// Trigger instant for a window: the `HH:mm` release time minus the
/// lead, wrapping over midnight. `None` when the stored time is not
/// `HH:mm`.
fn trigger_time(auto_start: &str, lead_secs: u32) -> Option<NaiveTime> {
    let opens = NaiveTime::parse_from_str(auto_start, "%H:%M").ok()?;
    Some(opens - Duration::seconds(i64::from(lead_secs)))
}

/// Exact-second match between the clock and the trigger.
fn due_at(now: &DateTime<Local>, trigger: NaiveTime) -> bool {
    let t = now.time();
    t.hour() == trigger.hour() && t.minute() == trigger.minute() && t.second() == trigger.second()
}
