//! The planning orchestrator.
//!
//! # Overview
//!
//! One [`PlanningEngine::plan`] call is a pure function of its snapshot:
//! it builds one capacity tracker per active roster member, walks epics in
//! priority order, orders each epic's stories through the dependency
//! resolver, and runs each story's SA→DEV→QA pipeline against the
//! trackers. Independent work lands in parallel across assignees simply
//! because each assignee has their own ledger.
//!
//! # Pipeline Rule
//!
//! Phases of one story are strictly sequential: a later phase starts no
//! earlier than one workday after the previous phase's end. A phase with
//! zero hours is simply absent. Blocked-by edges push a story's earliest
//! start to one workday after each already-scheduled blocker's end,
//! resolved against a running `story key → end date` map populated epic by
//! epic — blockers not yet scheduled impose no constraint.
//!
//! # Failure Semantics
//!
//! Nothing per-item aborts a run. Missing estimates, missing roles, and
//! flagged stories degrade to warnings in the result. Only snapshot
//! validation (before the run) and ledger contract violations (a bug)
//! return `Err`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use cadence_core::calendar::WorkCalendar;
use cadence_core::capacity::AssigneeCapacityTracker;
use cadence_core::config::PlanConfig;
use cadence_core::error::InputError;
use cadence_core::model::{Epic, Phase, PhaseHours, Status, Story, TeamMember};
use cadence_core::round2;

use crate::report::{
    Assignee, AssigneeUtilization, PhaseSchedule, PlanResult, PlannedEpic, PlannedStory,
    RoleAggregate, Warning,
};
use crate::resolve;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything one planning run consumes, pre-fetched by the caller.
///
/// No I/O happens mid-computation; re-running with an identical snapshot
/// must reproduce an identical result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// The injected "today" — the engine never reads the wall clock.
    pub today: NaiveDate,
    pub members: Vec<TeamMember>,
    /// Absence dates per account id, already expanded per day by the caller.
    #[serde(default)]
    pub absences: BTreeMap<String, BTreeSet<NaiveDate>>,
    pub epics: Vec<Epic>,
    pub stories: Vec<Story>,
}

impl PlanSnapshot {
    /// Validate the snapshot before a run starts.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] for malformed roster entries (empty or
    /// duplicate account ids, negative hours-per-day) or negative story
    /// phase hours.
    pub fn validate(&self) -> Result<(), InputError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.members.len());
        for member in &self.members {
            if member.account_id.is_empty() {
                return Err(InputError::EmptyAccountId);
            }
            if !seen.insert(&member.account_id) {
                return Err(InputError::DuplicateAccountId {
                    account_id: member.account_id.clone(),
                });
            }
            if member.hours_per_day < Decimal::ZERO {
                return Err(InputError::NegativeHoursPerDay {
                    account_id: member.account_id.clone(),
                    hours: member.hours_per_day,
                });
            }
        }
        for story in &self.stories {
            if story.hours.sa < Decimal::ZERO
                || story.hours.dev < Decimal::ZERO
                || story.hours.qa < Decimal::ZERO
            {
                return Err(InputError::NegativePhaseHours {
                    key: story.key.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlanningEngine
// ---------------------------------------------------------------------------

/// Stateless orchestrator — trackers are built fresh on every call, so one
/// engine instance may be reused (or shared across threads with per-team
/// snapshots) without runs bleeding into each other.
#[derive(Debug, Clone, Default)]
pub struct PlanningEngine {
    config: PlanConfig,
}

impl PlanningEngine {
    #[must_use]
    pub const fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Compute a full schedule for the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid config or snapshot, or if the
    /// internal capacity contract is violated mid-run (a bug, not bad
    /// input). Per-item problems never error — they become warnings.
    #[instrument(skip_all, fields(
        epics = snapshot.epics.len(),
        stories = snapshot.stories.len(),
        members = snapshot.members.len(),
    ))]
    pub fn plan(&self, snapshot: &PlanSnapshot, calendar: &dyn WorkCalendar) -> Result<PlanResult> {
        self.config.validate().context("invalid plan config")?;
        snapshot.validate().context("invalid planning snapshot")?;

        let mut trackers = build_trackers(snapshot);
        let mut warnings: Vec<Warning> = Vec::new();
        // Running story key → end date map, populated epic by epic.
        let mut completed: HashMap<String, NaiveDate> = HashMap::new();
        let mut epics_out: Vec<PlannedEpic> = Vec::new();

        for epic in ordered_epics(&snapshot.epics) {
            let epic_stories: Vec<Story> = snapshot
                .stories
                .iter()
                .filter(|s| s.epic_key == epic.key)
                .cloned()
                .collect();

            let planned = self.plan_epic(
                epic,
                &epic_stories,
                &mut trackers,
                &mut completed,
                &mut warnings,
                snapshot.today,
                calendar,
            )?;
            epics_out.push(planned);
        }

        debug!(warnings = warnings.len(), "planning run complete");
        Ok(PlanResult {
            epics: epics_out,
            warnings,
            utilization: utilization(&trackers),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_epic(
        &self,
        epic: &Epic,
        epic_stories: &[Story],
        trackers: &mut [AssigneeCapacityTracker],
        completed: &mut HashMap<String, NaiveDate>,
        warnings: &mut Vec<Warning>,
        today: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> Result<PlannedEpic> {
        // Done stories are skipped silently; flagged ones warn.
        let mut schedulable: Vec<Story> = Vec::with_capacity(epic_stories.len());
        for story in epic_stories {
            if story.status.is_done() {
                continue;
            }
            if story.flagged {
                warnings.push(Warning::flagged(&story.key));
                continue;
            }
            schedulable.push(story.clone());
        }

        let resolved = resolve::order_stories(&schedulable);
        if resolved.has_cycles() {
            warn!(
                epic = %epic.key,
                cycles = ?resolved.cycles,
                "dependency cycles broken by priority order"
            );
        }
        let by_key: HashMap<&str, &Story> =
            schedulable.iter().map(|s| (s.key.as_str(), s)).collect();

        let mut stories_out: Vec<PlannedStory> = Vec::with_capacity(resolved.order.len());
        for key in &resolved.order {
            let Some(&story) = by_key.get(key.as_str()) else {
                continue;
            };
            let planned = self.plan_story(
                epic, story, trackers, completed, warnings, today, calendar,
            )?;
            stories_out.push(planned);
        }

        Ok(aggregate_epic(epic, epic_stories, stories_out))
    }

    /// Run one story's phase pipeline. Mutates the chosen trackers and the
    /// completed-story map.
    #[allow(clippy::too_many_arguments)]
    fn plan_story(
        &self,
        epic: &Epic,
        story: &Story,
        trackers: &mut [AssigneeCapacityTracker],
        completed: &mut HashMap<String, NaiveDate>,
        warnings: &mut Vec<Warning>,
        today: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> Result<PlannedStory> {
        let hours = self.derive_hours(epic, story);
        if hours.is_empty() {
            let warning = Warning::no_estimate(&story.key);
            warnings.push(warning.clone());
            return Ok(PlannedStory {
                key: story.key.clone(),
                phases: Vec::new(),
                start: None,
                end: None,
                warnings: vec![warning],
            });
        }
        let hours = hours.buffered(self.config.risk_buffer);

        // Earliest permissible start: the later of "today" and one workday
        // past every blocker already scheduled in this run.
        let mut cursor = today;
        for blocker in &story.blocked_by {
            if let Some(&end) = completed.get(blocker) {
                cursor = cursor.max(calendar.next_workday(end));
            }
        }

        let mut phases: Vec<PhaseSchedule> = Vec::new();
        let mut story_warnings: Vec<Warning> = Vec::new();
        for phase in Phase::ALL {
            let phase_hours = hours.get(phase);
            if phase_hours <= Decimal::ZERO {
                continue;
            }
            let role = phase.role();

            // Earliest-available tracker of the matching role; ties go to
            // the lowest account id so runs stay reproducible.
            let pick = trackers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.role() == role)
                .min_by(|(_, a), (_, b)| {
                    a.first_available_date(cursor, calendar)
                        .cmp(&b.first_available_date(cursor, calendar))
                        .then_with(|| a.account_id().cmp(b.account_id()))
                })
                .map(|(idx, _)| idx);

            let Some(idx) = pick else {
                let warning = Warning::no_capacity(&story.key, role);
                warnings.push(warning.clone());
                story_warnings.push(warning);
                phases.push(PhaseSchedule {
                    phase,
                    assignee: None,
                    start: None,
                    end: None,
                    hours: phase_hours,
                    no_capacity: true,
                });
                continue;
            };

            let tracker = &mut trackers[idx];
            let alloc = tracker
                .allocate(phase_hours, cursor, calendar)
                .with_context(|| format!("allocating {phase} phase of {}", story.key))?;
            phases.push(PhaseSchedule {
                phase,
                assignee: Some(Assignee {
                    account_id: tracker.account_id().to_string(),
                    display_name: tracker.display_name().to_string(),
                }),
                start: Some(alloc.start),
                end: Some(alloc.end),
                hours: alloc.hours,
                no_capacity: false,
            });
            cursor = calendar.next_workday(alloc.end);
        }

        let start = phases.iter().filter_map(|p| p.start).min();
        let end = phases.iter().filter_map(|p| p.end).max();
        if let Some(end) = end {
            completed.insert(story.key.clone(), end);
        }

        Ok(PlannedStory {
            key: story.key.clone(),
            phases,
            start,
            end,
            warnings: story_warnings,
        })
    }

    /// Subtask-derived hours, or the rough epic-level split when a
    /// `Planned` epic's story has none.
    fn derive_hours(&self, epic: &Epic, story: &Story) -> PhaseHours {
        if story.hours.is_empty() && epic.status == Status::Planned {
            self.config.rough_estimate.as_phase_hours()
        } else {
            story.hours
        }
    }
}

// ---------------------------------------------------------------------------
// Run assembly helpers
// ---------------------------------------------------------------------------

/// One tracker per active roster member, sorted by account id, absences
/// applied. Built fresh for every run.
fn build_trackers(snapshot: &PlanSnapshot) -> Vec<AssigneeCapacityTracker> {
    let mut members: Vec<&TeamMember> = snapshot.members.iter().filter(|m| m.active).collect();
    members.sort_by(|a, b| a.account_id.cmp(&b.account_id));

    members
        .into_iter()
        .map(|member| {
            let mut tracker = AssigneeCapacityTracker::from_member(member);
            if let Some(dates) = snapshot.absences.get(&member.account_id) {
                tracker.block_absences(dates.iter().copied());
            }
            tracker
        })
        .collect()
}

/// Plannable epics in priority order (score descending, key ascending).
fn ordered_epics(epics: &[Epic]) -> Vec<&Epic> {
    let mut ordered: Vec<&Epic> = epics.iter().filter(|e| e.status.is_plannable()).collect();
    ordered.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.key.cmp(&b.key))
    });
    ordered
}

/// Aggregate one epic: story date span, per-role totals, progress
/// pass-through (summed over all of the epic's stories, done ones included).
fn aggregate_epic(epic: &Epic, epic_stories: &[Story], stories: Vec<PlannedStory>) -> PlannedEpic {
    let start = stories.iter().filter_map(|s| s.start).min();
    let end = stories.iter().filter_map(|s| s.end).max();

    let roles = Phase::ALL
        .iter()
        .map(|&phase| {
            let schedules = stories
                .iter()
                .flat_map(|s| s.phases.iter())
                .filter(|p| p.phase == phase);
            let mut hours = Decimal::ZERO;
            let mut role_start: Option<NaiveDate> = None;
            let mut role_end: Option<NaiveDate> = None;
            for schedule in schedules {
                hours += schedule.hours;
                role_start = merge_min(role_start, schedule.start);
                role_end = merge_max(role_end, schedule.end);
            }
            RoleAggregate {
                role: phase.role(),
                hours: round2(hours),
                start: role_start,
                end: role_end,
            }
        })
        .collect();

    let logged_seconds: u64 = epic_stories.iter().map(|s| s.logged_seconds).sum();
    let estimate_seconds: u64 = epic_stories.iter().map(|s| s.estimate_seconds).sum();
    let progress_pct = if estimate_seconds == 0 {
        Decimal::ZERO
    } else {
        round2(Decimal::from(logged_seconds) * Decimal::from(100) / Decimal::from(estimate_seconds))
    };

    PlannedEpic {
        key: epic.key.clone(),
        start,
        end,
        roles,
        stories,
        logged_seconds,
        estimate_seconds,
        progress_pct,
    }
}

fn merge_min(current: Option<NaiveDate>, candidate: Option<NaiveDate>) -> Option<NaiveDate> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn merge_max(current: Option<NaiveDate>, candidate: Option<NaiveDate>) -> Option<NaiveDate> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Per-assignee utilization snapshot from the final tracker states.
fn utilization(trackers: &[AssigneeCapacityTracker]) -> Vec<AssigneeUtilization> {
    trackers
        .iter()
        .map(|t| AssigneeUtilization {
            account_id: t.account_id().to_string(),
            display_name: t.display_name().to_string(),
            role: t.role(),
            total_hours: t.total_assigned(),
            daily_load: t.daily_load().clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
