//! End-to-end planning scenarios over the public API.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cadence_core::calendar::WeekdayCalendar;
use cadence_core::config::PlanConfig;
use cadence_core::model::{Epic, PhaseHours, Role, Status, Story, TeamMember};
use cadence_plan::report::WarningKind;
use cadence_plan::{PlanSnapshot, PlanningEngine};

/// Route engine tracing through the test writer so `--nocapture` shows it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// 2026-08-24, a Monday.
fn monday() -> NaiveDate {
    date(2026, 8, 24)
}

fn member(id: &str, name: &str, role: Role, hours: Decimal) -> TeamMember {
    TeamMember {
        account_id: id.to_string(),
        display_name: name.to_string(),
        role,
        hours_per_day: hours,
        active: true,
    }
}

fn epic(key: &str, score: Decimal) -> Epic {
    Epic {
        key: key.to_string(),
        priority_score: score,
        status: Status::InProgress,
        due_date: None,
    }
}

fn story(key: &str, epic_key: &str, score: Decimal, sa: Decimal, dev: Decimal, qa: Decimal) -> Story {
    Story {
        key: key.to_string(),
        epic_key: epic_key.to_string(),
        priority_score: score,
        status: Status::New,
        flagged: false,
        blocked_by: Vec::new(),
        hours: PhaseHours::new(sa, dev, qa, key).expect("non-negative"),
        logged_seconds: 0,
        estimate_seconds: 0,
    }
}

fn snapshot(members: Vec<TeamMember>, epics: Vec<Epic>, stories: Vec<Story>) -> PlanSnapshot {
    init_tracing();
    PlanSnapshot {
        today: monday(),
        members,
        absences: BTreeMap::new(),
        epics,
        stories,
    }
}

/// Engine without a risk buffer so scenario arithmetic stays exact.
fn unbuffered_engine() -> PlanningEngine {
    PlanningEngine::new(PlanConfig {
        risk_buffer: Decimal::ZERO,
        ..PlanConfig::default()
    })
}

#[test]
fn sa_and_dev_pipeline_over_three_days() {
    // 1 SA @ 8h, 1 DEV @ 8h; S1 needs SA=4h, DEV=16h; today = Monday.
    // Expected: SA Mon–Mon (4h), DEV Tue–Wed (16h over two full days).
    let snap = snapshot(
        vec![
            member("sa1", "Sana", Role::Sa, dec!(8)),
            member("dev1", "Devi", Role::Dev, dec!(8)),
        ],
        vec![epic("ep-1", dec!(10))],
        vec![story("st-1", "ep-1", dec!(10), dec!(4), dec!(16), Decimal::ZERO)],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    let phases = &result.epics[0].stories[0].phases;
    assert_eq!(phases.len(), 2);

    let sa = &phases[0];
    assert_eq!(sa.start, Some(monday()));
    assert_eq!(sa.end, Some(monday()));
    assert_eq!(sa.hours, dec!(4));

    let dev = &phases[1];
    assert_eq!(dev.start, Some(date(2026, 8, 25)));
    assert_eq!(dev.end, Some(date(2026, 8, 26)));
    assert_eq!(dev.hours, dec!(16));

    // The SA still has 4h free that Monday.
    let sa_util = result
        .utilization
        .iter()
        .find(|u| u.account_id == "sa1")
        .expect("sa utilization");
    assert_eq!(sa_util.daily_load[&monday()], dec!(4));
}

#[test]
fn two_sa_phases_split_one_day() {
    // Two stories each needing SA=4h against a single 8h SA: both phases
    // land on the same Monday, no overflow to Tuesday.
    let snap = snapshot(
        vec![member("sa1", "Sana", Role::Sa, dec!(8))],
        vec![epic("ep-1", dec!(10))],
        vec![
            story("st-1", "ep-1", dec!(20), dec!(4), Decimal::ZERO, Decimal::ZERO),
            story("st-2", "ep-1", dec!(10), dec!(4), Decimal::ZERO, Decimal::ZERO),
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    for planned in &result.epics[0].stories {
        assert_eq!(planned.start, Some(monday()), "{}", planned.key);
        assert_eq!(planned.end, Some(monday()), "{}", planned.key);
    }
    let util = &result.utilization[0];
    assert_eq!(util.daily_load[&monday()], dec!(8));
    assert_eq!(util.daily_load.len(), 1);
}

#[test]
fn blocked_story_starts_next_workday_after_blocker_end() {
    // st-1 runs Mon–Wed (SA 4h + DEV 16h). st-2 is blocked by st-1, so its
    // earliest start is Thursday even though the SA is free from Tuesday.
    let mut blocked = story("st-2", "ep-1", dec!(50), dec!(4), Decimal::ZERO, Decimal::ZERO);
    blocked.blocked_by = vec!["st-1".to_string()];
    let snap = snapshot(
        vec![
            member("sa1", "Sana", Role::Sa, dec!(8)),
            member("dev1", "Devi", Role::Dev, dec!(8)),
        ],
        vec![epic("ep-1", dec!(10))],
        vec![
            story("st-1", "ep-1", dec!(10), dec!(4), dec!(16), Decimal::ZERO),
            blocked,
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    let stories = &result.epics[0].stories;
    let st1 = stories.iter().find(|s| s.key == "st-1").expect("st-1");
    let st2 = stories.iter().find(|s| s.key == "st-2").expect("st-2");
    assert_eq!(st1.end, Some(date(2026, 8, 26)), "st-1 ends Wednesday");
    assert_eq!(st2.start, Some(date(2026, 8, 27)), "st-2 starts Thursday");
}

#[test]
fn blocker_ending_friday_pushes_dependent_to_monday() {
    // DEV 40h fills Mon–Fri; the dependent story's SA starts next Monday.
    let mut blocked = story("st-2", "ep-1", dec!(50), dec!(4), Decimal::ZERO, Decimal::ZERO);
    blocked.blocked_by = vec!["st-1".to_string()];
    let snap = snapshot(
        vec![
            member("sa1", "Sana", Role::Sa, dec!(8)),
            member("dev1", "Devi", Role::Dev, dec!(8)),
        ],
        vec![epic("ep-1", dec!(10))],
        vec![
            story("st-1", "ep-1", dec!(10), Decimal::ZERO, dec!(40), Decimal::ZERO),
            blocked,
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    let stories = &result.epics[0].stories;
    let st2 = stories.iter().find(|s| s.key == "st-2").expect("st-2");
    assert_eq!(st2.start, Some(date(2026, 8, 31)), "next Monday");
}

#[test]
fn zero_estimate_story_yields_warning_and_null_dates() {
    let snap = snapshot(
        vec![member("dev1", "Devi", Role::Dev, dec!(8))],
        vec![epic("ep-1", dec!(10))],
        vec![story("st-1", "ep-1", dec!(10), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    let planned = &result.epics[0].stories[0];
    assert_eq!(planned.start, None);
    assert_eq!(planned.end, None);
    assert!(planned.phases.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::NoEstimate);
    assert_eq!(result.warnings[0].issue_key, "st-1");
    // The story echoes its own warning alongside the flat list.
    assert_eq!(planned.warnings, result.warnings);
}

#[test]
fn missing_role_yields_no_capacity_phase() {
    // SA phase required with zero SA members on the roster.
    let snap = snapshot(
        vec![member("dev1", "Devi", Role::Dev, dec!(8))],
        vec![epic("ep-1", dec!(10))],
        vec![story("st-1", "ep-1", dec!(10), dec!(4), dec!(8), Decimal::ZERO)],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    let phases = &result.epics[0].stories[0].phases;
    let sa = &phases[0];
    assert!(sa.no_capacity);
    assert_eq!(sa.start, None);
    assert_eq!(sa.end, None);
    assert!(sa.assignee.is_none());
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::NoCapacity && w.issue_key == "st-1")
    );
    let planned = &result.epics[0].stories[0];
    assert!(
        planned
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::NoCapacity && w.issue_key == "st-1")
    );
    // The DEV phase still gets scheduled; the run never aborts.
    let dev = &phases[1];
    assert_eq!(dev.start, Some(monday()));
}

#[test]
fn risk_buffer_inflates_phase_hours() {
    // 4h SA with a 20% buffer becomes 4.8h.
    let engine = PlanningEngine::new(PlanConfig {
        risk_buffer: dec!(0.2),
        ..PlanConfig::default()
    });
    let snap = snapshot(
        vec![member("sa1", "Sana", Role::Sa, dec!(8))],
        vec![epic("ep-1", dec!(10))],
        vec![story("st-1", "ep-1", dec!(10), dec!(4), Decimal::ZERO, Decimal::ZERO)],
    );
    let result = engine.plan(&snap, &WeekdayCalendar).expect("plan");
    let sa = &result.epics[0].stories[0].phases[0];
    assert_eq!(sa.hours, dec!(4.8));
    assert_eq!(result.utilization[0].daily_load[&monday()], dec!(4.8));
}

#[test]
fn higher_priority_epic_is_planned_first() {
    // Both epics compete for the same DEV; the higher-priority epic's story
    // gets Monday, the other follows.
    let snap = snapshot(
        vec![member("dev1", "Devi", Role::Dev, dec!(8))],
        vec![epic("ep-low", dec!(10)), epic("ep-high", dec!(90))],
        vec![
            story("st-low", "ep-low", dec!(10), Decimal::ZERO, dec!(8), Decimal::ZERO),
            story("st-high", "ep-high", dec!(10), Decimal::ZERO, dec!(8), Decimal::ZERO),
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    assert_eq!(result.epics[0].key, "ep-high");
    assert_eq!(result.epics[0].stories[0].start, Some(monday()));
    assert_eq!(result.epics[1].stories[0].start, Some(date(2026, 8, 25)));
}

#[test]
fn independent_stories_run_in_parallel_across_assignees() {
    // Two DEVs, two independent 8h stories: both land on Monday.
    let snap = snapshot(
        vec![
            member("dev1", "Devi", Role::Dev, dec!(8)),
            member("dev2", "Dova", Role::Dev, dec!(8)),
        ],
        vec![epic("ep-1", dec!(10))],
        vec![
            story("st-1", "ep-1", dec!(20), Decimal::ZERO, dec!(8), Decimal::ZERO),
            story("st-2", "ep-1", dec!(10), Decimal::ZERO, dec!(8), Decimal::ZERO),
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    for planned in &result.epics[0].stories {
        assert_eq!(planned.start, Some(monday()), "{}", planned.key);
        assert_eq!(planned.end, Some(monday()), "{}", planned.key);
    }
}

#[test]
fn cross_epic_blocker_constrains_later_epic() {
    // st-b in the lower-priority epic depends on st-a from the higher one.
    let mut blocked = story("st-b", "ep-2", dec!(10), Decimal::ZERO, dec!(8), Decimal::ZERO);
    blocked.blocked_by = vec!["st-a".to_string()];
    let snap = snapshot(
        vec![
            member("dev1", "Devi", Role::Dev, dec!(8)),
            member("dev2", "Dova", Role::Dev, dec!(8)),
        ],
        vec![epic("ep-1", dec!(90)), epic("ep-2", dec!(10))],
        vec![
            story("st-a", "ep-1", dec!(10), Decimal::ZERO, dec!(16), Decimal::ZERO),
            blocked,
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    // st-a runs Mon–Tue on dev1; st-b waits for Wednesday even though dev2
    // is idle from Monday.
    let ep2 = result.epics.iter().find(|e| e.key == "ep-2").expect("ep-2");
    assert_eq!(ep2.stories[0].start, Some(date(2026, 8, 26)));
}

#[test]
fn full_run_is_deterministic_across_invocations() {
    init_tracing();
    let mut flagged = story("st-4", "ep-2", dec!(40), dec!(2), dec!(2), dec!(2));
    flagged.flagged = true;
    let mut blocked = story("st-2", "ep-1", dec!(30), dec!(2), dec!(6), dec!(2));
    blocked.blocked_by = vec!["st-1".to_string()];

    let mut absences = BTreeMap::new();
    absences.insert(
        "dev1".to_string(),
        [date(2026, 8, 25)].into_iter().collect(),
    );
    let snap = PlanSnapshot {
        today: monday(),
        members: vec![
            member("sa1", "Sana", Role::Sa, dec!(7.5)),
            member("dev1", "Devi", Role::Dev, dec!(8)),
            member("dev2", "Dova", Role::Dev, dec!(6.4)),
            member("qa1", "Quinn", Role::Qa, dec!(8)),
        ],
        absences,
        epics: vec![epic("ep-1", dec!(80)), epic("ep-2", dec!(40))],
        stories: vec![
            story("st-1", "ep-1", dec!(50), dec!(4), dec!(16), dec!(4)),
            blocked,
            story("st-3", "ep-2", dec!(20), dec!(3), dec!(9), dec!(3)),
            flagged,
        ],
    };

    let engine = PlanningEngine::new(PlanConfig::default());
    let first = engine.plan(&snap, &WeekdayCalendar).expect("plan");
    let second = engine.plan(&snap, &WeekdayCalendar).expect("plan");

    let a = serde_json::to_string(&first).expect("serialize");
    let b = serde_json::to_string(&second).expect("serialize");
    assert_eq!(a, b, "identical snapshot must reproduce identical output");
}

#[test]
fn phase_pipeline_invariant_holds_over_a_mixed_run() {
    // SA end < DEV start and DEV end < QA start for every scheduled story.
    let snap = snapshot(
        vec![
            member("sa1", "Sana", Role::Sa, dec!(8)),
            member("dev1", "Devi", Role::Dev, dec!(8)),
            member("qa1", "Quinn", Role::Qa, dec!(8)),
        ],
        vec![epic("ep-1", dec!(10))],
        vec![
            story("st-1", "ep-1", dec!(30), dec!(4), dec!(12), dec!(4)),
            story("st-2", "ep-1", dec!(20), dec!(2), dec!(6), dec!(2)),
            story("st-3", "ep-1", dec!(10), dec!(8), dec!(8), dec!(8)),
        ],
    );
    let result = unbuffered_engine()
        .plan(&snap, &WeekdayCalendar)
        .expect("plan");

    for planned in &result.epics[0].stories {
        for pair in planned.phases.windows(2) {
            let earlier_end = pair[0].end.expect("scheduled");
            let later_start = pair[1].start.expect("scheduled");
            assert!(
                earlier_end < later_start,
                "{}: {:?} must end before {:?} starts",
                planned.key,
                pair[0].phase,
                pair[1].phase,
            );
        }
    }
}
