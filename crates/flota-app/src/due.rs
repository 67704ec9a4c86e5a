// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Maintenance due-status engine.
//!
//! Every active plan on a vehicle that is not retired is classified against a reference
//! date. The result feeds the dashboard, the report table, and both email digests, so all
//! of them agree on which plans need attention and in which order.

use time::Date;

use crate::ids::LookupId;
use crate::model::{Document, MaintenancePlan, PlanStatus, Vehicle};

/// A plan is due soon when its due date is at most this many days away.
pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Never performed.
    Pending,
    Current,
    /// `remaining_days` is 0 when the plan is due today.
    DueSoon { remaining_days: i64 },
    Overdue { overdue_days: i64 },
}

impl DueState {
    /// Pending and overdue plans go into reports and emails.
    pub const fn needs_attention(self) -> bool {
        matches!(self, Self::Pending | Self::Overdue { .. })
    }

    pub const fn overdue_days(self) -> i64 {
        match self {
            Self::Overdue { overdue_days } => overdue_days,
            Self::Pending | Self::Current | Self::DueSoon { .. } => 0,
        }
    }

    pub const fn urgency(self) -> Urgency {
        match self {
            Self::Pending => Urgency::Never,
            other => Urgency::Days(other.overdue_days()),
        }
    }

    /// Spanish status label used in reports and digests.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Overdue { .. } => "Vencido",
            Self::Current | Self::DueSoon { .. } => "En Plazo",
        }
    }
}

/// Ranking key. A never-performed plan outranks any finite overdue count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Days(i64),
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEvaluation<'a> {
    pub plan: &'a MaintenancePlan,
    pub vehicle: &'a Vehicle,
    pub last_performed: Option<Date>,
    pub due_date: Option<Date>,
    pub state: DueState,
}

impl PlanEvaluation<'_> {
    pub fn urgency(&self) -> Urgency {
        self.state.urgency()
    }
}

/// Classify from the last performed date alone. A zero period never comes due, even
/// for a plan that has never been performed.
pub fn classify(
    last_performed: Option<Date>,
    period_days: u32,
    today: Date,
) -> (DueState, Option<Date>) {
    if period_days == 0 {
        return (DueState::Current, None);
    }
    let Some(last) = last_performed else {
        return (DueState::Pending, None);
    };

    let Some(due) = last.checked_add(time::Duration::days(i64::from(period_days))) else {
        return (DueState::Current, None);
    };

    if today > due {
        let overdue_days = (today - due).whole_days();
        return (DueState::Overdue { overdue_days }, Some(due));
    }

    let remaining_days = (due - today).whole_days();
    if remaining_days <= DUE_SOON_DAYS {
        return (DueState::DueSoon { remaining_days }, Some(due));
    }
    (DueState::Current, Some(due))
}

/// Latest history date for a plan; the first entry in document order wins a tie.
pub fn last_performed(document: &Document, plan: &MaintenancePlan) -> Option<Date> {
    document
        .history_for_plan(&plan.id)
        .map(|entry| entry.date)
        .fold(None, |latest, date| match latest {
            Some(current) if current >= date => Some(current),
            _ => Some(date),
        })
}

/// `None` for inactive plans and plans whose vehicle is missing or retired.
pub fn evaluate_plan<'a>(
    document: &'a Document,
    plan: &'a MaintenancePlan,
    today: Date,
) -> Option<PlanEvaluation<'a>> {
    if plan.status != PlanStatus::Active {
        return None;
    }
    let vehicle = document.vehicle(&plan.vehicle_id)?;
    if vehicle.status.is_retired() {
        return None;
    }

    let last_performed = last_performed(document, plan);
    let (state, due_date) = classify(last_performed, plan.period_days, today);
    Some(PlanEvaluation {
        plan,
        vehicle,
        last_performed,
        due_date,
        state,
    })
}

/// Every evaluable plan, in document order.
pub fn evaluate_all(document: &Document, today: Date) -> Vec<PlanEvaluation<'_>> {
    document
        .maintenance_plans
        .iter()
        .filter_map(|plan| evaluate_plan(document, plan, today))
        .collect()
}

/// Plans on vehicles of one system, or every plan when `system` is `None`.
pub fn evaluate_scope<'a>(
    document: &'a Document,
    system: Option<&LookupId>,
    today: Date,
) -> Vec<PlanEvaluation<'a>> {
    evaluate_all(document, today)
        .into_iter()
        .filter(|evaluation| match system {
            Some(system) => evaluation.vehicle.system_id.as_ref() == Some(system),
            None => true,
        })
        .collect()
}

/// Most urgent first. The sort is stable, so equal urgencies keep document order.
pub fn sort_by_urgency(evaluations: &mut [PlanEvaluation<'_>]) {
    evaluations.sort_by(|left, right| right.urgency().cmp(&left.urgency()));
}

/// Plans needing attention within a scope, most urgent first.
pub fn attention_list<'a>(
    document: &'a Document,
    system: Option<&LookupId>,
    today: Date,
) -> Vec<PlanEvaluation<'a>> {
    let mut evaluations = evaluate_scope(document, system, today)
        .into_iter()
        .filter(|evaluation| evaluation.state.needs_attention())
        .collect::<Vec<_>>();
    sort_by_urgency(&mut evaluations);
    evaluations
}

#[cfg(test)]
mod tests {
    use super::{DueState, Urgency, classify};
    use time::macros::date;

    #[test]
    fn thirty_day_period_classifies_by_reference_date() {
        let last = Some(date!(2025 - 01 - 01));

        let (state, due) = classify(last, 30, date!(2025 - 02 - 05));
        assert_eq!(due, Some(date!(2025 - 01 - 31)));
        assert_eq!(state, DueState::Overdue { overdue_days: 5 });

        let (state, _) = classify(last, 30, date!(2025 - 01 - 28));
        assert_eq!(state, DueState::DueSoon { remaining_days: 3 });

        let (state, _) = classify(last, 30, date!(2025 - 01 - 20));
        assert_eq!(state, DueState::Current);
    }

    #[test]
    fn due_today_is_due_soon_with_zero_days() {
        let (state, _) = classify(Some(date!(2025 - 01 - 01)), 30, date!(2025 - 01 - 31));
        assert_eq!(state, DueState::DueSoon { remaining_days: 0 });
    }

    #[test]
    fn due_soon_window_is_inclusive() {
        let (state, _) = classify(Some(date!(2025 - 01 - 01)), 30, date!(2025 - 01 - 24));
        assert_eq!(state, DueState::DueSoon { remaining_days: 7 });
        let (state, _) = classify(Some(date!(2025 - 01 - 01)), 30, date!(2025 - 01 - 23));
        assert_eq!(state, DueState::Current);
    }

    #[test]
    fn zero_period_is_always_current() {
        for today in [date!(1990 - 01 - 01), date!(2025 - 01 - 01), date!(2099 - 12 - 31)] {
            let (state, due) = classify(Some(date!(2000 - 01 - 01)), 0, today);
            assert_eq!(state, DueState::Current);
            assert!(due.is_none());
        }
        let (state, _) = classify(None, 0, date!(2025 - 01 - 01));
        assert_eq!(state, DueState::Current);
    }

    #[test]
    fn no_history_is_pending() {
        let (state, due) = classify(None, 30, date!(2025 - 01 - 01));
        assert_eq!(state, DueState::Pending);
        assert!(due.is_none());
        assert!(state.needs_attention());
    }

    #[test]
    fn pending_outranks_any_finite_overdue_count() {
        assert!(Urgency::Never > Urgency::Days(i64::MAX));
        assert!(Urgency::Never > Urgency::Days(9999));
        assert!(DueState::Pending.urgency() > DueState::Overdue { overdue_days: 100_000 }.urgency());
    }

    #[test]
    fn labels_fold_due_soon_into_in_time() {
        assert_eq!(DueState::Pending.label(), "Pendiente");
        assert_eq!(DueState::Overdue { overdue_days: 2 }.label(), "Vencido");
        assert_eq!(DueState::DueSoon { remaining_days: 1 }.label(), "En Plazo");
        assert_eq!(DueState::Current.label(), "En Plazo");
        assert!(!DueState::DueSoon { remaining_days: 1 }.needs_attention());
    }
}
