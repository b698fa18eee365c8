//! Aggregate-level tests for the GOP state machine

use domain_gop::lifecycle::submit;
use domain_gop::{Decision, DecisionInput, GopError, GopEvent, GopPatch, GopStatus, GuaranteeOfPayment};
use core_kernel::GopId;
use proptest::prelude::*;
use test_utils::{
    assert_closed, assert_hidden, assert_state, assert_validation, DecisionBuilder, GopDraftBuilder, PartyFixtures,
    UserFixtures,
};

fn pending_gop() -> GuaranteeOfPayment {
    let changes = GopDraftBuilder::new().patch().into_changes().unwrap();
    let new_gop = submit(
        &UserFixtures::provider_a(),
        &PartyFixtures::provider_a(),
        &PartyFixtures::payer_a(),
        &PartyFixtures::member(),
        Some(&PartyFixtures::doctor_a()),
        None,
        changes,
    )
    .unwrap();
    GuaranteeOfPayment::from_new(GopId::new(1), new_gop)
}

fn approved_gop() -> GuaranteeOfPayment {
    let mut gop = pending_gop();
    let decision = Decision::try_from(DecisionBuilder::approve().build()).unwrap();
    gop.decide(&UserFixtures::payer_a(), decision).unwrap();
    gop
}

fn quotation_patch(raw: &str) -> GopPatch {
    GopDraftBuilder::new().quotation(raw).patch()
}

#[test]
fn test_submit_starts_pending_with_doctor_name() {
    let gop = pending_gop();

    assert_state(&gop, GopStatus::Pending, false);
    assert!(!gop.is_final);
    assert_eq!(gop.content.doctor_name.as_deref(), Some("Dr. Wong"));
    assert!(gop.edited_at.is_none());
}

#[test]
fn test_submit_to_uncontracted_payer_is_hidden() {
    let changes = GopPatch::default().into_changes().unwrap();
    let result = submit(
        &UserFixtures::provider_a(),
        &PartyFixtures::provider_a(),
        &PartyFixtures::payer_b(),
        &PartyFixtures::member(),
        None,
        None,
        changes,
    );
    assert_hidden(result);
}

#[test]
fn test_submit_with_foreign_doctor_is_hidden() {
    let changes = GopPatch::default().into_changes().unwrap();
    let result = submit(
        &UserFixtures::provider_a(),
        &PartyFixtures::provider_a(),
        &PartyFixtures::payer_a(),
        &PartyFixtures::member(),
        Some(&PartyFixtures::doctor_b()),
        None,
        changes,
    );
    assert_hidden(result);
}

#[test]
fn test_first_payer_view_moves_to_review_once() {
    let mut gop = pending_gop();
    let payer = UserFixtures::payer_a();

    let first = gop.record_payer_view(&payer).unwrap();
    assert!(first.changed);
    assert!(matches!(first.event, Some(GopEvent::ReviewStarted { .. })));
    assert_state(&gop, GopStatus::InReview, false);
    assert!(gop.content.medical_details.is_some());
    let reviewed_at = gop.edited_at;

    let second = gop.record_payer_view(&payer).unwrap();
    assert!(!second.changed);
    assert!(second.event.is_none());
    assert_eq!(gop.edited_at, reviewed_at);
}

#[test]
fn test_other_payer_cannot_open_request() {
    let mut gop = pending_gop();
    assert_hidden(gop.record_payer_view(&UserFixtures::payer_b()));
    assert_state(&gop, GopStatus::Pending, false);
}

#[test]
fn test_decline_without_reason_is_rejected() {
    for reason in [None, Some(""), Some("   ")] {
        let result = Decision::try_from(DecisionBuilder::decline(reason).build());
        assert_validation(result, "reason_decline");
    }
}

#[test]
fn test_non_decision_status_is_rejected() {
    for status in ["pending", "in review", "closed"] {
        let input = DecisionInput {
            status: status.to_string(),
            reason_decline: None,
            stamp_author: Some("Dr. Reviewer".into()),
        };
        assert_validation(Decision::try_from(input), "status");
    }
}

#[test]
fn test_decide_straight_from_pending() {
    let mut gop = pending_gop();
    let decision = Decision::try_from(DecisionBuilder::decline(Some("Not covered")).build()).unwrap();

    let event = gop.decide(&UserFixtures::payer_a(), decision).unwrap();

    assert_eq!(event.counterpart(), Some(domain_gop::Counterpart::Provider));
    assert_state(&gop, GopStatus::Declined, false);
    assert_eq!(gop.reason_decline.as_deref(), Some("Not covered"));
    assert_eq!(gop.stamp_author.as_deref(), Some("Dr. Reviewer"));
    assert!(gop.turnaround_time().is_some());
}

#[test]
fn test_decide_needs_a_reviewer_name() {
    let mut gop = pending_gop();
    let payer = UserFixtures::payer_a();
    let decision = Decision::try_from(DecisionBuilder::approve().without_stamp_author().build()).unwrap();

    assert_validation(gop.decide(&payer, decision.clone()), "stamp_author");
    assert_state(&gop, GopStatus::Pending, false);

    gop.set_stamp_author(&payer, "Dr. Lee").unwrap();
    gop.decide(&payer, decision).unwrap();
    assert_state(&gop, GopStatus::Approved, false);
    assert_eq!(gop.stamp_author.as_deref(), Some("Dr. Lee"));
}

#[test]
fn test_second_decision_is_an_invalid_transition() {
    let mut gop = approved_gop();
    let decision = Decision::try_from(DecisionBuilder::decline(Some("Changed mind")).build()).unwrap();

    let result = gop.decide(&UserFixtures::payer_a(), decision);
    assert!(matches!(result, Err(GopError::InvalidTransition { .. })));
    assert_state(&gop, GopStatus::Approved, false);
}

#[test]
fn test_foreign_tenant_cannot_mutate() {
    let mut gop = pending_gop();
    let before = gop.clone();
    let decision = Decision::try_from(DecisionBuilder::approve().build()).unwrap();

    assert_hidden(gop.decide(&UserFixtures::payer_b(), decision));
    assert_hidden(gop.edit(&UserFixtures::provider_b(), GopPatch::default().into_changes().unwrap(), true));
    assert_hidden(gop.resend(&UserFixtures::provider_b()));
    assert_hidden(gop.close(&UserFixtures::provider_b(), "duplicate"));
    // the payer of the request is not its provider
    assert_hidden(gop.close(&UserFixtures::payer_a(), "duplicate"));

    assert_eq!(gop, before);
}

#[test]
fn test_closed_request_rejects_every_mutation() {
    let mut gop = approved_gop();
    let provider = UserFixtures::provider_a();
    let payer = UserFixtures::payer_a();

    gop.close(&provider, "patient discharged").unwrap();
    let closed = gop.clone();

    assert_closed(gop.edit(&provider, quotation_patch("99").into_changes().unwrap(), false));
    assert_closed(gop.resend(&provider));
    assert_closed(gop.set_stamp_author(&payer, "Dr. Lee"));
    let decision = Decision::try_from(DecisionBuilder::approve().build()).unwrap();
    assert_closed(gop.decide(&payer, decision));
    assert!(matches!(
        gop.close(&provider, "again"),
        Err(GopError::InvalidTransition { .. })
    ));

    assert_eq!(gop, closed);
    assert!(gop.closed);
    assert_eq!(gop.reason_close.as_deref(), Some("patient discharged"));
}

#[test]
fn test_close_needs_a_reason() {
    let mut gop = pending_gop();
    assert_validation(gop.close(&UserFixtures::provider_a(), "  "), "reason_close");
    assert!(!gop.closed);
}

#[test]
fn test_edit_reopens_decided_request_until_final() {
    let mut gop = approved_gop();
    let provider = UserFixtures::provider_a();

    let event = gop
        .edit(&provider, quotation_patch("2,000").into_changes().unwrap(), false)
        .unwrap();
    assert!(matches!(event, GopEvent::Edited { reopened: true, finalized: false, .. }));
    assert_state(&gop, GopStatus::Pending, false);
    assert_eq!(gop.content.financials.quotation.to_string(), "2000.00");

    let decision = Decision::try_from(DecisionBuilder::approve().build()).unwrap();
    gop.decide(&UserFixtures::payer_a(), decision).unwrap();
    let event = gop
        .edit(&provider, quotation_patch("2,100").into_changes().unwrap(), true)
        .unwrap();
    assert!(matches!(event, GopEvent::Edited { reopened: true, finalized: true, .. }));
    assert!(event.emails_payer());
    assert!(gop.is_final);
    // finalising a decided estimate still sends it back for a fresh decision
    assert_state(&gop, GopStatus::Pending, false);

    // once final, a decision sticks through further edits
    let decision = Decision::try_from(DecisionBuilder::approve().build()).unwrap();
    gop.decide(&UserFixtures::payer_a(), decision).unwrap();
    let event = gop
        .edit(&provider, quotation_patch("2,200").into_changes().unwrap(), true)
        .unwrap();
    assert!(matches!(event, GopEvent::Edited { reopened: false, finalized: false, .. }));
    assert_state(&gop, GopStatus::Approved, false);
}

#[test]
fn test_resend_puts_request_back_in_queue() {
    let mut gop = approved_gop();
    let submitted_at = gop.created_at;

    let event = gop.resend(&UserFixtures::provider_a()).unwrap();

    assert!(event.emails_payer());
    assert_state(&gop, GopStatus::Pending, false);
    assert!(gop.edited_at.is_none());
    assert!(gop.created_at >= submitted_at);
}

proptest! {
    #[test]
    fn prop_blank_decline_reason_never_accepted(reason in "[ \t\n]{0,6}") {
        let result = Decision::try_from(DecisionBuilder::decline(Some(&reason)).build());
        prop_assert!(matches!(result, Err(GopError::Validation { .. })), "expected a validation error");
    }

    #[test]
    fn prop_closed_request_is_frozen(quotation in "[0-9]{1,6}") {
        let mut gop = pending_gop();
        gop.close(&UserFixtures::provider_a(), "duplicate").unwrap();
        let frozen = gop.clone();

        let changes = quotation_patch(&quotation).into_changes().unwrap();
        prop_assert!(matches!(
            gop.edit(&UserFixtures::provider_a(), changes, true),
            Err(GopError::Closed(_))
        ), "closed request accepted an edit");
        prop_assert_eq!(gop, frozen);
    }
}
