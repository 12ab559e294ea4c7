mod common;

use pretty_assertions::assert_eq;
use std::{sync::Arc, time::Duration};
use tokio::time::{advance, sleep, timeout};

use common::{tracker, Answer, FakeTrackerApi};
use match_ledger::{
    mutation::{DELETE_FAILURE, DELETE_SUCCESS, UPDATE_FAILURE, UPDATE_SUCCESS},
    DeleteOutcome, EditPhase, LedgerEvent, MatchId, MatchUpdate, MutationError, Severity, Side,
    TrackerView,
};

fn mid(id: &str) -> MatchId {
    MatchId::from(id)
}

async fn loaded(matches: usize) -> (Arc<FakeTrackerApi>, TrackerView) {
    let api = Arc::new(FakeTrackerApi::new().with_tournament("a", matches));
    let view = tracker(api.clone());
    view.initialize().await.unwrap();
    (api, view)
}

fn toast_messages(view: &TrackerView) -> Vec<(Severity, String)> {
    view.toasts()
        .visible()
        .into_iter()
        .map(|toast| (toast.severity, toast.message))
        .collect()
}

#[test_log::test(tokio::test)]
async fn test_edit_commits_and_refreshes_once() {
    let (api, view) = loaded(3).await;

    view.begin_edit(&mid("a-m0")).unwrap();
    assert_eq!(view.mutations().phase(), EditPhase::Editing);
    assert_eq!(view.mutations().adjust_goals(Side::Player1, 1), Some(3));
    assert!(view.mutations().set_half_length(5));
    view.commit_edit().await.unwrap();

    let stored = api.stored_match("a", "a-m0").unwrap();
    assert_eq!(
        (stored.player1_goals, stored.player2_goals, stored.half_length),
        (3, 1, 5)
    );
    assert_eq!(api.calls("update:a-m0"), 1);
    assert_eq!(api.calls("matches:a:1"), 2);
    assert_eq!(api.calls("standings:a"), 2);
    assert_eq!(
        toast_messages(&view),
        vec![(Severity::Success, UPDATE_SUCCESS.to_string())]
    );
    assert_eq!(view.mutations().phase(), EditPhase::Idle);
    assert!(view.mutations().intent().is_none());

    let shown = view.ledger().find(&mid("a-m0")).unwrap();
    assert_eq!(shown.score_line(), "3 - 1");
    assert_eq!(shown.half_length, 5);
}

#[test_log::test(tokio::test)]
async fn test_failed_edit_shows_error_and_skips_refresh() {
    let (api, view) = loaded(3).await;
    api.fail("update:a-m0");

    view.begin_edit(&mid("a-m0")).unwrap();
    view.mutations().adjust_goals(Side::Player2, 2);
    let result = view.commit_edit().await;

    assert!(matches!(result, Err(MutationError::Rejected(_))));
    assert!(view.mutations().last_error().unwrap().is_remote());
    assert_eq!(
        toast_messages(&view),
        vec![(Severity::Error, UPDATE_FAILURE.to_string())]
    );
    assert_eq!(api.calls("matches:a:1"), 1);
    assert_eq!(api.calls("standings:a"), 1);
    assert_eq!(view.mutations().phase(), EditPhase::Idle);
    assert_eq!(api.stored_match("a", "a-m0").unwrap().player2_goals, 1);
}

#[test_log::test(tokio::test)]
async fn test_goals_never_go_negative() {
    let (_api, view) = loaded(1).await;
    assert_eq!(view.mutations().adjust_goals(Side::Player1, 1), None);

    view.begin_edit(&mid("a-m0")).unwrap();
    assert_eq!(view.mutations().adjust_goals(Side::Player2, -1), Some(0));
    assert_eq!(view.mutations().adjust_goals(Side::Player2, -1), Some(0));
    assert_eq!(view.mutations().adjust_goals(Side::Player1, -5), Some(0));
    assert_eq!(view.mutations().adjust_goals(Side::Player1, 2), Some(2));
}

#[test_log::test(tokio::test)]
async fn test_commit_after_failed_page_fetch_refreshes_shown_page() {
    let (api, view) = loaded(45).await;
    api.fail("matches:a:2");
    assert!(view.change_page(2).await.is_err());

    view.begin_edit(&mid("a-m0")).unwrap();
    view.mutations().adjust_goals(Side::Player1, 1);
    view.commit_edit().await.unwrap();

    let snapshot = view.ledger().snapshot().unwrap();
    assert_eq!(snapshot.value.page, 1);
    assert_eq!(view.ledger().find(&mid("a-m0")).unwrap().player1_goals, 3);
    assert_eq!(api.calls("matches:a:1"), 2);
    assert_eq!(api.calls("matches:a:2"), 1);
}

#[test_log::test(tokio::test)]
async fn test_goals_can_be_set_outright() {
    let (api, view) = loaded(1).await;
    assert_eq!(view.mutations().set_goals(Side::Player1, 7), None);

    view.begin_edit(&mid("a-m0")).unwrap();
    assert_eq!(view.mutations().set_goals(Side::Player1, 3_000_000_000), Some(3_000_000_000));
    assert_eq!(view.mutations().set_goals(Side::Player2, 0), Some(0));
    view.commit_edit().await.unwrap();

    let stored = api.stored_match("a", "a-m0").unwrap();
    assert_eq!((stored.player1_goals, stored.player2_goals), (3_000_000_000, 0));
}

#[test_log::test(tokio::test)]
async fn test_unparsable_half_length_falls_back_to_default() {
    let (api, view) = loaded(1).await;
    view.begin_edit(&mid("a-m0")).unwrap();

    assert!(view.mutations().set_half_length_input("6"));
    assert_eq!(view.mutations().intent().unwrap().half_length, 6);
    assert!(view.mutations().set_half_length_input("abc"));
    assert_eq!(view.mutations().intent().unwrap().half_length, 4);
    assert!(view.mutations().set_half_length_input("5min"));
    assert_eq!(view.mutations().intent().unwrap().half_length, 5);

    // out of range values are sent as given
    view.mutations().set_half_length(9);
    view.commit_edit().await.unwrap();
    assert_eq!(api.stored_match("a", "a-m0").unwrap().half_length, 9);
}

#[test_log::test(tokio::test)]
async fn test_commit_without_edit_is_refused_quietly() {
    let (api, view) = loaded(1).await;

    assert_eq!(view.commit_edit().await, Err(MutationError::NotEditing));
    assert_eq!(api.calls("update:"), 0);
    assert!(view.toasts().visible().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_starting_another_edit_discards_the_first() {
    let (api, view) = loaded(3).await;

    view.begin_edit(&mid("a-m0")).unwrap();
    view.mutations().adjust_goals(Side::Player1, 4);
    view.begin_edit(&mid("a-m1")).unwrap();

    let intent = view.mutations().intent().unwrap();
    assert_eq!(intent.match_id, mid("a-m1"));
    assert_eq!((intent.player1_goals, intent.player2_goals), (2, 1));

    view.mutations().adjust_goals(Side::Player2, 1);
    view.commit_edit().await.unwrap();
    assert_eq!(api.calls("update:a-m0"), 0);
    assert_eq!(api.stored_match("a", "a-m0").unwrap().player1_goals, 2);
    assert_eq!(api.stored_match("a", "a-m1").unwrap().player2_goals, 2);
}

#[test_log::test(tokio::test)]
async fn test_cancel_edit_returns_to_idle() {
    let (api, view) = loaded(1).await;
    view.begin_edit(&mid("a-m0")).unwrap();
    view.mutations().cancel_edit();

    assert_eq!(view.mutations().phase(), EditPhase::Idle);
    assert_eq!(view.commit_edit().await, Err(MutationError::NotEditing));
    assert_eq!(api.calls("update:"), 0);
}

#[test_log::test(tokio::test)]
async fn test_edit_of_match_off_page_is_refused() {
    let (_api, view) = loaded(25).await;
    assert_eq!(
        view.begin_edit(&mid("a-m22")),
        Err(MutationError::UnknownMatch(mid("a-m22")))
    );
}

#[test_log::test(tokio::test)]
async fn test_delete_needs_a_yes() {
    let (api, view) = loaded(2).await;

    let no = Answer::no();
    assert_eq!(
        view.delete_match(&mid("a-m0"), &no).await,
        Ok(DeleteOutcome::Declined)
    );
    let dismissed = Answer::dismissed();
    assert_eq!(
        view.delete_match(&mid("a-m0"), &dismissed).await,
        Ok(DeleteOutcome::Declined)
    );

    assert_eq!(no.asked(), 1);
    assert_eq!(dismissed.asked(), 1);
    assert_eq!(api.calls("delete:"), 0);
    assert!(api.stored_match("a", "a-m0").is_some());
    assert!(view.toasts().visible().is_empty());
    assert_eq!(api.calls("matches:a:1"), 1);
}

#[test_log::test(tokio::test)]
async fn test_confirmed_delete_removes_match_and_refreshes() {
    let (api, view) = loaded(2).await;
    let yes = Answer::yes();

    assert_eq!(
        view.delete_match(&mid("a-m0"), &yes).await,
        Ok(DeleteOutcome::Deleted)
    );
    assert_eq!(api.calls("delete:a-m0"), 1);
    assert!(api.stored_match("a", "a-m0").is_none());
    assert!(view.ledger().find(&mid("a-m0")).is_none());
    assert_eq!(view.ledger().snapshot().unwrap().value.items.len(), 1);
    assert_eq!(api.calls("standings:a"), 2);
    assert_eq!(
        toast_messages(&view),
        vec![(Severity::Success, DELETE_SUCCESS.to_string())]
    );
}

#[test_log::test(tokio::test)]
async fn test_failed_delete_keeps_match() {
    let (api, view) = loaded(2).await;
    api.fail("delete:a-m0");

    let result = view.delete_match(&mid("a-m0"), &Answer::yes()).await;
    assert!(matches!(result, Err(MutationError::Rejected(_))));
    assert!(api.stored_match("a", "a-m0").is_some());
    assert!(view.ledger().find(&mid("a-m0")).is_some());
    assert_eq!(api.calls("matches:a:1"), 1);
    assert_eq!(
        toast_messages(&view),
        vec![(Severity::Error, DELETE_FAILURE.to_string())]
    );
}

#[test_log::test(tokio::test)]
async fn test_delete_only_clears_the_matching_edit() {
    let (_api, view) = loaded(3).await;

    view.begin_edit(&mid("a-m1")).unwrap();
    view.delete_match(&mid("a-m0"), &Answer::yes()).await.unwrap();
    assert_eq!(view.mutations().phase(), EditPhase::Editing);
    assert_eq!(view.mutations().intent().unwrap().match_id, mid("a-m1"));

    view.delete_match(&mid("a-m1"), &Answer::yes()).await.unwrap();
    assert_eq!(view.mutations().phase(), EditPhase::Idle);
}

#[test_log::test(tokio::test)]
async fn test_non_creator_cannot_change_matches() {
    let (api, view) = loaded(2).await;
    view.set_tournament_creator(false);
    let yes = Answer::yes();

    assert_eq!(
        view.delete_match(&mid("a-m0"), &yes).await,
        Err(MutationError::NotPermitted)
    );
    assert_eq!(yes.asked(), 0);
    assert_eq!(view.begin_edit(&mid("a-m0")), Err(MutationError::NotPermitted));
    assert_eq!(api.calls("delete:"), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_second_write_is_refused_while_one_is_in_flight() {
    let (api, view) = loaded(3).await;
    api.delay("update:a-m0", 500);
    view.begin_edit(&mid("a-m0")).unwrap();
    let yes = Answer::yes();

    let (first, (delete, edit)) = tokio::join!(view.commit_edit(), async {
        sleep(Duration::from_millis(10)).await;
        assert_eq!(view.mutations().phase(), EditPhase::Saving);
        let delete = view.delete_match(&mid("a-m1"), &yes).await;
        let edit = view.begin_edit(&mid("a-m2"));
        (delete, edit)
    });

    assert_eq!(first, Ok(()));
    assert_eq!(delete, Err(MutationError::Busy));
    assert_eq!(edit, Err(MutationError::Busy));
    assert_eq!(yes.asked(), 0);
    assert_eq!(api.calls("delete:"), 0);
    assert_eq!(view.mutations().phase(), EditPhase::Idle);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_abandoned_commit_releases_the_write_lock() {
    let (api, view) = loaded(2).await;
    api.delay("update:a-m0", 500);
    view.begin_edit(&mid("a-m0")).unwrap();

    assert!(timeout(Duration::from_millis(100), view.commit_edit())
        .await
        .is_err());
    assert_eq!(view.mutations().phase(), EditPhase::Idle);

    assert_eq!(
        view.delete_match(&mid("a-m1"), &Answer::yes()).await,
        Ok(DeleteOutcome::Deleted)
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_outcome_toast_expires() {
    let (_api, view) = loaded(1).await;
    view.begin_edit(&mid("a-m0")).unwrap();
    view.commit_edit().await.unwrap();
    assert_eq!(view.toasts().visible().len(), 1);

    advance(Duration::from_millis(2999)).await;
    assert_eq!(view.toasts().visible().len(), 1);
    advance(Duration::from_millis(2)).await;
    assert!(view.toasts().visible().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_other_subscribers_see_ledger_events() {
    let (_api, view) = loaded(2).await;
    let mut events = view.mutations().subscribe();

    view.begin_edit(&mid("a-m0")).unwrap();
    view.mutations().adjust_goals(Side::Player1, 1);
    view.commit_edit().await.unwrap();
    view.delete_match(&mid("a-m1"), &Answer::yes()).await.unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        LedgerEvent::MatchUpdated {
            match_id: mid("a-m0"),
            update: MatchUpdate {
                player1_goals: 3,
                player2_goals: 1,
                half_length: 4,
            },
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        LedgerEvent::MatchDeleted { match_id: mid("a-m1") }
    );
    assert!(events.try_recv().is_err());
    // the view drained its own copy
    assert_eq!(view.sync_after_mutations().await, 0);
}

#[test_log::test(tokio::test)]
async fn test_deleting_last_match_on_last_page_steps_back() {
    let (api, view) = loaded(21).await;
    view.change_page(2).await.unwrap();
    assert_eq!(view.ledger().snapshot().unwrap().value.items.len(), 1);

    view.delete_match(&mid("a-m20"), &Answer::yes()).await.unwrap();

    let snapshot = view.ledger().snapshot().unwrap();
    assert_eq!(snapshot.value.page, 1);
    assert_eq!(snapshot.value.items.len(), 20);
    assert_eq!(view.pagination().current_page(), 1);
    assert!(!view.pagination().next_page_exists());
    assert_eq!(api.calls("matches:a:2"), 2);
    assert_eq!(api.calls("matches:a:1"), 2);
}
