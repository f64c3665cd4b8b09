//! End-to-end engine scenarios against a capturing mock delivery.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::Secret,
};

use {
    opsdesk_common::{DeliveredMessageId, OperatorId, RecipientId, UserId, UserProfile},
    opsdesk_config::{OpsdeskConfig, TelegramConfig},
    opsdesk_replies::ReplyIndex,
    opsdesk_routing::{Controls, Delivery, InboundEvent, Initiator, RoutingEngine},
    opsdesk_sessions::SessionStore,
};

const ALICE: UserId = UserId(1000);
const OP_A: OperatorId = OperatorId(1);
const OP_B: OperatorId = OperatorId(2);
const OP_C: OperatorId = OperatorId(3);

#[derive(Debug, Clone)]
struct Sent {
    id: DeliveredMessageId,
    to: RecipientId,
    text: String,
    controls: Option<Controls>,
}

/// Delivery double: records every send and hands out sequential ids.
#[derive(Default)]
struct MockDelivery {
    sent: Mutex<Vec<Sent>>,
    menus: Mutex<Vec<RecipientId>>,
    next_id: AtomicI64,
    /// Recipients whose deliveries fail.
    unreachable: Mutex<Vec<RecipientId>>,
}

impl MockDelivery {
    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn sent_to(&self, to: impl Into<RecipientId>) -> Vec<Sent> {
        let to = to.into();
        self.sent().into_iter().filter(|s| s.to == to).collect()
    }

    fn menus_rendered(&self) -> Vec<RecipientId> {
        self.menus.lock().unwrap().clone()
    }

    fn mark_unreachable(&self, to: impl Into<RecipientId>) {
        self.unreachable.lock().unwrap().push(to.into());
    }

    fn clear_log(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver(
        &self,
        to: RecipientId,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<DeliveredMessageId> {
        if self.unreachable.lock().unwrap().contains(&to) {
            anyhow::bail!("recipient {to} unreachable");
        }
        let id = DeliveredMessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(Sent {
            id,
            to,
            text: text.to_string(),
            controls,
        });
        Ok(id)
    }

    async fn render_menu(&self, to: RecipientId) -> Result<()> {
        self.menus.lock().unwrap().push(to);
        Ok(())
    }
}

struct Fixture {
    engine: RoutingEngine,
    delivery: Arc<MockDelivery>,
    sessions: Arc<SessionStore>,
    replies: Arc<ReplyIndex>,
}

fn fixture_with(mutate: impl FnOnce(&mut OpsdeskConfig)) -> Fixture {
    let mut config = OpsdeskConfig {
        telegram: TelegramConfig {
            token: Secret::new("123:TEST".into()),
        },
        operators: vec![OP_A.0, OP_B.0, OP_C.0],
        ..Default::default()
    };
    mutate(&mut config);

    let delivery = Arc::new(MockDelivery::default());
    let sessions = Arc::new(SessionStore::new());
    let replies = Arc::new(ReplyIndex::new());
    let engine = RoutingEngine::new(
        Arc::new(config),
        Arc::clone(&sessions),
        Arc::clone(&replies),
        Arc::clone(&delivery) as Arc<dyn Delivery>,
    );
    Fixture {
        engine,
        delivery,
        sessions,
        replies,
    }
}

fn fixture() -> Fixture {
    fixture_with(|_| {})
}

fn profile() -> UserProfile {
    UserProfile::new("Ann Lee", Some("annl".into()))
}

/// Drive the fixture through category selection + submission and return the
/// id of the copy forwarded to `operator`.
async fn submit_request(fx: &Fixture, operator: OperatorId) -> DeliveredMessageId {
    fx.engine
        .handle(InboundEvent::CategorySelected {
            user: ALICE,
            category: "complaints".into(),
        })
        .await
        .unwrap();
    fx.engine
        .handle(InboundEvent::TextSubmitted {
            user: ALICE,
            message_id: 7,
            text: "noise at night".into(),
            profile: profile(),
        })
        .await
        .unwrap();
    fx.delivery.sent_to(operator).last().unwrap().id
}

#[tokio::test]
async fn category_selection_sends_instructions_with_back_control() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::CategorySelected {
            user: ALICE,
            category: "complaints".into(),
        })
        .await
        .unwrap();

    let to_user = fx.delivery.sent_to(ALICE);
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].text.contains("Complaints"));
    assert_eq!(to_user[0].controls, Some(Controls::BackToMenu));
    assert_eq!(fx.sessions.pending_category(ALICE).as_deref(), Some("complaints"));
}

#[tokio::test]
async fn unknown_category_selection_is_ignored() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::CategorySelected {
            user: ALICE,
            category: "ghost".into(),
        })
        .await
        .unwrap();

    assert!(fx.delivery.sent().is_empty());
    assert!(fx.sessions.pending_category(ALICE).is_none());
}

// A submission fans out one copy per operator and records one pending
// reply per copy.
#[tokio::test]
async fn submission_fans_out_to_all_operators() {
    let fx = fixture();
    submit_request(&fx, OP_A).await;

    for op in [OP_A, OP_B, OP_C] {
        let copies = fx.delivery.sent_to(op);
        assert_eq!(copies.len(), 1, "operator {op} should get exactly one copy");
        assert!(copies[0].text.contains("#msg_1000_7"));
        assert!(copies[0].text.contains("noise at night"));
    }
    assert_eq!(fx.replies.len(), 3);

    // Back to Idle: category cleared, confirmation delivered.
    assert!(fx.sessions.pending_category(ALICE).is_none());
    let to_user = fx.delivery.sent_to(ALICE);
    assert!(to_user.last().unwrap().text.contains("Thank you"));
    // No conversation yet, nobody has claimed.
    assert!(fx.sessions.get(ALICE).is_none());
}

#[tokio::test]
async fn unreachable_operator_does_not_block_the_rest() {
    let fx = fixture();
    fx.delivery.mark_unreachable(OP_B);
    submit_request(&fx, OP_A).await;

    assert_eq!(fx.delivery.sent_to(OP_A).len(), 1);
    assert!(fx.delivery.sent_to(OP_B).is_empty());
    assert_eq!(fx.delivery.sent_to(OP_C).len(), 1);
    // Only delivered copies are recorded.
    assert_eq!(fx.replies.len(), 2);
    // The user is still confirmed.
    assert!(fx.delivery.sent_to(ALICE).last().unwrap().text.contains("Thank you"));
}

// The first operator reply claims the conversation.
#[tokio::test]
async fn first_reply_claims_conversation() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "we will check tonight".into(),
        })
        .await
        .unwrap();

    // User got the reply with dialog controls.
    let to_user = fx.delivery.sent_to(ALICE);
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].text.contains("we will check tonight"));
    assert_eq!(to_user[0].controls, Some(Controls::DialogActions));

    // Conversation exists and belongs to A.
    let conv = fx.sessions.get(ALICE).unwrap();
    assert_eq!(conv.operator, OP_A);
    assert_eq!(conv.category, "complaints");

    // Other operators were notified exactly once each; A got a confirmation.
    assert_eq!(fx.delivery.sent_to(OP_B).len(), 1);
    assert!(fx.delivery.sent_to(OP_B)[0].text.contains("started a dialog"));
    assert_eq!(fx.delivery.sent_to(OP_C).len(), 1);
    assert!(fx.delivery.sent_to(OP_A).last().unwrap().text.contains("Reply delivered"));
}

// A second operator replying to a different copy is rejected
// and nothing changes.
#[tokio::test]
async fn second_operator_reply_conflicts() {
    let fx = fixture();
    let copy_for_b = submit_request(&fx, OP_B).await;
    let copy_for_a = fx.delivery.sent_to(OP_A).last().unwrap().id;

    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "first".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_B,
            replied_to: copy_for_b,
            text: "second".into(),
        })
        .await
        .unwrap();

    // B is told who holds the conversation; the user hears nothing.
    let to_b = fx.delivery.sent_to(OP_B);
    assert_eq!(to_b.len(), 1);
    assert!(to_b[0].text.contains(&format!("operator {OP_A}")));
    assert!(fx.delivery.sent_to(ALICE).is_empty());

    // Ownership unchanged.
    assert_eq!(fx.sessions.get(ALICE).unwrap().operator, OP_A);
}

#[tokio::test]
async fn repeat_reply_by_claiming_operator_continues_dialog() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;

    for text in ["first reply", "second reply"] {
        fx.engine
            .handle(InboundEvent::OperatorReply {
                operator: OP_A,
                replied_to: copy_for_a,
                text: text.into(),
            })
            .await
            .unwrap();
    }

    assert_eq!(fx.sessions.get(ALICE).unwrap().operator, OP_A);
    let to_user = fx.delivery.sent_to(ALICE);
    assert!(to_user.iter().any(|s| s.text.contains("second reply")));
}

#[tokio::test]
async fn in_dialog_text_routes_only_to_claiming_operator() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();
    let records_before = fx.replies.len();

    fx.engine
        .handle(InboundEvent::TextSubmitted {
            user: ALICE,
            message_id: 9,
            text: "it is still loud".into(),
            profile: profile(),
        })
        .await
        .unwrap();

    // Forwarded to A only.
    let to_a = fx.delivery.sent_to(OP_A);
    assert_eq!(to_a.len(), 1);
    assert!(to_a[0].text.contains("it is still loud"));
    assert!(fx.delivery.sent_to(OP_B).is_empty());
    assert!(fx.delivery.sent_to(OP_C).is_empty());

    // One new pending reply for this turn; user confirmed with controls.
    assert_eq!(fx.replies.len(), records_before + 1);
    let confirm = fx.delivery.sent_to(ALICE);
    assert_eq!(confirm.last().unwrap().controls, Some(Controls::DialogActions));

    // The turn's copy is itself replyable.
    let turn_copy = to_a[0].id;
    let pending = fx.replies.lookup(turn_copy).unwrap();
    assert_eq!(pending.user, ALICE);
    assert!(pending.reference.starts_with("dialog_"));
}

// Ending the dialog releases the claim and allows a fresh one.
#[tokio::test]
async fn user_end_dialog_releases_and_allows_reclaim() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::User,
        })
        .await
        .unwrap();

    // A was told the user ended it; B and C were told the user is free.
    assert!(fx.delivery.sent_to(OP_A)[0].text.contains("ended the dialog"));
    assert!(fx.delivery.sent_to(OP_B)[0].text.contains("available for new requests"));
    assert!(fx.delivery.sent_to(OP_C)[0].text.contains("available for new requests"));
    assert!(fx.delivery.sent_to(ALICE).last().unwrap().text.contains("Dialog ended"));
    assert!(fx.sessions.get(ALICE).is_none());

    // Any operator can now claim fresh through an old copy (records are
    // kept after release by default).
    assert!(fx.replies.lookup(copy_for_a).is_some());
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_B,
            replied_to: copy_for_a,
            text: "taking over".into(),
        })
        .await
        .unwrap();
    assert_eq!(fx.sessions.get(ALICE).unwrap().operator, OP_B);
}

#[tokio::test]
async fn operator_end_dialog_notifies_user() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::Operator(OP_A),
        })
        .await
        .unwrap();

    let to_user = fx.delivery.sent_to(ALICE);
    assert!(to_user[0].text.contains("operator has ended"));
    assert_eq!(to_user[0].controls, Some(Controls::BackToMenu));
    assert!(fx.delivery.sent_to(OP_A).last().unwrap().text.contains("Dialog ended"));
    assert!(fx.sessions.get(ALICE).is_none());
}

// Only the user or the claiming operator may end a dialog; a colleague
// replying /end to their own forwarded copy must not tear it down.
#[tokio::test]
async fn non_claiming_operator_cannot_end_dialog() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::Operator(OP_B),
        })
        .await
        .unwrap();

    // The claim survives; B is told who holds it; nobody else hears a thing.
    assert_eq!(fx.sessions.get(ALICE).unwrap().operator, OP_A);
    let to_b = fx.delivery.sent_to(OP_B);
    assert_eq!(to_b.len(), 1);
    assert!(to_b[0].text.contains(&format!("held by operator {OP_A}")));
    assert!(fx.delivery.sent_to(ALICE).is_empty());
    assert!(fx.delivery.sent_to(OP_A).is_empty());
    assert!(fx.delivery.sent_to(OP_C).is_empty());

    // The holder can still end it afterwards.
    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::Operator(OP_A),
        })
        .await
        .unwrap();
    assert!(fx.sessions.get(ALICE).is_none());
}

#[tokio::test]
async fn end_dialog_without_conversation_reports_not_found() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::User,
        })
        .await
        .unwrap();

    let to_user = fx.delivery.sent_to(ALICE);
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].text.contains("No active dialog"));
}

// Boundary: a reply to an unrecorded message mutates nothing.
#[tokio::test]
async fn unknown_reply_target_mutates_nothing() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: DeliveredMessageId(4242),
            text: "hello?".into(),
        })
        .await
        .unwrap();

    let to_a = fx.delivery.sent_to(OP_A);
    assert_eq!(to_a.len(), 1);
    assert!(to_a[0].text.contains("Could not find the original message"));
    assert!(fx.sessions.list_all().is_empty());
    assert!(fx.replies.is_empty());
    assert!(fx.delivery.sent_to(ALICE).is_empty());
}

#[tokio::test]
async fn idle_text_without_category_only_prompts() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::TextSubmitted {
            user: ALICE,
            message_id: 5,
            text: "anyone there?".into(),
            profile: profile(),
        })
        .await
        .unwrap();

    let to_user = fx.delivery.sent_to(ALICE);
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].text.contains("/start"));
    for op in [OP_A, OP_B, OP_C] {
        assert!(fx.delivery.sent_to(op).is_empty());
    }
    assert!(fx.replies.is_empty());
}

#[tokio::test]
async fn back_to_menu_drops_dialog_and_renders_menu() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    fx.delivery.clear_log();

    fx.engine
        .handle(InboundEvent::BackToMenuRequested { user: ALICE })
        .await
        .unwrap();

    assert!(fx.sessions.get(ALICE).is_none());
    assert!(fx.delivery.sent_to(OP_A)[0].text.contains("returned to the menu"));
    // The rest of the pool learns the user is free again.
    assert!(fx.delivery.sent_to(OP_B)[0].text.contains("available for new requests"));
    assert!(fx.delivery.sent_to(OP_C)[0].text.contains("available for new requests"));
    assert_eq!(fx.delivery.menus_rendered(), vec![RecipientId::from(ALICE)]);
}

#[tokio::test]
async fn cancel_clears_pending_category() {
    let fx = fixture();
    fx.engine
        .handle(InboundEvent::CategorySelected {
            user: ALICE,
            category: "complaints".into(),
        })
        .await
        .unwrap();

    fx.engine.handle(InboundEvent::Cancel { user: ALICE }).await.unwrap();

    assert!(fx.sessions.pending_category(ALICE).is_none());
    assert!(fx.delivery.sent_to(ALICE).last().unwrap().text.contains("cancelled"));

    // A follow-up text is treated as a stray message, not a submission.
    fx.delivery.clear_log();
    fx.engine
        .handle(InboundEvent::TextSubmitted {
            user: ALICE,
            message_id: 6,
            text: "never mind".into(),
            profile: profile(),
        })
        .await
        .unwrap();
    assert!(fx.delivery.sent_to(OP_A).is_empty());
}

#[tokio::test]
async fn prune_on_release_empties_reply_records_for_user() {
    let fx = fixture_with(|cfg| cfg.replies.prune_on_release = true);
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();
    assert!(fx.replies.len() >= 3);

    fx.engine
        .handle(InboundEvent::EndDialogRequested {
            user: ALICE,
            initiator: Initiator::User,
        })
        .await
        .unwrap();

    assert!(fx.replies.is_empty());
}

#[tokio::test]
async fn active_conversations_lists_claims() {
    let fx = fixture();
    let copy_for_a = submit_request(&fx, OP_A).await;
    fx.engine
        .handle(InboundEvent::OperatorReply {
            operator: OP_A,
            replied_to: copy_for_a,
            text: "hello".into(),
        })
        .await
        .unwrap();

    let listed = fx.engine.active_conversations();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user, ALICE);
    assert_eq!(listed[0].operator, OP_A);
    assert_eq!(listed[0].category, "complaints");
}
