use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    opsdesk_common::{DeliveredMessageId, OperatorId, RecipientId, UserId, UserProfile},
    opsdesk_config::OpsdeskConfig,
    opsdesk_replies::ReplyIndex,
    opsdesk_sessions::{ClaimOutcome, Conversation, ReleaseOutcome, SessionStore},
};

use crate::{
    delivery::{Controls, Delivery},
    error::{Error, Result},
    event::{InboundEvent, Initiator},
    fanout::NotificationFanout,
    render,
};

/// The state machine and decision logic turning inbound events into
/// delivery actions and session mutations.
pub struct RoutingEngine {
    config: Arc<OpsdeskConfig>,
    sessions: Arc<SessionStore>,
    replies: Arc<ReplyIndex>,
    delivery: Arc<dyn Delivery>,
    fanout: NotificationFanout,
}

impl RoutingEngine {
    #[must_use]
    pub fn new(
        config: Arc<OpsdeskConfig>,
        sessions: Arc<SessionStore>,
        replies: Arc<ReplyIndex>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        let fanout = NotificationFanout::new(config.operator_pool(), Arc::clone(&delivery));
        Self {
            config,
            sessions,
            replies,
            delivery,
            fanout,
        }
    }

    /// Process one inbound event to completion.
    ///
    /// An `Err` means the primary response to the acting party could not be
    /// delivered; all per-copy fan-out failures are contained and logged.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::CategorySelected { user, category } => {
                self.on_category_selected(user, &category).await
            },
            InboundEvent::TextSubmitted {
                user,
                message_id,
                text,
                profile,
            } => self.on_text(user, message_id, &text, &profile).await,
            InboundEvent::OperatorReply {
                operator,
                replied_to,
                text,
            } => self.on_operator_reply(operator, replied_to, &text).await,
            InboundEvent::EndDialogRequested { user, initiator } => {
                self.on_end_dialog(user, initiator).await
            },
            InboundEvent::BackToMenuRequested { user } => self.on_back_to_menu(user).await,
            InboundEvent::Cancel { user } => self.on_cancel(user).await,
        }
    }

    /// Read-only listing of active conversations, for any operator.
    #[must_use]
    pub fn active_conversations(&self) -> Vec<Conversation> {
        self.sessions.list_all()
    }

    /// Resolve a delivered-message id back to the originating user.
    ///
    /// Used by transports to target operator commands (such as ending a
    /// dialog by replying to a forwarded copy) at a specific user.
    #[must_use]
    pub fn reply_target(&self, id: DeliveredMessageId) -> Option<UserId> {
        self.replies.lookup(id).map(|p| p.user)
    }

    async fn on_category_selected(&self, user: UserId, category: &str) -> Result<()> {
        let Some(cat) = self.config.category(category) else {
            debug!(%user, category, "ignoring unknown category selection");
            return Ok(());
        };
        self.sessions.set_category(user, &cat.id);
        self.send(
            user.into(),
            &render::category_instructions(&cat.label, &cat.instructions),
            Some(Controls::BackToMenu),
        )
        .await?;
        Ok(())
    }

    async fn on_text(
        &self,
        user: UserId,
        message_id: i64,
        text: &str,
        profile: &UserProfile,
    ) -> Result<()> {
        if let Some(conv) = self.sessions.get(user) {
            return self.forward_dialog_turn(&conv, message_id, text, profile).await;
        }
        if let Some(category) = self.sessions.take_category(user) {
            return self.forward_submission(user, message_id, text, profile, &category).await;
        }
        // Stray message with no pending category: prompt only, no routing.
        self.send(user.into(), render::IDLE_PROMPT, None).await?;
        Ok(())
    }

    /// SelectingMessage + text: fan the payload out to the whole pool,
    /// recording one pending reply per delivered copy.
    async fn forward_submission(
        &self,
        user: UserId,
        message_id: i64,
        text: &str,
        profile: &UserProfile,
        category: &str,
    ) -> Result<()> {
        let reference = format!("msg_{user}_{message_id}");
        let payload = render::new_request(
            &reference,
            profile,
            user,
            self.config.category_label(category),
            text,
        );

        for &operator in self.fanout.pool() {
            match self.delivery.deliver(operator.into(), &payload, None).await {
                Ok(delivered) => {
                    self.replies.record(delivered, user, &reference, category);
                },
                Err(e) => {
                    warn!(%operator, %user, error = %e, "failed to forward submission to operator");
                },
            }
        }
        info!(%user, category, "submission forwarded to operator pool");

        self.send(user.into(), render::SUBMISSION_CONFIRMED, None).await?;
        Ok(())
    }

    /// InDialog + text: forward to the claiming operator only.
    async fn forward_dialog_turn(
        &self,
        conv: &Conversation,
        message_id: i64,
        text: &str,
        profile: &UserProfile,
    ) -> Result<()> {
        let user = conv.user;
        let reference = format!("dialog_{user}_{message_id}");
        let payload = render::dialog_turn(profile, user, text);

        match self.delivery.deliver(conv.operator.into(), &payload, None).await {
            Ok(delivered) => {
                self.replies.record(delivered, user, &reference, &conv.category);
                self.send(
                    user.into(),
                    render::DIALOG_TURN_CONFIRMED,
                    Some(Controls::DialogActions),
                )
                .await?;
            },
            Err(e) => {
                warn!(operator = %conv.operator, %user, error = %e, "failed to forward dialog turn");
                self.send(user.into(), render::REPLY_DELIVERY_FAILED, None).await?;
            },
        }
        Ok(())
    }

    async fn on_operator_reply(
        &self,
        operator: OperatorId,
        replied_to: DeliveredMessageId,
        text: &str,
    ) -> Result<()> {
        let Some(pending) = self.replies.lookup(replied_to) else {
            // Unknown reply target: report to this operator only, mutate
            // nothing.
            debug!(%operator, %replied_to, "reply target not found in reply index");
            self.send(operator.into(), render::UNKNOWN_REPLY_TARGET, None).await?;
            return Ok(());
        };

        let user = pending.user;
        match self.sessions.claim(user, operator, &pending.category) {
            ClaimOutcome::AlreadyClaimedByOther(held_by) => {
                // Conflict: no delivery to the user, no state change.
                self.send(operator.into(), &render::conversation_conflict(held_by), None)
                    .await?;
            },
            ClaimOutcome::Started => {
                match self
                    .delivery
                    .deliver(
                        user.into(),
                        &render::operator_reply(text),
                        Some(Controls::DialogActions),
                    )
                    .await
                {
                    Ok(_) => {
                        info!(%operator, %user, reference = %pending.reference, "dialog started");
                        self.fanout
                            .notify_others(operator, &render::dialog_started_notice(operator, user))
                            .await;
                        self.send(operator.into(), render::REPLY_SENT_CONFIRMED, None).await?;
                    },
                    Err(e) => {
                        // The claim stands; tell the operator the user was
                        // not reached.
                        warn!(%operator, %user, error = %e, "failed to deliver operator reply");
                        self.send(operator.into(), render::REPLY_DELIVERY_FAILED, None).await?;
                    },
                }
            },
        }
        Ok(())
    }

    async fn on_end_dialog(&self, user: UserId, initiator: Initiator) -> Result<()> {
        // Only the user or the claiming operator may tear the dialog down;
        // every operator holds a forwarded copy, so the transport cannot
        // enforce this.
        let conv = match initiator {
            Initiator::User => match self.sessions.release(user) {
                Some(conv) => conv,
                None => {
                    self.send(user.into(), render::NO_ACTIVE_DIALOG, None).await?;
                    return Ok(());
                },
            },
            Initiator::Operator(op) => match self.sessions.release_if_held_by(user, op) {
                ReleaseOutcome::Released(conv) => conv,
                ReleaseOutcome::HeldByOther(held_by) => {
                    debug!(operator = %op, %user, %held_by, "refusing end by non-holder");
                    self.send(op.into(), &render::end_dialog_held_by_other(held_by), None)
                        .await?;
                    return Ok(());
                },
                ReleaseOutcome::NotFound => {
                    self.send(op.into(), render::NO_ACTIVE_DIALOG, None).await?;
                    return Ok(());
                },
            },
        };
        self.prune_after_release(user);
        info!(%user, operator = %conv.operator, ?initiator, "dialog ended");

        match initiator {
            Initiator::User => {
                self.send_best_effort(conv.operator.into(), &render::user_ended_dialog(user), None)
                    .await;
                self.fanout
                    .notify_others(conv.operator, &render::dialog_ended_notice(user))
                    .await;
                self.send(user.into(), render::DIALOG_ENDED_USER_CONFIRM, None).await?;
            },
            Initiator::Operator(op) => {
                self.send_best_effort(
                    user.into(),
                    render::DIALOG_ENDED_BY_OPERATOR,
                    Some(Controls::BackToMenu),
                )
                .await;
                self.fanout.notify_others(op, &render::dialog_ended_notice(user)).await;
                self.send(op.into(), render::DIALOG_ENDED_OPERATOR_CONFIRM, None).await?;
            },
        }
        Ok(())
    }

    async fn on_back_to_menu(&self, user: UserId) -> Result<()> {
        if let Some(conv) = self.sessions.release(user) {
            self.prune_after_release(user);
            info!(%user, operator = %conv.operator, "dialog dropped via back-to-menu");
            self.send_best_effort(conv.operator.into(), &render::user_left_to_menu(user), None)
                .await;
            self.fanout
                .notify_others(conv.operator, &render::dialog_ended_notice(user))
                .await;
        }
        self.sessions.clear_category(user);
        self.delivery
            .render_menu(user.into())
            .await
            .map_err(|source| Error::Delivery {
                recipient: user.into(),
                source,
            })?;
        Ok(())
    }

    async fn on_cancel(&self, user: UserId) -> Result<()> {
        self.sessions.clear_category(user);
        self.send(user.into(), render::CANCELLED, None).await?;
        Ok(())
    }

    fn prune_after_release(&self, user: UserId) {
        if self.config.replies.prune_on_release {
            let removed = self.replies.prune_user(user);
            debug!(%user, removed, "pruned reply records after release");
        }
    }

    /// Deliver the primary response of an event; failure surfaces to the
    /// caller.
    async fn send(
        &self,
        to: RecipientId,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<DeliveredMessageId> {
        self.delivery
            .deliver(to, text, controls)
            .await
            .map_err(|source| Error::Delivery {
                recipient: to,
                source,
            })
    }

    /// Deliver a side notification; failure is logged and contained.
    async fn send_best_effort(&self, to: RecipientId, text: &str, controls: Option<Controls>) {
        if let Err(e) = self.delivery.deliver(to, text, controls).await {
            warn!(recipient = %to, error = %e, "best-effort delivery failed");
        }
    }
}
