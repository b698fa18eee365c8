//! GOP application service
//!
//! Orchestrates directory lookups, the lifecycle methods on the aggregate,
//! persistence and notification fan-out. Every operation takes the acting
//! [`Actor`] explicitly; nothing is read from ambient request state.
//!
//! Fan-out runs after the transition has been saved. Its failures are logged
//! at `warn` and dropped, so a committed transition is never reported as failed.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use core_kernel::{ClaimId, GopId};
use domain_messaging::{
    request_email, resolve_recipient, ChatParticipants, ChatPort, ChatSession, Credentials, Dispatch,
    Notification, Notifier,
};
use domain_party::{
    authorize, generate_one_time_password, AccessRule, Actor, DirectoryPort, Member, MemberChanges, NewMember,
    NewUser, Payer, Provider, User, UserType,
};

use crate::claim::{Claim, NewClaim, TerminalClaimRequest};
use crate::error::GopError;
use crate::events::{Counterpart, GopEvent};
use crate::gop::GuaranteeOfPayment;
use crate::lifecycle::{ensure_payer_owner, ensure_provider_owner, ensure_visible, submit, Decision, DecisionInput};
use crate::patch::{GopChanges, GopDraft, GopPatch};
use crate::ports::GopPort;
use crate::query::{GopPage, GopQuery, ListingParams, StatusCounts, Visibility};

/// A request with the records it references, for the detail views
#[derive(Debug, Clone, Serialize)]
pub struct GopDetails {
    pub gop: GuaranteeOfPayment,
    pub member: Member,
    pub provider: Provider,
    pub payer: Payer,
    pub turnaround_time: Option<String>,
    /// Rendered through the read-only admin view
    pub admin_view: bool,
}

/// One listing page with the summary counts of its base query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopListing {
    pub page: GopPage,
    pub counts: StatusCounts,
}

fn provider_rule() -> AccessRule {
    AccessRule::for_types([UserType::Provider])
}

fn payer_rule() -> AccessRule {
    AccessRule::for_types([UserType::Payer])
}

/// Entry point for every GOP operation
pub struct GopService {
    gops: Arc<dyn GopPort>,
    directory: Arc<dyn DirectoryPort>,
    chats: Arc<dyn ChatPort>,
    notifier: Notifier,
    public_base_url: String,
}

impl GopService {
    pub fn new(
        gops: Arc<dyn GopPort>,
        directory: Arc<dyn DirectoryPort>,
        chats: Arc<dyn ChatPort>,
        notifier: Notifier,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            gops,
            directory,
            chats,
            notifier,
            public_base_url: public_base_url.into(),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submits a new request on behalf of a provider user.
    ///
    /// The member is reused when one with the same national id exists. The
    /// payer and doctor must belong to the actor's provider, otherwise the
    /// outcome is `NotFound`.
    #[instrument(skip(self, actor, draft), fields(user = %actor.user_id, payer = %draft.payer_id))]
    pub async fn create(&self, actor: &Actor, draft: GopDraft) -> Result<GuaranteeOfPayment, GopError> {
        self.submit_draft(actor, draft, None).await
    }

    /// Submits several drafts in order; each one succeeds or fails on its own
    pub async fn create_many(
        &self,
        actor: &Actor,
        drafts: Vec<GopDraft>,
    ) -> Vec<Result<GuaranteeOfPayment, GopError>> {
        let mut results = Vec::with_capacity(drafts.len());
        for draft in drafts {
            results.push(self.create(actor, draft).await);
        }
        results
    }

    /// Stores a claim shell reported by a provider terminal.
    ///
    /// The member bound to the device is used, or a placeholder member is
    /// created for it.
    #[instrument(skip(self, actor, request), fields(user = %actor.user_id))]
    pub async fn open_terminal_claim(
        &self,
        actor: &Actor,
        request: TerminalClaimRequest,
    ) -> Result<Claim, GopError> {
        authorize(actor, &provider_rule())?;
        let provider_id = actor.provider_id().ok_or(GopError::NotAuthorized)?;

        let device_uid = request.device_uid.trim();
        if device_uid.is_empty() {
            return Err(GopError::validation("device_uid", "device id is required"));
        }

        let member = match self.directory.find_member_by_device(device_uid).await? {
            Some(member) => member,
            None => self.directory.create_member(NewMember::for_device(device_uid)).await?,
        };

        let claim = self
            .gops
            .insert_claim(NewClaim {
                provider_id,
                member_id: member.id,
                terminal_id: request.terminal_id,
                amount: request.amount,
                created_at: Utc::now(),
            })
            .await?;
        info!(claim = %claim.id, member = %member.id, "terminal claim opened");

        match self.directory.get_provider(provider_id).await {
            Ok(Provider { user_id: Some(target), .. }) => {
                self.dispatch(Dispatch {
                    target,
                    title: "New claim".to_string(),
                    message: format!("New terminal claim #{} for {}", claim.id.value(), member.name),
                    link: Some(format!("/request/claim/{}", claim.id.value())),
                    room_hint: None,
                    email: None,
                })
                .await;
            }
            Ok(_) => warn!(claim = %claim.id, provider = %provider_id, "provider has no account, notification skipped"),
            Err(error) => warn!(claim = %claim.id, %error, "provider lookup failed, notification skipped"),
        }

        Ok(claim)
    }

    /// Completes a request from a terminal claim
    #[instrument(skip(self, actor, draft), fields(user = %actor.user_id, claim = %claim_id))]
    pub async fn create_from_claim(
        &self,
        actor: &Actor,
        claim_id: ClaimId,
        draft: GopDraft,
    ) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &provider_rule())?;
        let claim = self.gops.get_claim(claim_id).await?;
        if actor.provider_id() != Some(claim.provider_id) {
            return Err(GopError::not_found("Claim", claim_id));
        }
        self.submit_draft(actor, draft, Some(claim)).await
    }

    async fn submit_draft(
        &self,
        actor: &Actor,
        draft: GopDraft,
        claim: Option<Claim>,
    ) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &provider_rule())?;
        let provider_id = actor.provider_id().ok_or(GopError::NotAuthorized)?;

        let provider = self.directory.get_provider(provider_id).await?;
        let payer = self.directory.find_provider_payer(provider_id, draft.payer_id).await?;
        let doctor = match draft.doctor_id {
            Some(doctor_id) => Some(self.directory.find_provider_doctor(provider_id, doctor_id).await?),
            None => None,
        };

        let mut changes = draft.details.into_changes()?;
        self.check_diagnosis_codes(&changes).await?;
        if let Some(claim) = &claim {
            if let Some(existing) = claim.gop_id {
                return Err(GopError::invalid_transition("complete", format!("claim linked to {existing}")));
            }
            if changes.quotation.is_none() {
                changes.quotation = claim.amount;
            }
        }

        let member_changes = std::mem::take(&mut changes.member);
        let member = self.resolve_member(member_changes, claim.as_ref()).await?;

        let new_gop = submit(
            actor,
            &provider,
            &payer,
            &member,
            doctor.as_ref(),
            claim.as_ref().map(|c| c.id),
            changes,
        )?;
        let gop = self.gops.insert(new_gop).await?;
        info!(gop = %gop.id, provider = %provider.id, payer = %payer.id, "request submitted");

        if let Some(mut claim) = claim {
            claim.attach(gop.id)?;
            self.gops.save_claim(&claim).await?;
        }

        self.provision_chat(gop.id).await;
        self.announce(
            &gop,
            GopEvent::Submitted {
                gop_id: gop.id,
                timestamp: gop.created_at,
            },
        )
        .await;

        Ok(gop)
    }

    /// Finds the patient by claim or national id, or registers a new one
    async fn resolve_member(&self, changes: MemberChanges, claim: Option<&Claim>) -> Result<Member, GopError> {
        let existing = match (claim, changes.national_id.as_deref()) {
            (Some(claim), _) => Some(self.directory.get_member(claim.member_id).await?),
            (None, Some(national_id)) => self.directory.find_member_by_national_id(national_id).await?,
            (None, None) => None,
        };

        match existing {
            Some(mut member) => {
                if changes != MemberChanges::default() {
                    member.apply(changes);
                    self.directory.update_member(&member).await?;
                }
                Ok(member)
            }
            None => {
                if changes.name.is_none() {
                    return Err(GopError::validation("member.name", "patient name is required"));
                }
                Ok(self.directory.create_member(NewMember::from_changes(changes)).await?)
            }
        }
    }

    /// Every referenced diagnosis code must exist
    async fn check_diagnosis_codes(&self, changes: &GopChanges) -> Result<(), GopError> {
        let Some(codes) = changes.diagnosis_codes.as_ref().filter(|codes| !codes.is_empty()) else {
            return Ok(());
        };
        let known = self.gops.existing_diagnosis_codes(codes).await?;
        match codes.difference(&known).next() {
            Some(unknown) => Err(GopError::validation("icd_codes", format!("unknown diagnosis code {unknown}"))),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Detail view.
    ///
    /// The payer's first view of a pending request moves it to `in_review`
    /// and notifies the provider. Admins get the read-only admin view.
    pub async fn view(&self, actor: &Actor, id: GopId) -> Result<GopDetails, GopError> {
        authorize(actor, &AccessRule::request_reader())?;
        if actor.is_admin() {
            return self.admin_view(actor, id).await;
        }

        let mut gop = self.load(actor, id).await?;
        if actor.payer_id() == Some(gop.payer_id) {
            let view = gop.record_payer_view(actor)?;
            if view.changed {
                self.gops.save(&gop).await?;
            }
            if let Some(event) = view.event {
                info!(gop = %gop.id, status = %gop.status, "request in review");
                self.announce(&gop, event).await;
            }
        }

        self.details(gop, false).await
    }

    /// Read-only view of any request, for admins
    pub async fn admin_view(&self, actor: &Actor, id: GopId) -> Result<GopDetails, GopError> {
        authorize(actor, &AccessRule::admin())?;
        let gop = self.gops.get(id).await?;
        self.details(gop, true).await
    }

    async fn load(&self, actor: &Actor, id: GopId) -> Result<GuaranteeOfPayment, GopError> {
        let gop = self.gops.get(id).await?;
        ensure_visible(actor, &gop)?;
        Ok(gop)
    }

    async fn details(&self, gop: GuaranteeOfPayment, admin_view: bool) -> Result<GopDetails, GopError> {
        let member = self.directory.get_member(gop.member_id).await?;
        let provider = self.directory.get_provider(gop.provider_id).await?;
        let payer = self.directory.get_payer(gop.payer_id).await?;
        Ok(GopDetails {
            turnaround_time: gop.turnaround_time(),
            gop,
            member,
            provider,
            payer,
            admin_view,
        })
    }

    // ========================================================================
    // Payer transitions
    // ========================================================================

    /// Approves or declines a request
    #[instrument(skip(self, actor, input), fields(user = %actor.user_id, gop = %id))]
    pub async fn decide(
        &self,
        actor: &Actor,
        id: GopId,
        input: DecisionInput,
    ) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &payer_rule())?;
        let mut gop = self.gops.get(id).await?;
        ensure_payer_owner(actor, &gop)?;

        let decision = Decision::try_from(input)?;
        let event = gop.decide(actor, decision)?;
        self.commit(gop, event).await
    }

    /// Records the payer-side reviewer name
    pub async fn set_stamp_author(
        &self,
        actor: &Actor,
        id: GopId,
        name: &str,
    ) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &payer_rule())?;
        let mut gop = self.gops.get(id).await?;
        let event = gop.set_stamp_author(actor, name)?;
        self.commit(gop, event).await
    }

    // ========================================================================
    // Provider transitions
    // ========================================================================

    /// Applies a provider edit; member fields in the patch update the patient
    #[instrument(skip(self, actor, patch), fields(user = %actor.user_id, gop = %id))]
    pub async fn edit(
        &self,
        actor: &Actor,
        id: GopId,
        patch: GopPatch,
        mark_final: bool,
    ) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &provider_rule())?;
        let mut gop = self.gops.get(id).await?;
        ensure_provider_owner(actor, &gop)?;

        let mut changes = patch.into_changes()?;
        self.check_diagnosis_codes(&changes).await?;
        let member_changes = std::mem::take(&mut changes.member);

        let event = gop.edit(actor, changes, mark_final)?;
        let member = if member_changes == MemberChanges::default() {
            None
        } else {
            let mut member = self.directory.get_member(gop.member_id).await?;
            member.apply(member_changes);
            Some(member)
        };

        // the patient is only touched once the request itself is stored
        self.gops.save(&gop).await?;
        if let Some(member) = member {
            self.directory.update_member(&member).await?;
        }
        self.announce_update(gop, event).await
    }

    /// Puts the request back into the payer's queue and re-emails the payer
    #[instrument(skip(self, actor), fields(user = %actor.user_id, gop = %id))]
    pub async fn resend(&self, actor: &Actor, id: GopId) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &provider_rule())?;
        let mut gop = self.gops.get(id).await?;
        let event = gop.resend(actor)?;
        self.commit(gop, event).await
    }

    /// Archives the request
    #[instrument(skip(self, actor, reason), fields(user = %actor.user_id, gop = %id))]
    pub async fn close(&self, actor: &Actor, id: GopId, reason: &str) -> Result<GuaranteeOfPayment, GopError> {
        authorize(actor, &provider_rule())?;
        let mut gop = self.gops.get(id).await?;
        let event = gop.close(actor, reason)?;
        self.commit(gop, event).await
    }

    async fn commit(&self, gop: GuaranteeOfPayment, event: GopEvent) -> Result<GuaranteeOfPayment, GopError> {
        self.gops.save(&gop).await?;
        self.announce_update(gop, event).await
    }

    async fn announce_update(&self, gop: GuaranteeOfPayment, event: GopEvent) -> Result<GuaranteeOfPayment, GopError> {
        info!(gop = %gop.id, status = %gop.status, closed = gop.closed, event = event.event_type(), "request updated");
        self.announce(&gop, event).await;
        Ok(gop)
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Open requests visible to the actor
    pub async fn list(&self, actor: &Actor, params: ListingParams) -> Result<GopListing, GopError> {
        authorize(actor, &AccessRule::request_reader())?;
        let query = GopQuery::for_actor(actor, Visibility::Open, params)?;
        self.listing(&query).await
    }

    /// Closed requests visible to the actor
    pub async fn history(&self, actor: &Actor, params: ListingParams) -> Result<GopListing, GopError> {
        authorize(actor, &AccessRule::request_reader())?;
        let query = GopQuery::for_actor(actor, Visibility::History, params)?;
        self.listing(&query).await
    }

    /// Admin listing with country and company filters
    pub async fn filter(&self, actor: &Actor, params: ListingParams) -> Result<GopListing, GopError> {
        authorize(actor, &AccessRule::admin())?;
        self.list(actor, params).await
    }

    /// Summary counts of the actor's open requests
    pub async fn counts(&self, actor: &Actor) -> Result<StatusCounts, GopError> {
        authorize(actor, &AccessRule::request_reader())?;
        let query = GopQuery::for_actor(actor, Visibility::Open, ListingParams::default())?;
        Ok(self.gops.count_by_status(&query).await?)
    }

    async fn listing(&self, query: &GopQuery) -> Result<GopListing, GopError> {
        let page = self.gops.list(query).await?;
        let counts = self.gops.count_by_status(&query.without_status()).await?;
        Ok(GopListing { page, counts })
    }

    // ========================================================================
    // Notifications and chat
    // ========================================================================

    /// Consumes the actor's oldest queued notification
    pub async fn check_notification(&self, actor: &Actor) -> Result<Option<Notification>, GopError> {
        // every account has a queue
        authorize(actor, &AccessRule::any())?;
        Ok(self.notifier.take_next(actor.user_id).await?)
    }

    /// Chat membership for a request the actor can see
    pub async fn chat_session(&self, actor: &Actor, id: GopId) -> Result<ChatSession, GopError> {
        authorize(actor, &AccessRule::provider_or_payer())?;
        let gop = self.load(actor, id).await?;
        let chat = self.chats.ensure_room(gop.id).await?;
        let provider = self.directory.get_provider(gop.provider_id).await?;
        let payer = self.directory.get_payer(gop.payer_id).await?;

        Ok(ChatSession {
            chat,
            display_name: actor.name.clone(),
            participants: ChatParticipants {
                provider_user: provider.user_id,
                payer_user: payer.user_id,
            },
        })
    }

    // ========================================================================
    // Fan-out
    // ========================================================================

    async fn provision_chat(&self, gop_id: GopId) {
        if let Err(error) = self.chats.ensure_room(gop_id).await {
            warn!(gop = %gop_id, %error, "chat room not provisioned");
        }
    }

    /// Notifies the event's counterpart; never fails
    async fn announce(&self, gop: &GuaranteeOfPayment, event: GopEvent) {
        let Some(counterpart) = event.counterpart() else {
            return;
        };
        let (title, message) = event.notification_text();
        let link = format!("/request/{}", gop.id.value());

        let provider = match self.directory.get_provider(gop.provider_id).await {
            Ok(provider) => provider,
            Err(error) => {
                warn!(gop = %gop.id, %error, "provider lookup failed, notification skipped");
                return;
            }
        };

        let dispatch = match counterpart {
            Counterpart::Provider => {
                let Some(target) = provider.user_id else {
                    warn!(gop = %gop.id, provider = %provider.id, "provider has no account, notification skipped");
                    return;
                };
                Dispatch {
                    target,
                    title: title.to_string(),
                    message,
                    link: Some(link),
                    room_hint: None,
                    email: None,
                }
            }
            Counterpart::Payer => {
                match self.payer_dispatch(gop, &provider, &event, title, message, link).await {
                    Some(dispatch) => dispatch,
                    None => return,
                }
            }
        };

        self.dispatch(dispatch).await;
    }

    async fn payer_dispatch(
        &self,
        gop: &GuaranteeOfPayment,
        provider: &Provider,
        event: &GopEvent,
        title: &str,
        message: String,
        link: String,
    ) -> Option<Dispatch> {
        let mut payer = match self.directory.get_payer(gop.payer_id).await {
            Ok(payer) => payer,
            Err(error) => {
                warn!(gop = %gop.id, %error, "payer lookup failed, notification skipped");
                return None;
            }
        };

        let (account, credentials) = match payer.user_id {
            Some(user_id) => match self.directory.get_user(user_id).await {
                Ok(user) => (Some(user), None),
                Err(error) => {
                    warn!(gop = %gop.id, user = %user_id, %error, "payer account lookup failed");
                    (None, None)
                }
            },
            // credentials only reach the payer by email
            None if event.emails_payer() => match self.provision_payer_account(&payer).await {
                Ok((user, credentials)) => {
                    payer.user_id = Some(user.id);
                    (Some(user), Some(credentials))
                }
                Err(error) => {
                    warn!(gop = %gop.id, payer = %payer.id, %error, "payer account not provisioned");
                    (None, None)
                }
            },
            None => (None, None),
        };

        let Some(target) = payer.user_id else {
            warn!(gop = %gop.id, payer = %payer.id, "payer has no account, notification skipped");
            return None;
        };

        let email = if event.emails_payer() {
            match resolve_recipient(&payer, account.as_ref()) {
                Some(recipient) => Some(request_email(
                    &recipient,
                    &provider.company,
                    gop.id,
                    &self.absolute(&link),
                    credentials.as_ref(),
                )),
                None => {
                    warn!(gop = %gop.id, payer = %payer.id, "no payer contact address, email skipped");
                    None
                }
            }
        } else {
            None
        };

        Some(Dispatch {
            target,
            title: title.to_string(),
            message,
            link: Some(link),
            room_hint: None,
            email,
        })
    }

    async fn provision_payer_account(&self, payer: &Payer) -> Result<(User, Credentials), GopError> {
        let password = generate_one_time_password();
        let account = NewUser::payer_account(payer, password.clone())?;
        let user = self.directory.create_user(account).await?;
        self.directory.link_payer_account(payer.id, user.id).await?;
        info!(payer = %payer.id, user = %user.id, "payer account provisioned");

        let credentials = Credentials {
            email: user.email.clone(),
            password,
        };
        Ok((user, credentials))
    }

    async fn dispatch(&self, dispatch: Dispatch) {
        let target = dispatch.target;
        match self.notifier.notify(dispatch).await {
            Ok(report) => report.log_failures(),
            Err(error) => warn!(user = %target, %error, "notification not stored"),
        }
    }

    fn absolute(&self, link: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), link)
    }
}
