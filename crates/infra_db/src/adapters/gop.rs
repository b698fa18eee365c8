//! PostgreSQL GOP Adapter
//!
//! Implements [`GopPort`] on top of [`GopRepository`]. The adapter converts a
//! scoped [`GopQuery`] into a [`GopFilter`] and maps rows back to the
//! aggregate, treating any stored value outside its vocabulary as a corrupt
//! row rather than guessing.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresGopAdapter;
//! use domain_gop::GopPort;
//! use std::sync::Arc;
//!
//! let gops: Arc<dyn GopPort> = Arc::new(PostgresGopAdapter::new(pool));
//! let gop = gops.get(GopId::new(7)).await?;
//! ```

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    Amount, ClaimId, DiagnosisCodeId, DomainPort, GopId, HealthCheckResult, HealthCheckable, MemberId, PayerId,
    PortError, ProviderId, TerminalId,
};
use domain_gop::{
    AdmissionReason, Claim, Financials, GopContent, GopPage, GopPort, GopQuery, GopStatus, GuaranteeOfPayment,
    MedicalDetails, NewClaim, NewGop, RoomType, StatusCounts, StatusFilter, Visibility,
};
use domain_party::Scope;

use crate::error::DatabaseError;
use crate::pool::ping;
use crate::repositories::gop::{
    ClaimRow, ClaimWrite, DbGopStatus, GopFilter, GopRepository, GopRow, GopWrite, ScopeClause, StatusClause,
};

/// PostgreSQL-backed implementation of the GopPort trait
#[derive(Debug, Clone)]
pub struct PostgresGopAdapter {
    repository: GopRepository,
    pool: PgPool,
}

impl PostgresGopAdapter {
    /// Creates a new PostgreSQL GOP adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: GopRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &GopRepository {
        &self.repository
    }

    async fn attach_codes(&self, rows: Vec<GopRow>) -> Result<Vec<GuaranteeOfPayment>, DatabaseError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut codes: BTreeMap<i64, BTreeSet<DiagnosisCodeId>> = BTreeMap::new();
        for (gop_id, code_id) in self.repository.codes_for(&ids).await? {
            codes.entry(gop_id).or_default().insert(DiagnosisCodeId::new(code_id));
        }

        rows.into_iter()
            .map(|row| {
                let row_codes = codes.remove(&row.id).unwrap_or_default();
                gop_from_row(row, row_codes)
            })
            .collect()
    }
}

impl DomainPort for PostgresGopAdapter {}

#[async_trait]
impl HealthCheckable for PostgresGopAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-gop-adapter").await
    }
}

#[async_trait]
impl GopPort for PostgresGopAdapter {
    #[instrument(skip(self, gop), fields(provider_id = %gop.provider_id, payer_id = %gop.payer_id))]
    async fn insert(&self, gop: NewGop) -> Result<GuaranteeOfPayment, PortError> {
        let codes = code_ids(&gop.content.diagnosis_codes);
        let write = gop_write(&GuaranteeOfPayment::from_new(GopId::new(0), gop))?;

        let row = self.repository.insert(&write, &codes).await?;
        debug!(gop_id = row.id, "stored request");
        let mut stored = self.attach_codes(vec![row]).await?;
        stored.pop().ok_or_else(|| PortError::internal("insert returned no row"))
    }

    #[instrument(skip(self), fields(gop_id = %id))]
    async fn get(&self, id: GopId) -> Result<GuaranteeOfPayment, PortError> {
        let row = self.repository.get(id.value()).await?;
        let mut found = self.attach_codes(vec![row]).await?;
        found
            .pop()
            .ok_or_else(|| PortError::not_found("GuaranteeOfPayment", id))
    }

    #[instrument(skip(self, gop), fields(gop_id = %gop.id, status = %gop.status))]
    async fn save(&self, gop: &GuaranteeOfPayment) -> Result<(), PortError> {
        let write = gop_write(gop)?;
        self.repository
            .update(gop.id.value(), &write, &code_ids(&gop.content.diagnosis_codes))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, query), fields(page = query.page.number()))]
    async fn list(&self, query: &GopQuery) -> Result<GopPage, PortError> {
        let Some(filter) = filter_for(query) else {
            return Ok(GopPage {
                items: Vec::new(),
                page: query.page,
                total: 0,
            });
        };

        let limit = i64::try_from(query.page.limit()).map_err(|_| PortError::validation("page size out of range"))?;
        let offset = i64::try_from(query.page.offset()).map_err(|_| PortError::validation("page out of range"))?;

        let rows = self.repository.list(&filter, limit, offset).await?;
        let total = self.repository.count(&filter).await?;
        let items = self.attach_codes(rows).await?;

        Ok(GopPage {
            items,
            page: query.page,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self, query))]
    async fn count_by_status(&self, query: &GopQuery) -> Result<StatusCounts, PortError> {
        let Some(mut filter) = filter_for(query) else {
            return Ok(StatusCounts::default());
        };
        filter.status = None;

        let rows = self.repository.count_by_status(&filter).await?;
        Ok(counts_from_rows(rows))
    }

    async fn existing_diagnosis_codes(
        &self,
        ids: &BTreeSet<DiagnosisCodeId>,
    ) -> Result<BTreeSet<DiagnosisCodeId>, PortError> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        let existing = self.repository.existing_codes(&code_ids(ids)).await?;
        Ok(existing.into_iter().map(DiagnosisCodeId::new).collect())
    }

    #[instrument(skip(self, claim), fields(provider_id = %claim.provider_id, member_id = %claim.member_id))]
    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, PortError> {
        let write = ClaimWrite {
            provider_id: claim.provider_id.value(),
            member_id: claim.member_id.value(),
            terminal_id: claim.terminal_id.map(|id| id.value()),
            amount: claim.amount.map(|amount| amount.value()),
            gop_id: None,
            created_at: claim.created_at,
        };
        let row = self.repository.insert_claim(&write).await?;
        Ok(claim_from_row(row))
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self.repository.get_claim(id.value()).await?;
        Ok(claim_from_row(row))
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn save_claim(&self, claim: &Claim) -> Result<(), PortError> {
        let write = ClaimWrite {
            provider_id: claim.provider_id.value(),
            member_id: claim.member_id.value(),
            terminal_id: claim.terminal_id.map(|id| id.value()),
            amount: claim.amount.map(|amount| amount.value()),
            gop_id: claim.gop_id.map(|id| id.value()),
            created_at: claim.created_at,
        };
        self.repository.update_claim(claim.id.value(), &write).await?;
        Ok(())
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// `None` when the scope can see nothing
fn filter_for(query: &GopQuery) -> Option<GopFilter> {
    let scope = match query.scope {
        Scope::All => ScopeClause::All,
        Scope::Provider(id) => ScopeClause::Provider(id.value()),
        Scope::Payer(id) => ScopeClause::Payer(id.value()),
        Scope::Nothing => return None,
    };

    let status = query.status.map(|filter| match filter {
        StatusFilter::Exact(status) => StatusClause::Exact(status_to_db(status)),
        StatusFilter::Initial => StatusClause::Initial,
        StatusFilter::Final => StatusClause::Final,
    });

    Some(GopFilter {
        scope,
        closed: query.visibility == Visibility::History,
        status,
        country: query.admin.country.clone(),
        provider_company: query.admin.provider_company.clone(),
        payer_company: query.admin.payer_company.clone(),
        search: query.search.clone(),
    })
}

fn code_ids(codes: &BTreeSet<DiagnosisCodeId>) -> Vec<i64> {
    codes.iter().map(|id| id.value()).collect()
}

fn status_to_db(status: GopStatus) -> DbGopStatus {
    match status {
        GopStatus::Pending => DbGopStatus::Pending,
        GopStatus::InReview => DbGopStatus::InReview,
        GopStatus::Approved => DbGopStatus::Approved,
        GopStatus::Declined => DbGopStatus::Declined,
    }
}

fn status_from_db(status: DbGopStatus) -> GopStatus {
    match status {
        DbGopStatus::Pending => GopStatus::Pending,
        DbGopStatus::InReview => GopStatus::InReview,
        DbGopStatus::Approved => GopStatus::Approved,
        DbGopStatus::Declined => GopStatus::Declined,
    }
}

/// Statuses missing from the grouped rows count as zero
fn counts_from_rows(rows: Vec<(DbGopStatus, i64)>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        counts.set(status_from_db(status), u64::try_from(count).unwrap_or_default());
    }
    counts
}

fn gop_write(gop: &GuaranteeOfPayment) -> Result<GopWrite, DatabaseError> {
    let content = &gop.content;
    let medical_details = content
        .medical_details
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DatabaseError::QueryFailed(format!("medical details: {e}")))?
        .map(Json);

    Ok(GopWrite {
        provider_id: gop.provider_id.value(),
        payer_id: gop.payer_id.value(),
        member_id: gop.member_id.value(),
        claim_id: gop.claim_id.map(|id| id.value()),
        doctor_name: content.doctor_name.clone(),
        patient_action_plan: content.patient_action_plan.clone(),
        patient_medical_no: content.patient_medical_no.clone(),
        admission_at: content.admission_at,
        reason: content.reason.map(|reason| reason.as_str().to_string()),
        room_type: content.room_type.map(|room| room.as_str().to_string()),
        room_price: content.financials.room_price.value(),
        doctor_fee: content.financials.doctor_fee.value(),
        surgery_fee: content.financials.surgery_fee.value(),
        medication_fee: content.financials.medication_fee.value(),
        quotation: content.financials.quotation.value(),
        medical_details,
        status: status_to_db(gop.status),
        closed: gop.closed,
        is_final: gop.is_final,
        reason_decline: gop.reason_decline.clone(),
        reason_close: gop.reason_close.clone(),
        stamp_author: gop.stamp_author.clone(),
        created_at: gop.created_at,
        edited_at: gop.edited_at,
    })
}

fn gop_from_row(row: GopRow, diagnosis_codes: BTreeSet<DiagnosisCodeId>) -> Result<GuaranteeOfPayment, DatabaseError> {
    let reason = row
        .reason
        .as_deref()
        .map(str::parse::<AdmissionReason>)
        .transpose()
        .map_err(|e| DatabaseError::corrupt(format!("gop {}: {e}", row.id)))?;
    let room_type = row
        .room_type
        .as_deref()
        .map(str::parse::<RoomType>)
        .transpose()
        .map_err(|e| DatabaseError::corrupt(format!("gop {}: {e}", row.id)))?;
    let medical_details = row
        .medical_details
        .map(|Json(value)| serde_json::from_value::<MedicalDetails>(value))
        .transpose()
        .map_err(|e| DatabaseError::corrupt(format!("gop {} medical details: {e}", row.id)))?;

    Ok(GuaranteeOfPayment {
        id: GopId::new(row.id),
        provider_id: ProviderId::new(row.provider_id),
        payer_id: PayerId::new(row.payer_id),
        member_id: MemberId::new(row.member_id),
        claim_id: row.claim_id.map(ClaimId::new),
        content: GopContent {
            doctor_name: row.doctor_name,
            patient_action_plan: row.patient_action_plan,
            patient_medical_no: row.patient_medical_no,
            admission_at: row.admission_at,
            reason,
            room_type,
            financials: Financials {
                room_price: Amount::new(row.room_price),
                doctor_fee: Amount::new(row.doctor_fee),
                surgery_fee: Amount::new(row.surgery_fee),
                medication_fee: Amount::new(row.medication_fee),
                quotation: Amount::new(row.quotation),
            },
            medical_details,
            diagnosis_codes,
        },
        status: status_from_db(row.status),
        closed: row.closed,
        is_final: row.is_final,
        reason_decline: row.reason_decline,
        reason_close: row.reason_close,
        stamp_author: row.stamp_author,
        created_at: row.created_at,
        edited_at: row.edited_at,
    })
}

fn claim_from_row(row: ClaimRow) -> Claim {
    Claim {
        id: ClaimId::new(row.id),
        provider_id: ProviderId::new(row.provider_id),
        member_id: MemberId::new(row.member_id),
        terminal_id: row.terminal_id.map(TerminalId::new),
        amount: row.amount.map(Amount::new),
        gop_id: row.gop_id.map(GopId::new),
        created_at: row.created_at,
    }
}
