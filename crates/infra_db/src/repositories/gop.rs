//! GOP repository implementation
//!
//! Database access for requests, their diagnosis-code links and the claim
//! shells created from terminals. Listing queries are assembled with
//! [`QueryBuilder`] from a [`GopFilter`] that already carries the caller's
//! tenant scope.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::DatabaseError;

/// Columns selected for every GOP read, aliased against `gops g`
const GOP_COLUMNS: &str = r#"
    g.id, g.provider_id, g.payer_id, g.member_id, g.claim_id,
    g.doctor_name, g.patient_action_plan, g.patient_medical_no, g.admission_at,
    g.reason, g.room_type,
    g.room_price, g.doctor_fee, g.surgery_fee, g.medication_fee, g.quotation,
    g.medical_details, g.status, g.closed, g."final" AS is_final,
    g.reason_decline, g.reason_close, g.stamp_author,
    g.created_at, g.edited_at
"#;

const LISTING_FROM: &str = r#"
    FROM gops g
    JOIN providers p ON p.id = g.provider_id
    JOIN payers y ON y.id = g.payer_id
    JOIN members m ON m.id = g.member_id
    WHERE TRUE
"#;

/// Columns matched by free-text search
const SEARCH_COLUMNS: [&str; 7] = [
    "m.name",
    "m.national_id",
    "g.doctor_name",
    "g.patient_medical_no",
    "p.company",
    "y.company",
    "g.status::text",
];

/// Repository for GOP requests and claim shells
#[derive(Debug, Clone)]
pub struct GopRepository {
    pool: PgPool,
}

impl GopRepository {
    /// Creates a new GopRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Inserts a request together with its diagnosis-code links
    ///
    /// # Returns
    ///
    /// The stored row with its assigned id
    pub async fn insert(&self, gop: &GopWrite, codes: &[i64]) -> Result<GopRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO gops AS g (
                provider_id, payer_id, member_id, claim_id,
                doctor_name, patient_action_plan, patient_medical_no, admission_at,
                reason, room_type,
                room_price, doctor_fee, surgery_fee, medication_fee, quotation,
                medical_details, status, closed, "final",
                reason_decline, reason_close, stamp_author,
                created_at, edited_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            RETURNING {GOP_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, GopRow>(&sql)
            .bind(gop.provider_id)
            .bind(gop.payer_id)
            .bind(gop.member_id)
            .bind(gop.claim_id)
            .bind(&gop.doctor_name)
            .bind(&gop.patient_action_plan)
            .bind(&gop.patient_medical_no)
            .bind(gop.admission_at)
            .bind(&gop.reason)
            .bind(&gop.room_type)
            .bind(gop.room_price)
            .bind(gop.doctor_fee)
            .bind(gop.surgery_fee)
            .bind(gop.medication_fee)
            .bind(gop.quotation)
            .bind(&gop.medical_details)
            .bind(gop.status)
            .bind(gop.closed)
            .bind(gop.is_final)
            .bind(&gop.reason_decline)
            .bind(&gop.reason_close)
            .bind(&gop.stamp_author)
            .bind(gop.created_at)
            .bind(gop.edited_at)
            .fetch_one(&mut *tx)
            .await?;

        link_codes(&mut tx, row.id, codes).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Retrieves a request by id
    pub async fn get(&self, id: i64) -> Result<GopRow, DatabaseError> {
        let sql = format!("SELECT {GOP_COLUMNS} FROM gops g WHERE g.id = $1");
        sqlx::query_as::<_, GopRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("GuaranteeOfPayment", id))
    }

    /// Overwrites every mutable column and replaces the diagnosis-code links
    ///
    /// Reopening a closed request is refused by the `gops_keep_closed`
    /// trigger and surfaces as a constraint violation.
    pub async fn update(&self, id: i64, gop: &GopWrite, codes: &[i64]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE gops AS g SET
                provider_id = $2, payer_id = $3, member_id = $4, claim_id = $5,
                doctor_name = $6, patient_action_plan = $7, patient_medical_no = $8,
                admission_at = $9, reason = $10, room_type = $11,
                room_price = $12, doctor_fee = $13, surgery_fee = $14,
                medication_fee = $15, quotation = $16,
                medical_details = $17, status = $18, closed = $19, "final" = $20,
                reason_decline = $21, reason_close = $22, stamp_author = $23,
                created_at = $24, edited_at = $25
            WHERE g.id = $1
            RETURNING g.id
            "#,
        )
        .bind(id)
        .bind(gop.provider_id)
        .bind(gop.payer_id)
        .bind(gop.member_id)
        .bind(gop.claim_id)
        .bind(&gop.doctor_name)
        .bind(&gop.patient_action_plan)
        .bind(&gop.patient_medical_no)
        .bind(gop.admission_at)
        .bind(&gop.reason)
        .bind(&gop.room_type)
        .bind(gop.room_price)
        .bind(gop.doctor_fee)
        .bind(gop.surgery_fee)
        .bind(gop.medication_fee)
        .bind(gop.quotation)
        .bind(&gop.medical_details)
        .bind(gop.status)
        .bind(gop.closed)
        .bind(gop.is_final)
        .bind(&gop.reason_decline)
        .bind(&gop.reason_close)
        .bind(&gop.stamp_author)
        .bind(gop.created_at)
        .bind(gop.edited_at)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Err(DatabaseError::not_found("GuaranteeOfPayment", id));
        }

        sqlx::query("DELETE FROM gop_diagnosis_codes WHERE gop_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_codes(&mut tx, id, codes).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Returns one page of requests, newest first
    pub async fn list(&self, filter: &GopFilter, limit: i64, offset: i64) -> Result<Vec<GopRow>, DatabaseError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {GOP_COLUMNS} {LISTING_FROM}"));
        filter.push_base(&mut builder);
        filter.push_status(&mut builder);
        builder.push(" ORDER BY g.created_at DESC, g.id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder.build_query_as::<GopRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Counts rows matching the whole filter
    pub async fn count(&self, filter: &GopFilter) -> Result<i64, DatabaseError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {LISTING_FROM}"));
        filter.push_base(&mut builder);
        filter.push_status(&mut builder);

        let total = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// Counts rows per status, ignoring the filter's status clause
    ///
    /// Statuses with no rows are absent from the result; callers zero-fill.
    pub async fn count_by_status(&self, filter: &GopFilter) -> Result<Vec<(DbGopStatus, i64)>, DatabaseError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT g.status, COUNT(*) {LISTING_FROM}"));
        filter.push_base(&mut builder);
        builder.push(" GROUP BY g.status");

        let counts = builder
            .build_query_as::<(DbGopStatus, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(counts)
    }

    /// Diagnosis-code links for a set of requests, as `(gop_id, code_id)` pairs
    pub async fn codes_for(&self, gop_ids: &[i64]) -> Result<Vec<(i64, i64)>, DatabaseError> {
        let links = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT gop_id, diagnosis_code_id
            FROM gop_diagnosis_codes
            WHERE gop_id = ANY($1)
            ORDER BY gop_id, diagnosis_code_id
            "#,
        )
        .bind(gop_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    /// The subset of `ids` that exist in the diagnosis-code table
    pub async fn existing_codes(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM diagnosis_codes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(existing)
    }

    // ========================================================================
    // Claims
    // ========================================================================

    pub async fn insert_claim(&self, claim: &ClaimWrite) -> Result<ClaimRow, DatabaseError> {
        let row = sqlx::query_as::<_, ClaimRow>(
            r#"
            INSERT INTO claims (provider_id, member_id, terminal_id, amount, gop_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, provider_id, member_id, terminal_id, amount, gop_id, created_at
            "#,
        )
        .bind(claim.provider_id)
        .bind(claim.member_id)
        .bind(claim.terminal_id)
        .bind(claim.amount)
        .bind(claim.gop_id)
        .bind(claim.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_claim(&self, id: i64) -> Result<ClaimRow, DatabaseError> {
        sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT id, provider_id, member_id, terminal_id, amount, gop_id, created_at
            FROM claims
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", id))
    }

    pub async fn update_claim(&self, id: i64, claim: &ClaimWrite) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET provider_id = $2, member_id = $3, terminal_id = $4, amount = $5, gop_id = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(claim.provider_id)
        .bind(claim.member_id)
        .bind(claim.terminal_id)
        .bind(claim.amount)
        .bind(claim.gop_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", id));
        }
        Ok(())
    }
}

async fn link_codes(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    gop_id: i64,
    codes: &[i64],
) -> Result<(), DatabaseError> {
    if codes.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO gop_diagnosis_codes (gop_id, diagnosis_code_id)
        SELECT $1, UNNEST($2::bigint[])
        "#,
    )
    .bind(gop_id)
    .bind(codes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Escapes `%`, `_` and the escape character itself for a LIKE pattern
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ============================================================================
// Listing filter
// ============================================================================

/// Tenant scope of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeClause {
    All,
    Provider(i64),
    Payer(i64),
}

/// Status clause, including the approved-and-final split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClause {
    Exact(DbGopStatus),
    Initial,
    Final,
}

/// A listing filter in database terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopFilter {
    pub scope: ScopeClause,
    pub closed: bool,
    pub status: Option<StatusClause>,
    pub country: Option<String>,
    pub provider_company: Option<String>,
    pub payer_company: Option<String>,
    pub search: Option<String>,
}

impl GopFilter {
    /// Scope, archive flag, admin filters and search
    fn push_base(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self.scope {
            ScopeClause::All => {}
            ScopeClause::Provider(id) => {
                builder.push(" AND g.provider_id = ");
                builder.push_bind(id);
            }
            ScopeClause::Payer(id) => {
                builder.push(" AND g.payer_id = ");
                builder.push_bind(id);
            }
        }

        builder.push(" AND g.closed = ");
        builder.push_bind(self.closed);

        for (column, value) in [
            ("p.country", &self.country),
            ("p.company", &self.provider_company),
            ("y.company", &self.payer_company),
        ] {
            if let Some(value) = value {
                builder.push(format!(" AND lower({column}) = lower("));
                builder.push_bind(value.clone());
                builder.push(")");
            }
        }

        if let Some(term) = &self.search {
            let pattern = like_pattern(term);
            builder.push(" AND (");
            for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(format!("{column} ILIKE "));
                builder.push_bind(pattern.clone());
            }
            builder.push(")");
        }
    }

    fn push_status(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self.status {
            None => {}
            Some(StatusClause::Exact(status)) => {
                builder.push(" AND g.status = ");
                builder.push_bind(status);
            }
            Some(StatusClause::Initial) => {
                builder.push(" AND g.status = 'approved' AND NOT g.\"final\"");
            }
            Some(StatusClause::Final) => {
                builder.push(" AND g.status = 'approved' AND g.\"final\"");
            }
        }
    }
}

// ============================================================================
// Type definitions
// ============================================================================

/// Request status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "gop_status", rename_all = "snake_case")]
pub enum DbGopStatus {
    Pending,
    InReview,
    Approved,
    Declined,
}

/// Database row for a request
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GopRow {
    pub id: i64,
    pub provider_id: i64,
    pub payer_id: i64,
    pub member_id: i64,
    pub claim_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub patient_action_plan: Option<String>,
    pub patient_medical_no: Option<String>,
    pub admission_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
    pub room_type: Option<String>,
    pub room_price: Decimal,
    pub doctor_fee: Decimal,
    pub surgery_fee: Decimal,
    pub medication_fee: Decimal,
    pub quotation: Decimal,
    pub medical_details: Option<Json<serde_json::Value>>,
    pub status: DbGopStatus,
    pub closed: bool,
    pub is_final: bool,
    pub reason_decline: Option<String>,
    pub reason_close: Option<String>,
    pub stamp_author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Column values written on insert and update
#[derive(Debug, Clone)]
pub struct GopWrite {
    pub provider_id: i64,
    pub payer_id: i64,
    pub member_id: i64,
    pub claim_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub patient_action_plan: Option<String>,
    pub patient_medical_no: Option<String>,
    pub admission_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
    pub room_type: Option<String>,
    pub room_price: Decimal,
    pub doctor_fee: Decimal,
    pub surgery_fee: Decimal,
    pub medication_fee: Decimal,
    pub quotation: Decimal,
    pub medical_details: Option<Json<serde_json::Value>>,
    pub status: DbGopStatus,
    pub closed: bool,
    pub is_final: bool,
    pub reason_decline: Option<String>,
    pub reason_close: Option<String>,
    pub stamp_author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Database row for a claim shell
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub id: i64,
    pub provider_id: i64,
    pub member_id: i64,
    pub terminal_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub gop_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Column values written for a claim shell
#[derive(Debug, Clone)]
pub struct ClaimWrite {
    pub provider_id: i64,
    pub member_id: i64,
    pub terminal_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub gop_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
