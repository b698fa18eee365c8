//! Directory repository implementation
//!
//! Accounts, provider and payer organisations, doctors and members. Lookups
//! that depend on tenant ownership join on the owning key, so a row outside
//! the tenant is reported exactly like a missing one.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::DatabaseError;

const MEMBER_COLUMNS: &str = r#"
    id, name, dob, gender, national_id, tel, email, address, photo,
    policy_number, device_uid
"#;

const PAYER_COLUMNS: &str = r#"
    y.id, y.company, y.payer_type, y.pic, y.pic_email, y.pic_alt_email,
    y.tel, y.country, y.user_id
"#;

/// Repository for accounts, organisations and members
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    /// Creates a new DirectoryRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn get_user(&self, id: i64) -> Result<UserRow, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, user_type, provider_id, payer_id, member_id, premium
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", id))
    }

    /// Inserts an account
    ///
    /// A taken email surfaces as `DatabaseError::DuplicateEntry`.
    pub async fn insert_user(&self, user: &UserWrite) -> Result<UserRow, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password_digest, role, user_type, provider_id, payer_id, member_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, email, role, user_type, provider_id, payer_id, member_id, premium
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_digest)
        .bind(user.role)
        .bind(user.user_type)
        .bind(user.provider_id)
        .bind(user.payer_id)
        .bind(user.member_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn link_payer_account(&self, payer_id: i64, user_id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE payers SET user_id = $2 WHERE id = $1")
            .bind(payer_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payer", payer_id));
        }
        Ok(())
    }

    // ========================================================================
    // Organisations
    // ========================================================================

    pub async fn get_provider(&self, id: i64) -> Result<ProviderRow, DatabaseError> {
        sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT
                p.id, p.company, p.provider_type, p.pic, p.pic_email, p.tel, p.country, p.user_id,
                COALESCE(
                    ARRAY(SELECT pp.payer_id FROM provider_payers pp WHERE pp.provider_id = p.id ORDER BY pp.payer_id),
                    '{}'
                ) AS payer_ids
            FROM providers p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Provider", id))
    }

    pub async fn get_payer(&self, id: i64) -> Result<PayerRow, DatabaseError> {
        let sql = format!("SELECT {PAYER_COLUMNS} FROM payers y WHERE y.id = $1");
        sqlx::query_as::<_, PayerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Payer", id))
    }

    /// Retrieves a payer only through the provider's contract list
    pub async fn find_provider_payer(&self, provider_id: i64, payer_id: i64) -> Result<PayerRow, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {PAYER_COLUMNS}
            FROM payers y
            JOIN provider_payers pp ON pp.payer_id = y.id
            WHERE pp.provider_id = $1 AND y.id = $2
            "#
        );
        sqlx::query_as::<_, PayerRow>(&sql)
            .bind(provider_id)
            .bind(payer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Payer", payer_id))
    }

    pub async fn find_provider_doctor(&self, provider_id: i64, doctor_id: i64) -> Result<DoctorRow, DatabaseError> {
        sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT id, provider_id, name, department
            FROM doctors
            WHERE provider_id = $1 AND id = $2
            "#,
        )
        .bind(provider_id)
        .bind(doctor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Doctor", doctor_id))
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub async fn get_member(&self, id: i64) -> Result<MemberRow, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, MemberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Member", id))
    }

    pub async fn find_member_by_national_id(&self, national_id: &str) -> Result<Option<MemberRow>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE national_id = $1");
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(national_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_member_by_device(&self, device_uid: &str) -> Result<Option<MemberRow>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE device_uid = $1");
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(device_uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn insert_member(&self, member: &MemberWrite) -> Result<MemberRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO members (name, dob, gender, national_id, tel, email, address, photo, policy_number, device_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(&member.name)
            .bind(member.dob)
            .bind(&member.gender)
            .bind(&member.national_id)
            .bind(&member.tel)
            .bind(&member.email)
            .bind(&member.address)
            .bind(&member.photo)
            .bind(&member.policy_number)
            .bind(&member.device_uid)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_member(&self, id: i64, member: &MemberWrite) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = $2, dob = $3, gender = $4, national_id = $5, tel = $6, email = $7,
                address = $8, photo = $9, policy_number = $10, device_uid = $11
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&member.name)
        .bind(member.dob)
        .bind(&member.gender)
        .bind(&member.national_id)
        .bind(&member.tel)
        .bind(&member.email)
        .bind(&member.address)
        .bind(&member.photo)
        .bind(&member.policy_number)
        .bind(&member.device_uid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Member", id));
        }
        Ok(())
    }
}

// ============================================================================
// Type definitions
// ============================================================================

/// Account role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum DbUserRole {
    Admin,
    UserAdmin,
    User,
}

/// Account organisation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_type", rename_all = "snake_case")]
pub enum DbUserType {
    Provider,
    Payer,
    Member,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: DbUserRole,
    pub user_type: Option<DbUserType>,
    pub provider_id: Option<i64>,
    pub payer_id: Option<i64>,
    pub member_id: Option<i64>,
    pub premium: bool,
}

#[derive(Debug, Clone)]
pub struct UserWrite {
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub role: DbUserRole,
    pub user_type: Option<DbUserType>,
    pub provider_id: Option<i64>,
    pub payer_id: Option<i64>,
    pub member_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderRow {
    pub id: i64,
    pub company: String,
    pub provider_type: Option<String>,
    pub pic: Option<String>,
    pub pic_email: Option<String>,
    pub tel: Option<String>,
    pub country: Option<String>,
    pub user_id: Option<i64>,
    pub payer_ids: Vec<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PayerRow {
    pub id: i64,
    pub company: String,
    pub payer_type: Option<String>,
    pub pic: Option<String>,
    pub pic_email: Option<String>,
    pub pic_alt_email: Option<String>,
    pub tel: Option<String>,
    pub country: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DoctorRow {
    pub id: i64,
    pub provider_id: i64,
    pub name: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub national_id: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub policy_number: Option<String>,
    pub device_uid: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberWrite {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub national_id: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub policy_number: Option<String>,
    pub device_uid: Option<String>,
}
