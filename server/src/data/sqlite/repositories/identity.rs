//! Identity repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{IdentityRow, IdentityStatus, ListIdentitiesParams, Role};

const IDENTITY_COLUMNS: &str = "id, email, name, image, role, status, suspend_reason, \
     suspend_feedback, suspended_at, created_at, updated_at, last_logged_in";

type IdentityTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<i64>,
    i64,
    i64,
    i64,
);

fn into_row(t: IdentityTuple) -> Result<IdentityRow, SqliteError> {
    let (
        id,
        email,
        name,
        image,
        role,
        status,
        suspend_reason,
        suspend_feedback,
        suspended_at,
        created_at,
        updated_at,
        last_logged_in,
    ) = t;
    Ok(IdentityRow {
        id,
        email,
        name,
        image,
        role: Role::parse(&role).ok_or_else(|| SqliteError::corrupt("role", role))?,
        status: IdentityStatus::parse(&status)
            .ok_or_else(|| SqliteError::corrupt("status", status))?,
        suspend_reason,
        suspend_feedback,
        suspended_at,
        created_at,
        updated_at,
        last_logged_in,
    })
}

/// Register an identity on first sight, or refresh `last_logged_in`
///
/// New identities are always `borrower`/`active`. An existing record keeps its
/// role and status; missing profile fields are filled from the arguments.
pub async fn upsert_identity(
    pool: &SqlitePool,
    email: &str,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<IdentityRow, SqliteError> {
    let email = email.to_lowercase();
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO identities (id, email, name, image, role, status, created_at, updated_at, last_logged_in)
        VALUES (?, ?, ?, ?, 'borrower', 'active', ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            name = COALESCE(identities.name, excluded.name),
            image = COALESCE(identities.image, excluded.image),
            last_logged_in = excluded.last_logged_in,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(name)
    .bind(image)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_by_email(pool, &email)
        .await?
        .ok_or(SqliteError::Database(sqlx::Error::RowNotFound))
}

/// Get an identity by email (case-insensitive)
pub async fn get_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<IdentityRow>, SqliteError> {
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?");
    sqlx::query_as::<_, IdentityTuple>(&sql)
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await?
        .map(into_row)
        .transpose()
}

/// Get an identity by ID
pub async fn get_identity(pool: &SqlitePool, id: &str) -> Result<Option<IdentityRow>, SqliteError> {
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?");
    sqlx::query_as::<_, IdentityTuple>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(into_row)
        .transpose()
}

/// Page through identities, excluding the caller. Returns rows and the total match count.
pub async fn list_identities(
    pool: &SqlitePool,
    params: &ListIdentitiesParams,
) -> Result<(Vec<IdentityRow>, u64), SqliteError> {
    let pattern = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
    let role = params.role.map(|r| r.as_str());

    let filter = "email != ?1 \
         AND (?2 IS NULL OR role = ?2) \
         AND (?3 IS NULL OR lower(COALESCE(name, '')) LIKE ?3 ESCAPE '\\' OR email LIKE ?3 ESCAPE '\\')";

    let count_sql = format!("SELECT COUNT(*) FROM identities WHERE {filter}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(params.exclude_email.to_lowercase())
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

    let limit = params.limit.max(1);
    let offset = params.page.saturating_sub(1) as i64 * limit as i64;
    let list_sql = format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities WHERE {filter} \
         ORDER BY created_at DESC, id LIMIT ?4 OFFSET ?5"
    );
    let rows = sqlx::query_as::<_, IdentityTuple>(&list_sql)
        .bind(params.exclude_email.to_lowercase())
        .bind(role)
        .bind(pattern.as_deref())
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(into_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total.max(0) as u64))
}

/// Change an identity's role. Returns `None` if no identity has this email.
pub async fn set_role(
    pool: &SqlitePool,
    email: &str,
    role: Role,
) -> Result<Option<IdentityRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE identities SET role = ?, updated_at = ? WHERE email = ?")
        .bind(role.as_str())
        .bind(now)
        .bind(email.to_lowercase())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_by_email(pool, email).await
}

/// Update the owner-editable profile fields; `None` leaves a field unchanged
pub async fn update_profile(
    pool: &SqlitePool,
    email: &str,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<Option<IdentityRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE identities SET name = COALESCE(?, name), image = COALESCE(?, image), updated_at = ? WHERE email = ?",
    )
    .bind(name)
    .bind(image)
    .bind(now)
    .bind(email.to_lowercase())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_by_email(pool, email).await
}

/// Suspend an identity, recording reason and feedback
pub async fn suspend(
    pool: &SqlitePool,
    id: &str,
    reason: &str,
    feedback: &str,
) -> Result<Option<IdentityRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE identities
        SET status = 'suspended', suspend_reason = ?, suspend_feedback = ?, suspended_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(reason)
    .bind(feedback)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_identity(pool, id).await
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    fn list_params(exclude: &str) -> ListIdentitiesParams {
        ListIdentitiesParams {
            exclude_email: exclude.to_string(),
            search: None,
            role: None,
            page: 1,
            limit: 10,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_borrower() {
        let pool = test_pool().await;
        let identity = upsert_identity(&pool, "Ana@Example.com", Some("Ana"), None)
            .await
            .unwrap();

        assert!(!identity.id.is_empty());
        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(identity.name.as_deref(), Some("Ana"));
        assert_eq!(identity.role, Role::Borrower);
        assert_eq!(identity.status, IdentityStatus::Active);
    }

    #[tokio::test]
    async fn test_upsert_existing_keeps_role_and_id() {
        let pool = test_pool().await;
        let first = upsert_identity(&pool, "ana@example.com", None, None)
            .await
            .unwrap();
        set_role(&pool, "ana@example.com", Role::Manager)
            .await
            .unwrap();

        let second = upsert_identity(&pool, "ana@example.com", Some("Ana"), None)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.role, Role::Manager);
        assert_eq!(second.name.as_deref(), Some("Ana"));
        assert!(second.last_logged_in >= first.last_logged_in);
    }

    #[tokio::test]
    async fn test_get_by_email_and_id() {
        let pool = test_pool().await;
        let created = upsert_identity(&pool, "bo@example.com", None, None)
            .await
            .unwrap();

        let by_email = get_by_email(&pool, "BO@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
        let by_id = get_identity(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "bo@example.com");
        let nobody = get_by_email(&pool, "nobody@example.com").await.unwrap();
        assert!(nobody.is_none());
    }

    #[tokio::test]
    async fn test_set_role_unknown_email() {
        let pool = test_pool().await;
        assert!(
            set_role(&pool, "ghost@example.com", Role::Admin)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_excludes_caller_and_paginates() {
        let pool = test_pool().await;
        for i in 0..7 {
            upsert_identity(&pool, &format!("user{i}@example.com"), None, None)
                .await
                .unwrap();
        }
        upsert_identity(&pool, "admin@example.com", None, None)
            .await
            .unwrap();

        let mut params = list_params("admin@example.com");
        params.limit = 5;
        let (page1, total) = list_identities(&pool, &params).await.unwrap();
        assert_eq!(total, 7);
        assert_eq!(page1.len(), 5);
        assert!(page1.iter().all(|i| i.email != "admin@example.com"));

        params.page = 2;
        let (page2, _) = list_identities(&pool, &params).await.unwrap();
        assert_eq!(page2.len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_role_and_search() {
        let pool = test_pool().await;
        upsert_identity(&pool, "maria@example.com", Some("Maria Lopez"), None)
            .await
            .unwrap();
        upsert_identity(&pool, "tom@example.com", Some("Tom"), None)
            .await
            .unwrap();
        upsert_identity(&pool, "lopez.j@example.com", None, None)
            .await
            .unwrap();
        set_role(&pool, "tom@example.com", Role::Manager)
            .await
            .unwrap();

        let mut params = list_params("admin@example.com");
        params.search = Some("LOPEZ".to_string());
        let (rows, total) = list_identities(&pool, &params).await.unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.email != "tom@example.com"));

        let mut params = list_params("admin@example.com");
        params.role = Some(Role::Manager);
        let (rows, _) = list_identities(&pool, &params).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "tom@example.com");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let pool = test_pool().await;
        upsert_identity(&pool, "a_b@example.com", None, None)
            .await
            .unwrap();
        upsert_identity(&pool, "axb@example.com", None, None)
            .await
            .unwrap();

        let mut params = list_params("admin@example.com");
        params.search = Some("a_b".to_string());
        let (rows, _) = list_identities(&pool, &params).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "a_b@example.com");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let pool = test_pool().await;
        upsert_identity(&pool, "ana@example.com", Some("Ana"), Some("a.png"))
            .await
            .unwrap();

        let updated = update_profile(&pool, "ana@example.com", Some("Ana Maria"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ana Maria"));
        assert_eq!(updated.image.as_deref(), Some("a.png"));

        assert!(
            update_profile(&pool, "ghost@example.com", Some("x"), None)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_suspend() {
        let pool = test_pool().await;
        let identity = upsert_identity(&pool, "ana@example.com", None, None)
            .await
            .unwrap();

        let suspended = suspend(&pool, &identity.id, "fraud", "Contact support")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(suspended.status, IdentityStatus::Suspended);
        assert_eq!(suspended.suspend_reason.as_deref(), Some("fraud"));
        assert_eq!(
            suspended.suspend_feedback.as_deref(),
            Some("Contact support")
        );
        assert!(suspended.suspended_at.is_some());
        assert!(!suspended.is_active());

        assert!(suspend(&pool, "missing", "x", "y").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_role_is_reported() {
        let pool = test_pool().await;
        // Bypass the CHECK constraint to simulate a hand-edited row
        sqlx::query("PRAGMA ignore_check_constraints = ON")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO identities (id, email, role, status, created_at, updated_at, last_logged_in) \
             VALUES ('x', 'odd@example.com', 'owner', 'active', 0, 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = get_by_email(&pool, "odd@example.com").await.unwrap_err();
        assert!(matches!(err, SqliteError::Corrupt { column: "role", .. }));
    }
}
