//! Loan application repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{
    ApplicationRow, ApplicationStatus, CancelOutcome, FeePayment, FeeStatus, FeeUpdateOutcome,
    NewApplication,
};

const APPLICATION_COLUMNS: &str = "id, loan_id, loan_title, user_email, loan_amount, status, \
     application_fee_status, approved_at, stripe_payment_id, payment_email, payment_amount, \
     paid_at, details, created_at, updated_at";

type ApplicationTuple = (
    String,
    String,
    String,
    String,
    f64,
    String,
    String,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<i64>,
    String,
    i64,
    i64,
);

fn into_row(t: ApplicationTuple) -> Result<ApplicationRow, SqliteError> {
    let (
        id,
        loan_id,
        loan_title,
        user_email,
        loan_amount,
        status,
        fee_status,
        approved_at,
        stripe_payment_id,
        payment_email,
        payment_amount,
        paid_at,
        details,
        created_at,
        updated_at,
    ) = t;
    Ok(ApplicationRow {
        id,
        loan_id,
        loan_title,
        user_email,
        loan_amount,
        status: ApplicationStatus::parse(&status)
            .ok_or_else(|| SqliteError::corrupt("status", status))?,
        application_fee_status: FeeStatus::parse(&fee_status)
            .ok_or_else(|| SqliteError::corrupt("application_fee_status", fee_status))?,
        approved_at,
        stripe_payment_id,
        payment_email,
        payment_amount,
        paid_at,
        details: serde_json::from_str(&details)
            .map_err(|_| SqliteError::corrupt("details", details.as_str()))?,
        created_at,
        updated_at,
    })
}

/// Insert a new application as `Pending` / `Unpaid`
pub async fn create_application(
    pool: &SqlitePool,
    application: &NewApplication,
) -> Result<ApplicationRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO loan_applications (id, loan_id, loan_title, user_email, loan_amount, status,
                                       application_fee_status, details, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'Pending', 'Unpaid', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&application.loan_id)
    .bind(&application.loan_title)
    .bind(application.user_email.to_lowercase())
    .bind(application.loan_amount)
    .bind(application.details.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(ApplicationRow {
        id,
        loan_id: application.loan_id.clone(),
        loan_title: application.loan_title.clone(),
        user_email: application.user_email.to_lowercase(),
        loan_amount: application.loan_amount,
        status: ApplicationStatus::Pending,
        application_fee_status: FeeStatus::Unpaid,
        approved_at: None,
        stripe_payment_id: None,
        payment_email: None,
        payment_amount: None,
        paid_at: None,
        details: application.details.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_application(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<ApplicationRow>, SqliteError> {
    let sql = format!("SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE id = ?");
    sqlx::query_as::<_, ApplicationTuple>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(into_row)
        .transpose()
}

/// Applications in a review state. Approved ones are ordered by approval time.
pub async fn list_by_status(
    pool: &SqlitePool,
    status: ApplicationStatus,
) -> Result<Vec<ApplicationRow>, SqliteError> {
    let order = match status {
        ApplicationStatus::Approved => "approved_at DESC, created_at DESC",
        _ => "created_at DESC",
    };
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE status = ? ORDER BY {order}, id"
    );
    sqlx::query_as::<_, ApplicationTuple>(&sql)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(into_row)
        .collect()
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_email: &str,
) -> Result<Vec<ApplicationRow>, SqliteError> {
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE user_email = ? ORDER BY created_at DESC, id"
    );
    sqlx::query_as::<_, ApplicationTuple>(&sql)
        .bind(user_email.to_lowercase())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(into_row)
        .collect()
}

/// Set the review status; `approved_at` is stamped only when entering `Approved`
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: ApplicationStatus,
) -> Result<Option<ApplicationRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE loan_applications SET
            approved_at = CASE WHEN ?1 = 'Approved' AND status != 'Approved' THEN ?2 ELSE approved_at END,
            status = ?1,
            updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(status.as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_application(pool, id).await
}

/// Delete the caller's own application while it is still `Pending` and `Unpaid`
pub async fn cancel_application(
    pool: &SqlitePool,
    id: &str,
    user_email: &str,
) -> Result<CancelOutcome, SqliteError> {
    let result = sqlx::query(
        "DELETE FROM loan_applications WHERE id = ? AND user_email = ? \
         AND status = 'Pending' AND application_fee_status = 'Unpaid'",
    )
    .bind(id)
    .bind(user_email.to_lowercase())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(CancelOutcome::Deleted);
    }

    match get_application(pool, id).await? {
        Some(app) if app.user_email == user_email.to_lowercase() => Ok(CancelOutcome::Locked),
        _ => Ok(CancelOutcome::NotFound),
    }
}

/// Move the application fee to `Paid` exactly once
///
/// The guard on the current fee state makes repeated or concurrent calls converge:
/// only the first writer changes the row, later calls observe `AlreadyPaid`.
pub async fn mark_fee_paid(
    pool: &SqlitePool,
    id: &str,
    payment: &FeePayment,
) -> Result<FeeUpdateOutcome, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE loan_applications SET
            application_fee_status = 'Paid',
            stripe_payment_id = ?,
            payment_email = ?,
            payment_amount = ?,
            paid_at = ?,
            updated_at = ?
        WHERE id = ? AND application_fee_status != 'Paid'
        "#,
    )
    .bind(&payment.stripe_payment_id)
    .bind(payment.payment_email.as_deref())
    .bind(payment.payment_amount)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    let current = get_application(pool, id).await?;
    Ok(match current {
        Some(row) if result.rows_affected() > 0 => FeeUpdateOutcome::Applied(row),
        Some(row) => FeeUpdateOutcome::AlreadyPaid(row),
        None => FeeUpdateOutcome::NotFound,
    })
}
