//! Loan product repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{LoanRow, LoanUpdate, NewLoan};

const LOAN_COLUMNS: &str = "id, title, description, category, image, interest_rate, \
     max_loan_limit, required_documents, emi_plans, show_on_home, created_by, created_at, updated_at";

type LoanTuple = (
    String,
    String,
    String,
    String,
    Option<String>,
    f64,
    f64,
    String,
    String,
    bool,
    String,
    i64,
    i64,
);

fn into_row(t: LoanTuple) -> Result<LoanRow, SqliteError> {
    let (
        id,
        title,
        description,
        category,
        image,
        interest_rate,
        max_loan_limit,
        required_documents,
        emi_plans,
        show_on_home,
        created_by,
        created_at,
        updated_at,
    ) = t;
    Ok(LoanRow {
        id,
        title,
        description,
        category,
        image,
        interest_rate,
        max_loan_limit,
        required_documents: decode_list("required_documents", &required_documents)?,
        emi_plans: decode_list("emi_plans", &emi_plans)?,
        show_on_home,
        created_by,
        created_at,
        updated_at,
    })
}

fn decode_list(column: &'static str, raw: &str) -> Result<Vec<String>, SqliteError> {
    serde_json::from_str(raw).map_err(|_| SqliteError::corrupt(column, raw))
}

fn encode_list(list: &[String]) -> String {
    serde_json::Value::from(list.to_vec()).to_string()
}

/// Create a loan product with a generated CUID2 ID
pub async fn create_loan(pool: &SqlitePool, loan: &NewLoan) -> Result<LoanRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO loans (id, title, description, category, image, interest_rate, max_loan_limit,
                           required_documents, emi_plans, show_on_home, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&loan.title)
    .bind(&loan.description)
    .bind(&loan.category)
    .bind(loan.image.as_deref())
    .bind(loan.interest_rate)
    .bind(loan.max_loan_limit)
    .bind(encode_list(&loan.required_documents))
    .bind(encode_list(&loan.emi_plans))
    .bind(loan.show_on_home)
    .bind(&loan.created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(LoanRow {
        id,
        title: loan.title.clone(),
        description: loan.description.clone(),
        category: loan.category.clone(),
        image: loan.image.clone(),
        interest_rate: loan.interest_rate,
        max_loan_limit: loan.max_loan_limit,
        required_documents: loan.required_documents.clone(),
        emi_plans: loan.emi_plans.clone(),
        show_on_home: loan.show_on_home,
        created_by: loan.created_by.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_loan(pool: &SqlitePool, id: &str) -> Result<Option<LoanRow>, SqliteError> {
    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?");
    sqlx::query_as::<_, LoanTuple>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(into_row)
        .transpose()
}

/// Apply a partial update. Returns `None` if the loan does not exist.
pub async fn update_loan(
    pool: &SqlitePool,
    id: &str,
    update: &LoanUpdate,
) -> Result<Option<LoanRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE loans SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            image = COALESCE(?, image),
            interest_rate = COALESCE(?, interest_rate),
            max_loan_limit = COALESCE(?, max_loan_limit),
            required_documents = COALESCE(?, required_documents),
            emi_plans = COALESCE(?, emi_plans),
            show_on_home = COALESCE(?, show_on_home),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(update.title.as_deref())
    .bind(update.description.as_deref())
    .bind(update.category.as_deref())
    .bind(update.image.as_deref())
    .bind(update.interest_rate)
    .bind(update.max_loan_limit)
    .bind(update.required_documents.as_deref().map(encode_list))
    .bind(update.emi_plans.as_deref().map(encode_list))
    .bind(update.show_on_home)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_loan(pool, id).await
}

/// Delete a loan. Returns `true` if a row was removed.
pub async fn delete_loan(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM loans WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    fn sample_loan() -> NewLoan {
        NewLoan {
            title: "Small Business Starter".to_string(),
            description: "Working capital for new shops".to_string(),
            category: "Business".to_string(),
            image: None,
            interest_rate: 7.5,
            max_loan_limit: 25_000.0,
            required_documents: vec!["NID".to_string(), "Trade licence".to_string()],
            emi_plans: vec!["6 months".to_string(), "12 months".to_string()],
            show_on_home: true,
            created_by: "manager@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_loan() {
        let pool = test_pool().await;
        let created = create_loan(&pool, &sample_loan()).await.unwrap();

        let fetched = get_loan(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Small Business Starter");
        assert_eq!(fetched.required_documents, vec!["NID", "Trade licence"]);
        assert_eq!(fetched.emi_plans.len(), 2);
        assert!(fetched.show_on_home);
        assert_eq!(fetched.created_by, "manager@example.com");
    }

    #[tokio::test]
    async fn test_update_loan_partial() {
        let pool = test_pool().await;
        let created = create_loan(&pool, &sample_loan()).await.unwrap();

        let update = LoanUpdate {
            interest_rate: Some(6.0),
            emi_plans: Some(vec!["24 months".to_string()]),
            show_on_home: Some(false),
            ..Default::default()
        };
        let updated = update_loan(&pool, &created.id, &update)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.interest_rate, 6.0);
        assert_eq!(updated.emi_plans, vec!["24 months"]);
        assert!(!updated.show_on_home);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.required_documents, created.required_documents);
    }

    #[tokio::test]
    async fn test_update_missing_loan() {
        let pool = test_pool().await;
        let update = LoanUpdate {
            title: Some("x".to_string()),
            ..Default::default()
        };
        let missing = update_loan(&pool, "missing", &update).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_loan() {
        let pool = test_pool().await;
        let created = create_loan(&pool, &sample_loan()).await.unwrap();

        assert!(delete_loan(&pool, &created.id).await.unwrap());
        assert!(!delete_loan(&pool, &created.id).await.unwrap());
        assert!(get_loan(&pool, &created.id).await.unwrap().is_none());
    }
}
