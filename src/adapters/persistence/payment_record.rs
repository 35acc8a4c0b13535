use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment::{
        CompletedPayment, NewPaymentRecord, PaymentRecord, PaymentRecordRepo,
    },
    domain::entities::payment_status::PaymentStatus,
};

const SELECT_COLS: &str = r#"
    session_id, user_id, plan_id, plan_name, amount, status,
    gateway_state, transaction_id, payment_mode, paid_amount,
    provisioned_at, created_at, updated_at
"#;

fn row_to_record(row: sqlx::postgres::PgRow) -> PaymentRecord {
    PaymentRecord {
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        plan_name: row.get("plan_name"),
        amount: row.get("amount"),
        status: row.get::<PaymentStatus, _>("status"),
        gateway_state: row.get("gateway_state"),
        transaction_id: row.get("transaction_id"),
        payment_mode: row.get("payment_mode"),
        paid_amount: row.get("paid_amount"),
        provisioned_at: row.get("provisioned_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl PaymentRecordRepo for PostgresPersistence {
    async fn create(&self, record: &NewPaymentRecord) -> AppResult<PaymentRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_records (session_id, user_id, plan_id, plan_name, amount, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (session_id) DO NOTHING
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(&record.session_id)
        .bind(&record.user_id)
        .bind(&record.plan_id)
        .bind(&record.plan_name)
        .bind(record.amount)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        row.map(row_to_record).ok_or(AppError::DuplicateSession)
    }

    async fn get(&self, session_id: &str) -> AppResult<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM payment_records WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_record))
    }

    async fn mark_completed(
        &self,
        session_id: &str,
        payment: &CompletedPayment,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                status = 'completed',
                gateway_state = $2,
                transaction_id = $3,
                payment_mode = $4,
                paid_amount = $5,
                updated_at = NOW()
            WHERE session_id = $1 AND status = 'pending'
            "#,
        )
        .bind(session_id)
        .bind(&payment.gateway_state)
        .bind(&payment.transaction_id)
        .bind(&payment.payment_mode)
        .bind(payment.paid_amount)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, session_id: &str, gateway_state: Option<&str>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                status = 'failed',
                gateway_state = COALESCE($2, gateway_state),
                updated_at = NOW()
            WHERE session_id = $1 AND status = 'pending'
            "#,
        )
        .bind(session_id)
        .bind(gateway_state)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_provisioned(&self, session_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE payment_records SET provisioned_at = NOW(), updated_at = NOW()
            WHERE session_id = $1 AND status = 'completed' AND provisioned_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(())
    }
}
