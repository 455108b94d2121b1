//! 开票流程使用的持久化接口.
//!
//! 一个 [`IssuanceSession`] 对应一个数据库事务: 未调用 `commit` 就被丢弃时全部回滚.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::models::{Branch, Category, InvoiceCounter, InvoiceItem, LineItem, NewInvoiceItem};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    type Session: IssuanceSession;

    async fn begin(&self) -> AppResult<Self::Session>;
}

#[async_trait]
pub trait IssuanceSession: Send + Sized {
    async fn branch(&mut self, branch_id: Uuid) -> AppResult<Option<Branch>>;

    async fn categories(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<Category>>;

    /// 锁定分店计数器行直到事务结束
    async fn lock_invoice_counter(&mut self, branch_id: Uuid) -> AppResult<Option<InvoiceCounter>>;

    /// 锁定并返回候选流水 (数量 > 0), 顺序即匹配顺序
    async fn lock_candidates(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<LineItem>>;

    /// 扣减数量, 返回扣减后的剩余数量; 剩余不足或行不存在时返回 None
    async fn consume_quantity(&mut self, line_item_id: Uuid, quantity: i32) -> AppResult<Option<i32>>;

    async fn insert_invoice_item(&mut self, item: &NewInvoiceItem) -> AppResult<InvoiceItem>;

    async fn advance_invoice_counter(&mut self, invoice_id: Uuid, invoice_number: i32) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;
}

/// Postgres 实现
#[derive(Clone)]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    type Session = PgSession;

    async fn begin(&self) -> AppResult<PgSession> {
        let tx = self.pool.begin().await?;
        Ok(PgSession { tx })
    }
}

#[async_trait]
impl IssuanceSession for PgSession {
    async fn branch(&mut self, branch_id: Uuid) -> AppResult<Option<Branch>> {
        Ok(queries::get_branch(&mut *self.tx, branch_id).await?)
    }

    async fn categories(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<Category>> {
        Ok(queries::list_categories(&mut *self.tx, user_id, category_ids).await?)
    }

    async fn lock_invoice_counter(&mut self, branch_id: Uuid) -> AppResult<Option<InvoiceCounter>> {
        Ok(queries::lock_invoice_counter(&mut *self.tx, branch_id).await?)
    }

    async fn lock_candidates(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<LineItem>> {
        Ok(queries::lock_candidates(&mut *self.tx, user_id, category_ids).await?)
    }

    async fn consume_quantity(&mut self, line_item_id: Uuid, quantity: i32) -> AppResult<Option<i32>> {
        Ok(queries::consume_quantity(&mut *self.tx, line_item_id, quantity).await?)
    }

    async fn insert_invoice_item(&mut self, item: &NewInvoiceItem) -> AppResult<InvoiceItem> {
        Ok(queries::insert_invoice_item(&mut *self.tx, item).await?)
    }

    async fn advance_invoice_counter(&mut self, invoice_id: Uuid, invoice_number: i32) -> AppResult<()> {
        let updated = queries::advance_invoice_counter(&mut *self.tx, invoice_id, invoice_number).await?;
        if updated != 1 {
            return Err(AppError::ConcurrencyConflict(format!(
                "invoice counter {} already at or beyond {}",
                invoice_id, invoice_number
            )));
        }
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
