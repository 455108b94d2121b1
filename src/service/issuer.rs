use dashmap::DashMap;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::config::IssuerConfig;
use crate::db::{InvoiceStore, IssuanceSession};
use crate::error::{AppError, AppResult, Entity};
use crate::models::{
    Branch, CustomerInvoiceRequest, IssuedInvoice, IssuedLine, LineItem, NewInvoiceItem,
    PurchaseInvoiceRequest, RenderedDocument, Selection,
};
use crate::render::{DocumentLine, DocumentRenderer, InvoiceDocument};
use crate::service::matcher::{MatchOutcome, SubsetMatcher};

/// 按分店串行化的进程内锁, 数据库行锁负责跨进程
///
/// 表项只在有人持有或等待时存在, 最后一个持有者释放时移除.
#[derive(Debug, Clone, Default)]
pub struct BranchLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BranchLocks {
    pub async fn acquire(&self, branch_id: Uuid) -> BranchGuard {
        let lock = self.locks.entry(branch_id).or_default().clone();
        let guard = lock.lock_owned().await;
        BranchGuard {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            branch_id,
        }
    }

    /// 当前表中的分店数
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// 分店锁的持有凭证, drop 时释放锁并清理无人引用的表项
#[derive(Debug)]
pub struct BranchGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    branch_id: Uuid,
}

impl Drop for BranchGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // 等待者在 entry() 内克隆 Arc, 与 remove_if 同在分片锁下, 计数为 1 说明只剩表本身
        self.locks
            .remove_if(&self.branch_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// 开票服务: 匹配采购流水 -> 扣减数量 -> 生成发票号 -> 渲染
///
/// 扣减、建票、推进计数器和渲染在同一个事务内完成, 任何一步失败都整体回滚.
pub struct InvoiceIssuer<S: InvoiceStore> {
    store: S,
    renderer: Arc<dyn DocumentRenderer>,
    matcher: SubsetMatcher,
    max_retries: u32,
    branch_locks: BranchLocks,
}

impl<S: InvoiceStore> InvoiceIssuer<S> {
    pub fn new(store: S, renderer: Arc<dyn DocumentRenderer>, config: &IssuerConfig) -> Self {
        Self {
            store,
            renderer,
            matcher: SubsetMatcher::with_budget(config.max_search_steps),
            max_retries: config.max_retries,
            branch_locks: BranchLocks::default(),
        }
    }

    /// 当前持有或等待分店锁的分店数
    pub fn locked_branches(&self) -> usize {
        self.branch_locks.len()
    }

    /// 采购发票入口, 并发冲突时重试
    pub async fn issue_purchase_invoice(
        &self,
        request: &PurchaseInvoiceRequest,
    ) -> AppResult<IssuedInvoice> {
        request.validate()?;

        // 保序去重
        let category_ids: Vec<Uuid> = request
            .category_ids
            .iter()
            .copied()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        let _guard = self.branch_locks.acquire(request.branch_id).await;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_issue(request, &category_ids).await {
                Err(err) if err.is_retryable() && attempt <= self.max_retries => {
                    tracing::warn!(
                        "[Issuer] Branch {}: 第 {} 次尝试发生并发冲突, 重试: {}",
                        request.branch_id, attempt, err
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_issue(
        &self,
        request: &PurchaseInvoiceRequest,
        category_ids: &[Uuid],
    ) -> AppResult<IssuedInvoice> {
        let mut session = self.store.begin().await?;

        // 1-3: 只读阶段 (候选行和计数器已加锁)
        let branch = session
            .branch(request.branch_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Branch))?;

        let categories = session.categories(branch.user_id, category_ids).await?;
        if categories.is_empty() {
            return Err(AppError::NotFound(Entity::Category));
        }
        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();

        let counter = session
            .lock_invoice_counter(branch.id)
            .await?
            .ok_or(AppError::NotFound(Entity::InvoiceCounter))?;

        let candidates = session.lock_candidates(branch.user_id, &category_ids).await?;
        if candidates.is_empty() {
            return Err(AppError::NotFound(Entity::LineItemPool));
        }

        tracing::info!(
            "[Issuer] Branch {}: 目标金额 {}, {} 个分类, {} 条候选流水",
            branch.id, request.total_amount, category_ids.len(), candidates.len()
        );

        // 4: 匹配 (CPU 密集, 放到阻塞线程池)
        let matcher = self.matcher;
        let target = request.total_amount.clone();
        let (candidates, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = matcher.find(&candidates, &target);
            (candidates, outcome)
        })
        .await?;

        let selection = match outcome {
            MatchOutcome::Found(selection) => selection,
            MatchOutcome::NotFound => {
                tracing::warn!(
                    "[Issuer] Branch {}: 没有恰好等于 {} 的组合",
                    branch.id, request.total_amount
                );
                return Err(AppError::NoMatchingTransactions);
            }
            MatchOutcome::BudgetExhausted { steps } => {
                tracing::warn!(
                    "[Issuer] Branch {}: 搜索 {} 步后放弃",
                    branch.id, steps
                );
                return Err(AppError::SearchBudgetExhausted(steps));
            }
        };

        // 5: 扣减数量
        let lines = consume_selection(&mut session, &candidates, &selection).await?;

        // 6-8: 先建票, 再推进计数器
        let invoice_number = counter.last_invoice_number + 1;
        let invoice = session
            .insert_invoice_item(&NewInvoiceItem {
                invoice_id: counter.id,
                branch_id: branch.id,
                user_id: branch.user_id,
                invoice_number,
                date: request.date,
                total: request.total_amount.clone(),
            })
            .await?;
        session
            .advance_invoice_counter(counter.id, invoice_number)
            .await?;

        // 9: 渲染成功后才提交
        let document = build_document(
            &branch,
            &request.payment_type,
            &request.gst_percent,
            request.date,
            Some(invoice_number),
            None,
            lines
                .iter()
                .map(|line| DocumentLine {
                    product: line.product.clone(),
                    unit_price: line.unit_price.clone(),
                    quantity: line.quantity,
                    total: line.total.clone(),
                })
                .collect(),
        );
        let filename = document.filename();
        let bytes = self.render(document).await?;

        session.commit().await?;

        tracing::info!(
            "[Issuer] Branch {}: 发票 #{} 已开具, {} 行, 金额 {}",
            branch.id, invoice.invoice_number, lines.len(), invoice.total
        );

        Ok(IssuedInvoice {
            invoice,
            lines,
            document: bytes,
            filename,
        })
    }

    /// 客户 (销售) 发票: 只读分店信息并渲染
    pub async fn render_customer_invoice(
        &self,
        request: &CustomerInvoiceRequest,
    ) -> AppResult<RenderedDocument> {
        request.validate()?;

        let branch = {
            let mut session = self.store.begin().await?;
            session
                .branch(request.branch_id)
                .await?
                .ok_or(AppError::NotFound(Entity::Branch))?
        };

        let document = build_document(
            &branch,
            &request.payment_type,
            &request.gst_percent,
            request.date,
            None,
            Some(request.customer_name.trim().to_string()),
            request
                .transactions
                .iter()
                .map(|line| DocumentLine {
                    product: line.product.clone(),
                    unit_price: line.price.clone(),
                    quantity: line.quantity,
                    total: line.total.clone(),
                })
                .collect(),
        );
        let filename = document.filename();
        let bytes = self.render(document).await?;

        Ok(RenderedDocument { bytes, filename })
    }

    async fn render(&self, document: InvoiceDocument) -> AppResult<Vec<u8>> {
        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&document)).await??;
        Ok(bytes)
    }
}

async fn consume_selection<T: IssuanceSession>(
    session: &mut T,
    candidates: &[LineItem],
    selection: &Selection,
) -> AppResult<Vec<IssuedLine>> {
    let by_id: HashMap<Uuid, &LineItem> = candidates.iter().map(|c| (c.id, c)).collect();
    let mut lines = Vec::with_capacity(selection.len());

    for pick in &selection.picks {
        let item = by_id.get(&pick.line_item_id).ok_or_else(|| {
            AppError::Internal(format!("picked unknown line item {}", pick.line_item_id))
        })?;

        let remaining = session
            .consume_quantity(pick.line_item_id, pick.quantity)
            .await?
            .ok_or_else(|| {
                AppError::ConcurrencyConflict(format!(
                    "line item {} no longer has {} units available",
                    pick.line_item_id, pick.quantity
                ))
            })?;

        tracing::debug!(
            "扣减流水 {} ({}): {} 件, 剩余 {}",
            item.id, item.product, pick.quantity, remaining
        );

        lines.push(IssuedLine {
            line_item_id: item.id,
            product: item.product.clone(),
            unit_price: item.price.clone(),
            quantity: pick.quantity,
            total: pick.total.clone(),
            remaining_quantity: remaining,
        });
    }

    Ok(lines)
}

fn build_document(
    branch: &Branch,
    payment_type: &str,
    gst_percent: &bigdecimal::BigDecimal,
    date: chrono::DateTime<chrono::Utc>,
    invoice_number: Option<i32>,
    customer_name: Option<String>,
    lines: Vec<DocumentLine>,
) -> InvoiceDocument {
    InvoiceDocument {
        branch_name: branch.name.clone(),
        address: branch.address.clone(),
        phone: branch.phone.clone(),
        gst_number: branch.gst_no.clone(),
        payment_type: payment_type.trim().to_string(),
        gst_percent: gst_percent.clone(),
        date,
        invoice_number,
        customer_name,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_branch_locks_released_entries_are_removed() {
        let locks = BranchLocks::default();
        for _ in 0..10_000 {
            let guard = locks.acquire(Uuid::new_v4()).await;
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_branch_lock_entry_kept_while_waiting() {
        let locks = BranchLocks::default();
        let branch_id = Uuid::new_v4();

        let first = locks.acquire(branch_id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire(branch_id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(locks.len(), 1);

        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
