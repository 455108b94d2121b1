//! 内存版 InvoiceStore, 用于不依赖数据库的开票流程测试.

#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use gst_invoice_rust::db::{InvoiceStore, IssuanceSession};
use gst_invoice_rust::models::{
    Branch, Category, InvoiceCounter, InvoiceItem, LineItem, NewInvoiceItem,
};
use gst_invoice_rust::render::{DocumentRenderer, InvoiceDocument, RenderError};
use gst_invoice_rust::service::money::round_money;
use gst_invoice_rust::{AppError, AppResult};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, d, 9, 0, 0).unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub branches: Vec<Branch>,
    pub categories: Vec<Category>,
    pub line_items: Vec<(Uuid, LineItem)>, // (user_id, 流水)
    pub counters: Vec<InvoiceCounter>,
    pub invoice_items: Vec<InvoiceItem>,
}

impl Ledger {
    pub fn line_item(&self, id: Uuid) -> &LineItem {
        &self.line_items.iter().find(|(_, item)| item.id == id).unwrap().1
    }

    pub fn counter(&self, branch_id: Uuid) -> i32 {
        self.counters
            .iter()
            .find(|c| c.branch_id == branch_id)
            .unwrap()
            .last_invoice_number
    }
}

/// 故障注入开关
#[derive(Debug, Default)]
pub struct Faults {
    pub fail_invoice_insert: AtomicBool,
    /// 剩余多少次 consume_quantity 返回并发冲突
    pub conflicts_remaining: AtomicU32,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    ledger: Arc<Mutex<Ledger>>,
    pub faults: Arc<Faults>,
}

impl MemoryStore {
    pub async fn snapshot(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }

    pub async fn add_user_branch(&self, name: &str) -> (Uuid, Branch) {
        let user_id = Uuid::new_v4();
        let branch = Branch {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            address: "12 MG Road, Pune".to_string(),
            phone: "9800000000".to_string(),
            gst_no: Some("27AAAAA0000A1Z5".to_string()),
            created_at: day(1),
        };
        let mut ledger = self.ledger.lock().await;
        ledger.counters.push(InvoiceCounter {
            id: Uuid::new_v4(),
            branch_id: branch.id,
            last_invoice_number: 0,
        });
        ledger.branches.push(branch.clone());
        (user_id, branch)
    }

    pub async fn add_category(&self, user_id: Uuid, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        self.ledger.lock().await.categories.push(category.clone());
        category
    }

    pub async fn add_line_item(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        product: &str,
        price: &str,
        quantity: i32,
        date: DateTime<Utc>,
    ) -> LineItem {
        let price = dec(price);
        let item = LineItem {
            id: Uuid::new_v4(),
            product: product.to_string(),
            total: round_money(&(&price * BigDecimal::from(quantity))),
            price,
            quantity,
            category_id: Some(category_id),
            date,
        };
        self.ledger.lock().await.line_items.push((user_id, item.clone()));
        item
    }
}

/// 持有全局锁的事务, 在工作副本上修改, commit 时写回
pub struct MemorySession {
    guard: OwnedMutexGuard<Ledger>,
    working: Ledger,
    faults: Arc<Faults>,
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    type Session = MemorySession;

    async fn begin(&self) -> AppResult<MemorySession> {
        let guard = Arc::clone(&self.ledger).lock_owned().await;
        let working = guard.clone();
        Ok(MemorySession {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        })
    }
}

#[async_trait]
impl IssuanceSession for MemorySession {
    async fn branch(&mut self, branch_id: Uuid) -> AppResult<Option<Branch>> {
        Ok(self.working.branches.iter().find(|b| b.id == branch_id).cloned())
    }

    async fn categories(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<Category>> {
        Ok(self
            .working
            .categories
            .iter()
            .filter(|c| c.user_id == user_id && category_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn lock_invoice_counter(&mut self, branch_id: Uuid) -> AppResult<Option<InvoiceCounter>> {
        Ok(self.working.counters.iter().find(|c| c.branch_id == branch_id).cloned())
    }

    async fn lock_candidates(&mut self, user_id: Uuid, category_ids: &[Uuid]) -> AppResult<Vec<LineItem>> {
        let mut items: Vec<LineItem> = self
            .working
            .line_items
            .iter()
            .filter(|(owner, item)| {
                *owner == user_id
                    && item.quantity > 0
                    && item.category_id.is_some_and(|id| category_ids.contains(&id))
            })
            .map(|(_, item)| item.clone())
            .collect();
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn consume_quantity(&mut self, line_item_id: Uuid, quantity: i32) -> AppResult<Option<i32>> {
        let pending = self.faults.conflicts_remaining.load(Ordering::SeqCst);
        if pending > 0 {
            self.faults.conflicts_remaining.store(pending - 1, Ordering::SeqCst);
            return Err(AppError::ConcurrencyConflict("injected".to_string()));
        }

        let Some((_, item)) = self
            .working
            .line_items
            .iter_mut()
            .find(|(_, item)| item.id == line_item_id)
        else {
            return Ok(None);
        };
        if item.quantity < quantity {
            return Ok(None);
        }
        item.quantity -= quantity;
        item.total = round_money(&(&item.price * BigDecimal::from(item.quantity)));
        Ok(Some(item.quantity))
    }

    async fn insert_invoice_item(&mut self, item: &NewInvoiceItem) -> AppResult<InvoiceItem> {
        if self.faults.fail_invoice_insert.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert failed".to_string()));
        }
        let duplicate = self
            .working
            .invoice_items
            .iter()
            .any(|i| i.invoice_id == item.invoice_id && i.invoice_number == item.invoice_number);
        if duplicate {
            return Err(AppError::Database("duplicate invoice number".to_string()));
        }
        let created = InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: item.invoice_id,
            branch_id: item.branch_id,
            user_id: item.user_id,
            invoice_number: item.invoice_number,
            date: item.date,
            total: item.total.clone(),
        };
        self.working.invoice_items.push(created.clone());
        Ok(created)
    }

    async fn advance_invoice_counter(&mut self, invoice_id: Uuid, invoice_number: i32) -> AppResult<()> {
        let counter = self
            .working
            .counters
            .iter_mut()
            .find(|c| c.id == invoice_id)
            .ok_or_else(|| AppError::Database("counter missing".to_string()))?;
        if counter.last_invoice_number >= invoice_number {
            return Err(AppError::ConcurrencyConflict("counter moved".to_string()));
        }
        counter.last_invoice_number = invoice_number;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        let MemorySession {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}

/// 记录渲染输入的假渲染器
#[derive(Default)]
pub struct RecordingRenderer {
    pub documents: StdMutex<Vec<InvoiceDocument>>,
    pub fail: AtomicBool,
}

impl DocumentRenderer for RecordingRenderer {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError("renderer offline".to_string()));
        }
        self.documents.lock().unwrap().push(document.clone());
        Ok(b"%PDF-test".to_vec())
    }
}
