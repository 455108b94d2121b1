use crate::models::{
    Branch, Category, InvoiceCounter, InvoiceItem, LineItem, LineItemView, NewBranch,
    NewCategory, NewInvoiceItem, NewLineItem,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

/// 用户 (租户)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name)
        VALUES ($1, $2, $3)
        RETURNING id, email, name
        "#
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .fetch_one(pool)
    .await
}

/// 查询分店
pub async fn get_branch<'e, E: PgExecutor<'e>>(
    executor: E,
    branch_id: Uuid,
) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, user_id, name, address, phone, gst_no, created_at
        FROM branches
        WHERE id = $1
        "#
    )
    .bind(branch_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_branches(pool: &PgPool, user_id: Uuid) -> Result<Vec<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, user_id, name, address, phone, gst_no, created_at
        FROM branches
        WHERE user_id = $1
        ORDER BY created_at, id
        "#
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// 新建分店, 同一事务内创建其发票号计数器 (从 0 开始)
pub async fn create_branch(pool: &PgPool, new: &NewBranch) -> Result<Branch, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let branch = sqlx::query_as::<_, Branch>(
        r#"
        INSERT INTO branches (id, user_id, name, address, phone, gst_no)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, name, address, phone, gst_no, created_at
        "#
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.name.trim())
    .bind(new.address.trim())
    .bind(new.phone.trim())
    .bind(new.gst_no.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO invoices (id, branch_id, last_invoice_number)
        VALUES ($1, $2, 0)
        "#
    )
    .bind(Uuid::new_v4())
    .bind(branch.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("Branch {} created with invoice counter", branch.id);
    Ok(branch)
}

pub async fn create_category(pool: &PgPool, new: &NewCategory) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (id, user_id, name)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, name
        "#
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.name.trim())
    .fetch_one(pool)
    .await
}

/// 查询租户下指定ID的分类
pub async fn list_categories<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    category_ids: &[Uuid],
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, user_id, name
        FROM categories
        WHERE user_id = $1
          AND id = ANY($2)
        "#
    )
    .bind(user_id)
    .bind(category_ids)
    .fetch_all(executor)
    .await
}

/// 新建采购流水, 行金额 = round(单价 × 数量, 2)
pub async fn create_line_item<'e, E: PgExecutor<'e>>(
    executor: E,
    new: &NewLineItem,
) -> Result<LineItem, sqlx::Error> {
    sqlx::query_as::<_, LineItem>(
        r#"
        INSERT INTO purchase_transactions (id, user_id, category_id, product, price, quantity, total, date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, product, price, quantity, total, category_id, date
        "#
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.category_id)
    .bind(new.product.trim())
    .bind(&new.price)
    .bind(new.quantity)
    .bind(new.line_total())
    .bind(new.date)
    .fetch_one(executor)
    .await
}

/// 批量新建, 同一事务内全部成功或全部回滚
pub async fn create_line_items(
    pool: &PgPool,
    items: &[NewLineItem],
) -> Result<Vec<LineItem>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        created.push(create_line_item(&mut *tx, item).await?);
    }
    tx.commit().await?;
    tracing::info!("Bulk created {} purchase transactions", created.len());
    Ok(created)
}

/// 租户的采购流水, 日期区间 [start, end), 日期降序
pub async fn list_line_items(
    pool: &PgPool,
    user_id: Uuid,
    category_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<LineItemView>, sqlx::Error> {
    sqlx::query_as::<_, LineItemView>(
        r#"
        SELECT t.id, c.name AS category, t.category_id, t.date,
               t.product, t.price, t.quantity, t.total
        FROM purchase_transactions t
        LEFT JOIN categories c ON c.id = t.category_id
        WHERE t.user_id = $1
          AND ($2::uuid IS NULL OR t.category_id = $2)
          AND t.date >= $3
          AND t.date < $4
        ORDER BY t.date DESC, t.id
        "#
    )
    .bind(user_id)
    .bind(category_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn get_line_item(
    pool: &PgPool,
    user_id: Uuid,
    line_item_id: Uuid,
) -> Result<Option<LineItemView>, sqlx::Error> {
    sqlx::query_as::<_, LineItemView>(
        r#"
        SELECT t.id, c.name AS category, t.category_id, t.date,
               t.product, t.price, t.quantity, t.total
        FROM purchase_transactions t
        LEFT JOIN categories c ON c.id = t.category_id
        WHERE t.user_id = $1
          AND t.id = $2
        "#
    )
    .bind(user_id)
    .bind(line_item_id)
    .fetch_optional(pool)
    .await
}

/// 删除租户名下的流水, 不属于该租户的 ID 被忽略
pub async fn delete_line_items(
    pool: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<LineItem>, sqlx::Error> {
    sqlx::query_as::<_, LineItem>(
        r#"
        DELETE FROM purchase_transactions
        WHERE user_id = $1
          AND id = ANY($2)
        RETURNING id, product, price, quantity, total, category_id, date
        "#
    )
    .bind(user_id)
    .bind(ids)
    .fetch_all(pool)
    .await
}

/// 锁定候选流水 (按日期、ID 排序, 匹配结果依赖此顺序)
pub async fn lock_candidates<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    category_ids: &[Uuid],
) -> Result<Vec<LineItem>, sqlx::Error> {
    sqlx::query_as::<_, LineItem>(
        r#"
        SELECT id, product, price, quantity, total, category_id, date
        FROM purchase_transactions
        WHERE user_id = $1
          AND category_id = ANY($2)
          AND quantity > 0
          AND total > 0
        ORDER BY date, id
        FOR UPDATE
        "#
    )
    .bind(user_id)
    .bind(category_ids)
    .fetch_all(executor)
    .await
}

/// 扣减数量并重算行金额; 剩余不足时不更新, 返回 None
pub async fn consume_quantity<'e, E: PgExecutor<'e>>(
    executor: E,
    line_item_id: Uuid,
    quantity: i32,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE purchase_transactions
        SET quantity = quantity - $2,
            total = ROUND(price * (quantity - $2), 2)
        WHERE id = $1
          AND quantity >= $2
        RETURNING quantity
        "#
    )
    .bind(line_item_id)
    .bind(quantity)
    .fetch_optional(executor)
    .await
}

/// 锁定分店发票号计数器
pub async fn lock_invoice_counter<'e, E: PgExecutor<'e>>(
    executor: E,
    branch_id: Uuid,
) -> Result<Option<InvoiceCounter>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceCounter>(
        r#"
        SELECT id, branch_id, last_invoice_number
        FROM invoices
        WHERE branch_id = $1
        FOR UPDATE
        "#
    )
    .bind(branch_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_invoice_item<'e, E: PgExecutor<'e>>(
    executor: E,
    item: &NewInvoiceItem,
) -> Result<InvoiceItem, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        INSERT INTO invoice_items (id, invoice_id, branch_id, user_id, invoice_number, date, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, invoice_id, branch_id, user_id, invoice_number, date, total
        "#
    )
    .bind(Uuid::new_v4())
    .bind(item.invoice_id)
    .bind(item.branch_id)
    .bind(item.user_id)
    .bind(item.invoice_number)
    .bind(item.date)
    .bind(&item.total)
    .fetch_one(executor)
    .await
}

/// 查询分店计数器 (不加锁)
pub async fn get_invoice_counter(
    pool: &PgPool,
    branch_id: Uuid,
) -> Result<Option<InvoiceCounter>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceCounter>(
        r#"
        SELECT id, branch_id, last_invoice_number
        FROM invoices
        WHERE branch_id = $1
        "#
    )
    .bind(branch_id)
    .fetch_optional(pool)
    .await
}

/// 推进计数器, 只允许向前
pub async fn advance_invoice_counter<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: Uuid,
    invoice_number: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET last_invoice_number = $2
        WHERE id = $1
          AND last_invoice_number < $2
        "#
    )
    .bind(invoice_id)
    .bind(invoice_number)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// 分店已开发票, 发票号降序
pub async fn list_invoice_items(
    pool: &PgPool,
    branch_id: Uuid,
) -> Result<Vec<InvoiceItem>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, branch_id, user_id, invoice_number, date, total
        FROM invoice_items
        WHERE branch_id = $1
        ORDER BY invoice_number DESC
        "#
    )
    .bind(branch_id)
    .fetch_all(pool)
    .await
}
