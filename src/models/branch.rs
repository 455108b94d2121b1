use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 分店 (branches)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub gst_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 新建分店请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub user_id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub gst_no: Option<String>,
}

impl NewBranch {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Branch name is required".to_string());
        }
        if self.address.trim().is_empty() {
            return Err("Branch address is required".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("Branch phone is required".to_string());
        }
        Ok(())
    }
}

/// 商品分类 (categories)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub user_id: Uuid,
    pub name: String,
}
