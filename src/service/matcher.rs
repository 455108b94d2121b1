use bigdecimal::{BigDecimal, Zero};

use crate::models::{LineItem, Pick, Selection};
use crate::service::money::pick_total;

/// 匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// 找到恰好等于目标金额的组合 (第一个找到的, 不是最优的)
    Found(Selection),
    /// 搜索空间穷尽, 没有精确组合
    NotFound,
    /// 超出步数预算后放弃
    BudgetExhausted { steps: u64 },
}

/// 精确子集和匹配 (允许部分数量)
///
/// 纯函数: 不读写任何外部状态, 候选集只借用不修改, 可并发调用.
#[derive(Debug, Clone, Copy)]
pub struct SubsetMatcher {
    max_steps: Option<u64>,
}

/// 显式栈上的一层: 当前候选下标和已尝试的数量
struct Frame {
    acc: BigDecimal,
    candidate: usize,
    quantity: i32,
}

impl SubsetMatcher {
    pub fn unbounded() -> Self {
        Self { max_steps: None }
    }

    pub fn with_budget(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }

    /// 按候选的给定顺序做深度优先搜索.
    ///
    /// 每个候选依次尝试数量 1..=quantity, 累计金额超过目标时不再增加该候选的数量,
    /// 转而尝试下一个候选. 进入下一层只会看更靠后的候选, 因此同一行最多被选一次.
    /// 金额比较使用逐数量取整后的值, 必须完全相等.
    pub fn find(&self, candidates: &[LineItem], target: &BigDecimal) -> MatchOutcome {
        let zero = BigDecimal::zero();
        if *target < zero {
            return MatchOutcome::NotFound;
        }
        if *target == zero {
            return MatchOutcome::Found(Selection::default());
        }

        let mut frames = vec![Frame {
            acc: zero,
            candidate: 0,
            quantity: 0,
        }];
        let mut path: Vec<Pick> = Vec::new();
        let mut steps: u64 = 0;
        // 候选的逐数量金额, 每次搜索只算一次, 按访问到的最大数量向后扩展
        let mut pick_totals: Vec<Vec<BigDecimal>> = vec![Vec::new(); candidates.len()];

        while let Some(frame) = frames.last_mut() {
            let Some(item) = candidates.get(frame.candidate) else {
                // 本层候选耗尽, 回溯并撤销进入本层的那次选取
                frames.pop();
                path.pop();
                continue;
            };

            frame.quantity += 1;
            if frame.quantity > item.quantity {
                frame.candidate += 1;
                frame.quantity = 0;
                continue;
            }

            let totals = &mut pick_totals[frame.candidate];
            let idx = (frame.quantity - 1) as usize;
            while totals.len() <= idx {
                let quantity = totals.len() as i32 + 1;
                totals.push(pick_total(&item.total, item.quantity, quantity));
            }
            let picked = &totals[idx];

            // 取整后为 0 的数量不计入, 保证每次选取都让累计金额严格增加
            if picked.is_zero() {
                continue;
            }

            let running = &frame.acc + picked;
            if running > *target {
                frame.candidate += 1;
                frame.quantity = 0;
                continue;
            }

            steps += 1;
            if self.max_steps.is_some_and(|max| steps > max) {
                return MatchOutcome::BudgetExhausted { steps: steps - 1 };
            }

            path.push(Pick {
                line_item_id: item.id,
                quantity: frame.quantity,
                total: picked.clone(),
            });

            if running == *target {
                return MatchOutcome::Found(Selection { picks: path });
            }

            let next = frame.candidate + 1;
            frames.push(Frame {
                acc: running,
                candidate: next,
                quantity: 0,
            });
        }

        MatchOutcome::NotFound
    }
}

impl Default for SubsetMatcher {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// 无预算限制的匹配
pub fn find_selection(candidates: &[LineItem], target: &BigDecimal) -> MatchOutcome {
    SubsetMatcher::unbounded().find(candidates, target)
}
